//! Shared domain model for the waiver engine.
//!
//! Plain serde-able rows and enums; no behavior beyond parsing and
//! projection. Repositories in `lgk-db` produce these, the engine in
//! `lgk-waivers` consumes them, and the daemon serializes them straight
//! into responses and bus events (all snake_case on the wire).

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod events;

// ---------------------------------------------------------------------------
// WaiverType
// ---------------------------------------------------------------------------

/// League waiver mode. `None` disables the waiver system entirely.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaiverType {
    Standard,
    Faab,
    None,
}

impl WaiverType {
    pub fn as_str(self) -> &'static str {
        match self {
            WaiverType::Standard => "standard",
            WaiverType::Faab => "faab",
            WaiverType::None => "none",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(WaiverType::Standard),
            "faab" => Ok(WaiverType::Faab),
            "none" => Ok(WaiverType::None),
            other => Err(anyhow!("invalid waiver type: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// ClaimStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a waiver claim. A claim leaves `Pending` exactly once:
/// `Cancelled` by its owner, or `Successful` / `Failed` / `Invalid` by the
/// processor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Successful,
    Failed,
    Invalid,
    Cancelled,
}

impl ClaimStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Successful => "successful",
            ClaimStatus::Failed => "failed",
            ClaimStatus::Invalid => "invalid",
            ClaimStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "successful" => Ok(ClaimStatus::Successful),
            "failed" => Ok(ClaimStatus::Failed),
            "invalid" => Ok(ClaimStatus::Invalid),
            "cancelled" => Ok(ClaimStatus::Cancelled),
            other => Err(anyhow!("invalid claim status: {}", other)),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Roster transaction kinds written by the engine. `Trade` is written by the
/// trade module; it appears here because the ledger is shared.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Add,
    Drop,
    Trade,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Add => "add",
            TransactionType::Drop => "drop",
            TransactionType::Trade => "trade",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(TransactionType::Add),
            "drop" => Ok(TransactionType::Drop),
            "trade" => Ok(TransactionType::Trade),
            other => Err(anyhow!("invalid transaction type: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// League
// ---------------------------------------------------------------------------

/// Waiver-relevant league settings. Stored as columns on `leagues`; the
/// remaining league configuration (scoring, schedule, …) lives outside this
/// engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSettings {
    pub waiver_type: WaiverType,
    /// Per-season FAAB allowance granted to each roster.
    pub faab_budget: i32,
    /// Scheduled processing day, 0–6 Sunday-based.
    pub waiver_day: i32,
    /// Scheduled processing hour, 0–23, in the league timezone.
    pub waiver_hour: i32,
    /// How long a dropped player stays gated on the wire.
    pub waiver_period_days: i32,
    pub roster_size: i32,
    /// IANA zone name; `None` means UTC.
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: i64,
    pub season: i32,
    /// `None` before the season schedule starts.
    pub current_week: Option<i32>,
    /// Scoping key for this season's roster/ownership state.
    pub active_league_season_id: i64,
    pub settings: LeagueSettings,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub id: i64,
    pub league_id: i64,
    pub user_id: i64,
    /// Per-league display index (roster 1, roster 2, …).
    pub roster_number: i32,
    pub is_benched: bool,
}

// ---------------------------------------------------------------------------
// WaiverClaim
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverClaim {
    pub id: i64,
    pub league_id: i64,
    pub roster_id: i64,
    pub player_id: i64,
    pub drop_player_id: Option<i64>,
    pub bid_amount: i32,
    /// Waiver priority of the roster at submit time. The processor compares
    /// on the *live* priority; this snapshot is informational.
    pub priority_at_claim: i32,
    pub status: ClaimStatus,
    pub season: i32,
    pub week: i32,
    /// User-defined processing sequence within (roster, season, week).
    pub claim_order: i32,
    pub processing_run_id: Option<i64>,
    pub idempotency_key: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A claim joined with its owning roster and live priority — the shape the
/// management surface reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDetails {
    #[serde(flatten)]
    pub claim: WaiverClaim,
    pub user_id: i64,
    pub current_priority: i32,
}

// ---------------------------------------------------------------------------
// WaiverPriority / FaabBudget
// ---------------------------------------------------------------------------

/// One row of the league's waiver order for a season. Priority 1 is best;
/// for an active season the priorities form a contiguous permutation of
/// `1..=N` over the participating rosters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverPriority {
    pub league_id: i64,
    pub roster_id: i64,
    pub season: i32,
    pub priority: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaabBudget {
    pub league_id: i64,
    pub roster_id: i64,
    pub season: i32,
    pub initial_budget: i32,
    pub remaining_budget: i32,
}

// ---------------------------------------------------------------------------
// WaiverWireEntry
// ---------------------------------------------------------------------------

/// A recently-dropped player. While `waiver_expires_at` is in the future the
/// player is gated: acquisition requires a claim, not a free-agent add.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverWireEntry {
    pub league_id: i64,
    pub player_id: i64,
    pub dropped_by_roster_id: Option<i64>,
    pub waiver_expires_at: DateTime<Utc>,
    pub season: i32,
    pub week: i32,
}

// ---------------------------------------------------------------------------
// WaiverProcessingRun
// ---------------------------------------------------------------------------

/// Append-only record of one processing attempt. Unique on
/// `(league_id, season, week, window_start_at)` — the idempotence anchor
/// that makes a double-fired scheduler a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverProcessingRun {
    pub id: i64,
    pub league_id: i64,
    pub season: i32,
    pub week: i32,
    pub window_start_at: DateTime<Utc>,
    pub claims_found: i32,
    pub claims_successful: i32,
    pub ran_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RosterTransaction
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterTransaction {
    pub id: i64,
    pub league_id: i64,
    pub roster_id: i64,
    pub player_id: i64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub season: i32,
    pub week: i32,
    /// Links an `add` to the `drop` executed in the same claim.
    pub related_transaction_id: Option<i64>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ProcessSummary
// ---------------------------------------------------------------------------

/// Result of one `process_league_claims` invocation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub processed: i32,
    pub successful: i32,
}
