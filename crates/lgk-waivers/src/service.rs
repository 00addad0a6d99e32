//! `WaiverService` — the thin facade the transport layer talks to.
//!
//! Holds the pool and an optional event sink; every method delegates to a
//! use case and flushes its deferred events after the commit. No waiver
//! logic lives here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lgk_schemas::{
    ClaimDetails, FaabBudget, ProcessSummary, WaiverClaim, WaiverPriority, WaiverWireEntry,
};
use sqlx::PgPool;

use crate::error::WaiverError;
use crate::events::EventSink;
use crate::init::{self, InitializeOutcome};
use crate::manage::{self, UpdateClaimInput};
use crate::processor;
use crate::submit::{self, SubmitClaimInput};

#[derive(Clone)]
pub struct WaiverService {
    pool: PgPool,
    events: Option<Arc<dyn EventSink>>,
}

impl WaiverService {
    /// A service without a bus: events degrade to no-ops.
    pub fn new(pool: PgPool) -> Self {
        Self { pool, events: None }
    }

    pub fn with_events(pool: PgPool, sink: Arc<dyn EventSink>) -> Self {
        Self {
            pool,
            events: Some(sink),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn sink(&self) -> Option<&dyn EventSink> {
        self.events.as_deref()
    }

    // -- claim lifecycle ----------------------------------------------------

    pub async fn submit_claim(
        &self,
        league_id: i64,
        user_id: i64,
        input: SubmitClaimInput,
    ) -> Result<WaiverClaim, WaiverError> {
        let (claim, events) = submit::submit_claim(&self.pool, league_id, user_id, input).await?;
        events.flush(self.sink());
        Ok(claim)
    }

    pub async fn update_claim(
        &self,
        league_id: i64,
        user_id: i64,
        claim_id: i64,
        input: UpdateClaimInput,
    ) -> Result<WaiverClaim, WaiverError> {
        let (claim, events) =
            manage::update_claim(&self.pool, league_id, user_id, claim_id, input).await?;
        events.flush(self.sink());
        Ok(claim)
    }

    pub async fn reorder_claims(
        &self,
        league_id: i64,
        user_id: i64,
        claim_ids: Vec<i64>,
    ) -> Result<Vec<WaiverClaim>, WaiverError> {
        let (claims, events) =
            manage::reorder_claims(&self.pool, league_id, user_id, claim_ids).await?;
        events.flush(self.sink());
        Ok(claims)
    }

    pub async fn cancel_claim(
        &self,
        league_id: i64,
        user_id: i64,
        claim_id: i64,
    ) -> Result<WaiverClaim, WaiverError> {
        let (claim, events) =
            manage::cancel_claim(&self.pool, league_id, user_id, claim_id).await?;
        events.flush(self.sink());
        Ok(claim)
    }

    pub async fn my_claims(
        &self,
        league_id: i64,
        user_id: i64,
    ) -> Result<Vec<WaiverClaim>, WaiverError> {
        manage::get_my_claims(&self.pool, league_id, user_id).await
    }

    pub async fn league_claims(&self, league_id: i64) -> Result<Vec<ClaimDetails>, WaiverError> {
        manage::get_league_claims(&self.pool, league_id).await
    }

    // -- processing ---------------------------------------------------------

    pub async fn process_league_claims(
        &self,
        league_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ProcessSummary, WaiverError> {
        processor::process_league_claims(&self.pool, self.sink(), league_id, now).await
    }

    // -- initialization & reads ---------------------------------------------

    pub async fn initialize_league(
        &self,
        league_id: i64,
    ) -> Result<InitializeOutcome, WaiverError> {
        let (outcome, events) = init::initialize_league(&self.pool, league_id).await?;
        events.flush(self.sink());
        Ok(outcome)
    }

    pub async fn priority_list(&self, league_id: i64) -> Result<Vec<WaiverPriority>, WaiverError> {
        init::priority_list(&self.pool, league_id).await
    }

    pub async fn budget_list(&self, league_id: i64) -> Result<Vec<FaabBudget>, WaiverError> {
        init::budget_list(&self.pool, league_id).await
    }

    pub async fn wire_list(&self, league_id: i64) -> Result<Vec<WaiverWireEntry>, WaiverError> {
        init::wire_list(&self.pool, league_id).await
    }
}
