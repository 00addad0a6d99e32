//! Error taxonomy surfaced to transport callers.
//!
//! Four caller-visible kinds plus `Internal` for everything the caller can
//! only retry. Ownership conflicts raised mid-processing never reach this
//! type; the processor converts them to per-claim outcomes.

use std::fmt;

#[derive(Debug)]
pub enum WaiverError {
    /// Caller is not a member (or commissioner) where required.
    Forbidden(String),
    /// League or claim missing.
    NotFound(String),
    /// Pre-season, disabled waivers, bad inputs, budget/roster rules,
    /// stale state ("no longer pending").
    Validation(String),
    /// Duplicate pending claim or an already-owned target player.
    Conflict(String),
    Internal(anyhow::Error),
}

impl WaiverError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable wire label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for WaiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Conflict(msg) => write!(f, "{msg}"),
            Self::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}

impl std::error::Error for WaiverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Internal(e) => e.source(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for WaiverError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
