//! The waiver claim processing engine.
//!
//! Claims collect during the week (`submit`, `manage`) and resolve in a
//! single deterministic run per league (`processor`), serialized by a
//! Postgres advisory lock. The resolver's round loop is pure over an
//! in-memory snapshot with one effectful seam ([`resolver::ClaimExecutor`]),
//! which is what makes the whole conflict-resolution surface testable
//! without a database.

pub mod compare;
pub mod error;
pub mod events;
pub mod init;
pub mod manage;
pub mod processor;
pub mod resolver;
pub mod state;
pub mod submit;
pub mod window;

mod service;

pub use error::WaiverError;
pub use events::{DeferredEvents, EventSink};
pub use init::InitializeOutcome;
pub use manage::UpdateClaimInput;
pub use service::WaiverService;
pub use submit::SubmitClaimInput;
