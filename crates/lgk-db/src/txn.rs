//! Scoped transactions with per-domain advisory locks.
//!
//! Every use case that mutates waiver state for a league runs its body
//! through [`run_with_lock`] with [`LockDomain::Waiver`]: the body sees a
//! serialized view for that `(domain, id)` across all service instances
//! sharing the database. `pg_advisory_xact_lock` is transaction-scoped, so
//! the lock releases automatically at commit or rollback — there is no
//! unlock path to forget.
//!
//! Nested lock acquisition is disallowed by convention; each use case names
//! a single lock domain in its contract.

use anyhow::Context;
use futures_util::future::BoxFuture;
use sqlx::{PgConnection, PgPool};

// ---------------------------------------------------------------------------
// LockDomain
// ---------------------------------------------------------------------------

/// Advisory lock namespaces. Each domain owns a distinct integer range so a
/// league lock and a roster lock on the same raw id can never collide.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LockDomain {
    League,
    Roster,
    Trade,
    Waiver,
    Auction,
    Lineup,
    Draft,
    Job,
}

impl LockDomain {
    pub const fn base(self) -> i64 {
        match self {
            LockDomain::League => 100_000_000,
            LockDomain::Roster => 200_000_000,
            LockDomain::Trade => 300_000_000,
            LockDomain::Waiver => 400_000_000,
            LockDomain::Auction => 500_000_000,
            LockDomain::Lineup => 600_000_000,
            LockDomain::Draft => 700_000_000,
            LockDomain::Job => 900_000_000,
        }
    }

    /// The advisory lock key for `id` within this domain.
    pub fn key(self, id: i64) -> i64 {
        self.base() + id
    }
}

// ---------------------------------------------------------------------------
// Scoped runners
// ---------------------------------------------------------------------------

/// Acquire a connection, BEGIN, run `body`, COMMIT on `Ok`, ROLLBACK on
/// `Err`. The connection always returns to the pool.
///
/// `E: From<anyhow::Error>` lets both `anyhow` callers and domain-error
/// callers (e.g. `WaiverError`) use the same runner.
pub async fn run_in_transaction<T, E, F>(pool: &PgPool, body: F) -> Result<T, E>
where
    E: From<anyhow::Error>,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
{
    let mut tx = pool
        .begin()
        .await
        .context("begin transaction")
        .map_err(E::from)?;

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .context("commit transaction")
                .map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            // Rollback failure is secondary; the body error is what matters.
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// As [`run_in_transaction`], plus a transaction-scoped advisory lock on
/// `(domain, id)` acquired before the body runs. Acquisition may block; the
/// blocked task yields its worker until Postgres grants the lock.
pub async fn run_with_lock<T, E, F>(
    pool: &PgPool,
    domain: LockDomain,
    id: i64,
    body: F,
) -> Result<T, E>
where
    E: From<anyhow::Error>,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
{
    let mut tx = pool
        .begin()
        .await
        .context("begin transaction")
        .map_err(E::from)?;

    sqlx::query("select pg_advisory_xact_lock($1)")
        .bind(domain.key(id))
        .execute(&mut *tx)
        .await
        .context("acquire advisory transaction lock")
        .map_err(E::from)?;

    match body(&mut *tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .context("commit transaction")
                .map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_bases_never_collide() {
        let domains = [
            LockDomain::League,
            LockDomain::Roster,
            LockDomain::Trade,
            LockDomain::Waiver,
            LockDomain::Auction,
            LockDomain::Lineup,
            LockDomain::Draft,
            LockDomain::Job,
        ];
        // Ranges are 10^8 wide; ids stay far below that, so keys from
        // different domains can never be equal.
        for (i, a) in domains.iter().enumerate() {
            for b in domains.iter().skip(i + 1) {
                assert_ne!(a.base(), b.base());
                assert_ne!(a.key(42), b.key(42));
            }
        }
        assert_eq!(LockDomain::Waiver.key(7), 400_000_007);
    }
}
