//! Per-resource critical section for check-then-reserve operations.
//!
//! Every write that consumes availability (assignments, stock withdrawals)
//! runs through [`ReservationGuard::with_resource_lock`]: an exclusive
//! section scoped to the resource id, held from the availability re-read
//! through insert-commit. Reads outside the guard only ever observe
//! committed state and are never used as the sole gate before a write.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use sea_orm::{DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::ServiceError;

/// Bounded retry for transient transaction failures (lock contention,
/// serialization aborts). Expected outcomes are never retried.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

pub struct ReservationGuard {
    db: Arc<DbPool>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ReservationGuard {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            db,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, resource_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(resource_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `op` inside a database transaction while holding the exclusive
    /// section for `resource_id`. The closure must re-read any state it
    /// validates against; whatever the caller observed before entering the
    /// guard may be stale.
    pub async fn with_resource_lock<F, T>(
        &self,
        resource_id: Uuid,
        op: F,
    ) -> Result<T, ServiceError>
    where
        F: for<'c> Fn(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send
            + Sync,
        T: Send + 'static,
    {
        let lock = self.lock_for(resource_id);
        let _section = lock.lock().await;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let result = self
                .db
                .transaction::<_, T, ServiceError>(|txn| op(txn))
                .await;

            let error = match result {
                Ok(value) => return Ok(value),
                Err(TransactionError::Connection(db_err)) => ServiceError::DatabaseError(db_err),
                Err(TransactionError::Transaction(service_err)) => service_err,
            };

            let retryable = matches!(
                &error,
                ServiceError::DatabaseError(db_err) if is_transient(db_err)
            );

            if retryable && attempt < MAX_ATTEMPTS {
                warn!(
                    resource_id = %resource_id,
                    attempt,
                    error = %error,
                    "transient transaction failure inside reservation guard; retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                continue;
            }

            return Err(error);
        }
    }
}

fn is_transient(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("database is locked")
        || message.contains("deadlock")
        || message.contains("could not serialize")
        || message.contains("serialization failure")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_lock_errors_are_transient() {
        assert!(is_transient(&DbErr::Custom(
            "error returned from database: database is locked".to_string()
        )));
    }

    #[test]
    fn constraint_violations_are_not_transient() {
        assert!(!is_transient(&DbErr::Custom(
            "UNIQUE constraint failed: assignments.id".to_string()
        )));
    }
}
