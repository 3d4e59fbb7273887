//! Per-row exclusive locks shared by the storage backends.
//!
//! A [`RowLocks`] table hands out one async mutex per user row. Units of work
//! collect the guards they acquire in a [`HeldLocks`] set, which only accepts
//! rows in ascending id order so two units can never wait on each other in a
//! cycle. Dropping the set releases every row.

use crate::domain::account::UserId;
use crate::error::{LedgerError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct RowLocks {
    rows: Mutex<HashMap<UserId, Arc<RowMutex<()>>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, user: UserId) -> Arc<RowMutex<()>> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(rows.entry(user).or_default())
    }

    /// Waits until the row is free and takes it.
    pub async fn acquire(&self, user: UserId) -> OwnedMutexGuard<()> {
        self.row(user).lock_owned().await
    }
}

/// The rows locked by one unit of work.
#[derive(Default)]
pub struct HeldLocks {
    guards: BTreeMap<UserId, OwnedMutexGuard<()>>,
}

impl HeldLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, user: UserId) -> bool {
        self.guards.contains_key(&user)
    }

    /// Locks `user` unless already held. Rows must be requested in ascending
    /// id order; an out-of-order request is refused before it can block.
    pub async fn lock(&mut self, table: &RowLocks, user: UserId) -> Result<()> {
        if self.holds(user) {
            return Ok(());
        }
        if let Some((&highest, _)) = self.guards.last_key_value()
            && highest > user
        {
            return Err(LedgerError::internal(format!(
                "row lock order violated: user {user} requested while holding user {highest}"
            )));
        }
        let guard = table.acquire(user).await;
        self.guards.insert(user, guard);
        Ok(())
    }

    pub fn ensure_held(&self, user: UserId) -> Result<()> {
        if self.holds(user) {
            Ok(())
        } else {
            Err(LedgerError::internal(format!(
                "balance row for user {user} written without a lock"
            )))
        }
    }
}
