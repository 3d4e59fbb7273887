use crate::domain::account::Coins;
use std::time::Duration;

/// Coins granted to every account at registration.
pub const DEFAULT_INITIAL_BALANCE: u64 = 1000;

/// Settings shared by the ledger engines.
///
/// Built once by the caller and handed to each component at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub initial_balance: Coins,
    /// Upper bound for one operation, including time spent waiting on row
    /// locks. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: Coins(DEFAULT_INITIAL_BALANCE),
            operation_timeout: None,
        }
    }
}

impl LedgerConfig {
    pub fn with_initial_balance(mut self, balance: u64) -> Self {
        self.initial_balance = Coins(balance);
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}
