use crate::application::unit_of_work::with_deadline;
use crate::config::LedgerConfig;
use crate::domain::account::{NewUser, User};
use crate::domain::ports::UserStore;
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Opens accounts with the configured starting balance.
pub struct AccountRegistrar {
    store: Arc<dyn UserStore>,
    config: LedgerConfig,
}

impl AccountRegistrar {
    pub fn new(store: Arc<dyn UserStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Registers `username`. The password hash is stored as given.
    pub async fn register(&self, username: &str, password_hash: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LedgerError::ValidationError(
                "Username must not be empty".to_string(),
            ));
        }

        let new_user = NewUser {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            balance: self.config.initial_balance,
        };
        let result = with_deadline(
            self.config.operation_timeout,
            self.store.create_user(new_user),
        )
        .await;

        match &result {
            Ok(user) => info!(user = %user.id, username = %user.username, "user registered"),
            Err(err) => warn!(username, error = %err, "registration rejected"),
        }
        result
    }
}
