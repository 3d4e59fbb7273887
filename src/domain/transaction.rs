use super::account::{Amount, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed coin transfer. Append-only: never updated or deleted.
///
/// Purchases do not produce a `Transaction`; only transfers between users do.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Transaction {
    pub id: u64,
    pub sender: UserId,
    pub receiver: UserId,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

/// A transfer waiting for its unit of work to commit.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NewTransaction {
    pub sender: UserId,
    pub receiver: UserId,
    pub amount: Amount,
}

impl NewTransaction {
    pub fn commit_as(self, id: u64, timestamp: DateTime<Utc>) -> Transaction {
        Transaction {
            id,
            sender: self.sender,
            receiver: self.receiver,
            amount: self.amount,
            timestamp,
        }
    }
}
