use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Item,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => f.write_str("user"),
            Entity::Item => f.write_str("item"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    UsernameExists,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::UsernameExists => f.write_str("username already exists"),
        }
    }
}

/// Stable classification of a [`LedgerError`], used by the boundary layer to
/// pick an external status without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Conflict,
    Transient,
    Internal,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },
    #[error("Conflict: {0}")]
    Conflict(ConflictKind),
    #[error("Storage error: {0}")]
    StorageError(Box<dyn std::error::Error + Send + Sync>),
    #[error("Deadline of {0:?} exceeded, operation rolled back")]
    DeadlineExceeded(Duration),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LedgerError {
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::StorageError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ValidationError(_) => ErrorKind::Validation,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::StorageError(_) | LedgerError::DeadlineExceeded(_) => {
                ErrorKind::Transient
            }
            LedgerError::InternalError(_) | LedgerError::CsvError(_) | LedgerError::IoError(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the same request may succeed if the caller retries it.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::StorageError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
