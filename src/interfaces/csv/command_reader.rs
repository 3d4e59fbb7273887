use crate::domain::item::ItemId;
use crate::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Register,
    Send,
    Buy,
}

/// One raw CSV row: `op, user, target, amount`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub op: CommandType,
    pub user: String,
    pub target: Option<String>,
    pub amount: Option<i64>,
}

/// A ledger operation issued on behalf of `user`.
#[derive(Debug, PartialEq, Clone)]
pub enum LedgerCommand {
    Register { user: String },
    Send { user: String, to: String, amount: i64 },
    Buy { user: String, item: ItemId },
}

impl TryFrom<CommandRecord> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let CommandRecord {
            op,
            user,
            target,
            amount,
        } = record;
        match op {
            CommandType::Register => Ok(LedgerCommand::Register { user }),
            CommandType::Send => {
                let to = target.ok_or_else(|| {
                    LedgerError::ValidationError("send requires a receiver".to_string())
                })?;
                let amount = amount.ok_or_else(|| {
                    LedgerError::ValidationError("send requires an amount".to_string())
                })?;
                Ok(LedgerCommand::Send { user, to, amount })
            }
            CommandType::Buy => {
                let item = target
                    .ok_or_else(|| {
                        LedgerError::ValidationError("buy requires an item id".to_string())
                    })?
                    .parse()?;
                Ok(LedgerCommand::Buy { user, item })
            }
        }
    }
}

/// Reads ledger commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<LedgerCommand>`. It trims whitespace and tolerates short records.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and parses commands.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader.into_deserialize::<CommandRecord>().map(|result| {
            result
                .map_err(LedgerError::from)
                .and_then(LedgerCommand::try_from)
        })
    }
}
