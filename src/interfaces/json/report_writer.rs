use crate::domain::info::UserInfo;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One line of the batch report: a user's info snapshot tagged with their name.
#[derive(Debug, Serialize)]
pub struct UserReport<'a> {
    pub username: &'a str,
    #[serde(flatten)]
    pub info: &'a UserInfo,
}

/// Writes user reports as JSON lines.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_report(&mut self, username: &str, info: &UserInfo) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &UserReport { username, info })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
