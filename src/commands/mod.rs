//! Command handlers for the receipts CLI.
//!
//! Each handler takes a loaded `Config` (except `init`, which creates one) and returns an `Out`.
//! Handlers that depend on the calendar take `today` so that callers decide what day it is.

mod analytics;
mod delete;
mod import;
mod init;
mod list;
mod stats;
mod update;

use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use tracing::info;

pub use analytics::{analytics, export};
pub use delete::delete;
pub use import::import;
pub use init::init;
pub use list::{list, show};
pub use stats::{stats, usage};
pub use update::update;

/// The output type for a command: a message for the user and, optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Logs the message with `info!` and writes the structured data, if any, to stdout as pretty
    /// JSON. Logs go to stderr, so stdout carries only data.
    pub fn print(&self) -> crate::Result<()> {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            let json = serde_json::to_string_pretty(structure)
                .context("Unable to serialize command output")?;
            println!("{json}");
        }
        Ok(())
    }
}

/// `"1 receipt"`, `"3 receipts"`
fn receipts_noun(count: usize) -> String {
    format!("{count} receipt{}", if count == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_from_message() {
        let out: Out<()> = "done".into();
        assert_eq!(out.message(), "done");
        assert!(out.structure().is_none());
    }

    #[test]
    fn test_receipts_noun() {
        assert_eq!(receipts_noun(0), "0 receipts");
        assert_eq!(receipts_noun(1), "1 receipt");
        assert_eq!(receipts_noun(12), "12 receipts");
    }
}
