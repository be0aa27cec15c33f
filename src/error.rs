use serde::{Deserialize, Serialize};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// A coarse classification of what went wrong in a command, so that callers can report a stable
/// category regardless of the underlying error chain.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The data directory or its configuration file is missing or invalid.
    Config,
    /// A SQLite operation failed.
    Database,
    /// Reading or writing a file failed.
    Io,
    /// The request itself was invalid, e.g. an unknown receipt ID or a bad argument.
    Request,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// Adds an `ErrorType` to the context of an error so it is visible at the top of the chain.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.into().context(format!("{error_type} error")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_pub_result_prefixes_error_type() {
        let r: std::result::Result<(), Error> = Err(anyhow!("no such receipt"));
        let e = r.pub_result(ErrorType::Request).unwrap_err();
        assert_eq!(e.to_string(), "request error");
        assert_eq!(e.root_cause().to_string(), "no such receipt");
    }

    #[test]
    fn test_pub_result_passes_ok_through() {
        let r: std::result::Result<u8, Error> = Ok(7);
        assert_eq!(r.pub_result(ErrorType::Database).unwrap(), 7);
    }
}
