//! Error types for pgconn.

use thiserror::Error;

use crate::protocol::types::Oid;

/// Result type for pgconn operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL server error/notice fields.
///
/// Parsed from ErrorResponse and NoticeResponse messages. `severity`, `code`
/// and `message` are always sent by the server; the rest are optional.
#[derive(Debug, Clone, Default)]
pub struct ServerError {
    /// Severity (localized): ERROR, FATAL, PANIC, WARNING, NOTICE, ...
    pub severity: Option<String>,
    /// Severity (non-localized, never translated)
    pub severity_non_localized: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<u32>,
    /// Position in internal query
    pub internal_position: Option<u32>,
    /// Failed internal command text
    pub internal_query: Option<String>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub data_type: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
    /// Source file name
    pub file: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source routine name
    pub routine: Option<String>,
}

impl ServerError {
    /// Severity, preferring the non-localized form.
    pub fn severity(&self) -> &str {
        self.severity_non_localized
            .as_deref()
            .or(self.severity.as_deref())
            .unwrap_or_default()
    }

    /// SQLSTATE error code (5 characters).
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    /// Primary error message.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Returns true for FATAL/PANIC severities, after which the server
    /// tears the connection down.
    pub fn is_fatal(&self) -> bool {
        matches!(self.severity(), "FATAL" | "PANIC")
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (SQLSTATE {})",
            self.severity(),
            self.message(),
            self.code()
        )?;
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Error type for pgconn.
#[derive(Debug, Error)]
pub enum Error {
    /// Error response from the backend
    #[error("server error: {0}")]
    Server(ServerError),

    /// Protocol error (malformed frame, unexpected message for state)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Socket-layer failure (includes connection refused and read timeout)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server rejected credentials or the method is unsupported
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Operation on a disconnected connection
    #[error("connection is closed")]
    Closed,

    /// Caller violated the API contract
    #[error("invalid usage: {0}")]
    Usage(String),

    /// Value decode/encode error
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Returns true if the error leaves the connection unusable.
    ///
    /// I/O, protocol and authentication failures are always fatal; a server
    /// error is fatal only at FATAL/PANIC severity.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Io(_) | Error::Protocol(_) | Error::Auth(_) => true,
            Error::Server(fields) => fields.is_fatal(),
            Error::Closed | Error::Usage(_) | Error::Decode(_) => false,
        }
    }

    /// Returns true if the error is an expired read deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Io(err) if matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }

    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => Some(fields.code()),
            _ => None,
        }
    }

    pub(crate) fn type_mismatch(value_oid: Oid, target_oid: Oid) -> Self {
        Error::Decode(format!(
            "cannot encode a value of oid {value_oid} for target oid {target_oid}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_severities() {
        let mut fields = ServerError {
            severity: Some("ERROR".into()),
            ..Default::default()
        };
        assert!(!Error::Server(fields.clone()).is_fatal());

        fields.severity_non_localized = Some("FATAL".into());
        assert!(Error::Server(fields).is_fatal());
    }

    #[test]
    fn timeout_detection() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, "slow"));
        assert!(err.is_timeout());
        assert!(err.is_fatal());
        assert!(!Error::Closed.is_timeout());
    }
}
