//! Error types for nsdb driver operations.

use std::fmt;

/// The primary error type for all driver operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, authenticate, disconnect)
    Connection(ConnectionError),
    /// Statement execution errors reported by the engine
    Query(QueryError),
    /// Protocol errors (wire-level)
    Protocol(ProtocolError),
    /// Configuration errors (malformed datasource, missing driver name)
    Config(ConfigError),
    /// The caller used the handle out of sequence
    Usage(UsageError),
    /// I/O errors
    Io(std::io::Error),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    /// Engine or client error code, when one was reported
    pub code: Option<u32>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// DNS resolution failed
    DnsResolution,
    /// Connection refused
    Refused,
    /// Handle is not connected
    NotConnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// Engine error code (e.g. 1064 for a MySQL syntax error)
    pub code: Option<u32>,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table, column, or database not found
    NotFound,
    /// Permission denied
    Permission,
    /// Deadlock detected
    Deadlock,
    /// The statement succeeded but its result shape was not the expected one
    ResultShape,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub code: Option<u32>,
    pub message: String,
    pub raw_data: Option<Vec<u8>>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A handle operation was invoked in a state that does not allow it.
#[derive(Debug)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// No SQL text was supplied
    NoSql,
    /// Row fetch requested with no pending result set
    NoPendingRows,
    /// Caller row width does not match the pending result
    ColumnMismatch,
    /// Handle belongs to a different driver
    WrongDriver,
    /// Command invoked with the wrong arguments
    BadArguments,
}

impl Error {
    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => !matches!(c.kind, ConnectionErrorKind::NotConnected),
            Error::Protocol(_) | Error::Io(_) => true,
            _ => false,
        }
    }

    /// Numeric error code reported by the engine or its client library.
    pub fn vendor_code(&self) -> Option<u32> {
        match self {
            Error::Connection(c) => c.code,
            Error::Query(q) => q.code,
            Error::Protocol(p) => p.code,
            _ => None,
        }
    }

    /// Get SQLSTATE if available (e.g., "42000" for a syntax error)
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// The bare message without the category prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            Error::Connection(e) => e.message.clone(),
            Error::Query(e) => e.message.clone(),
            Error::Protocol(e) => e.message.clone(),
            Error::Config(e) => e.message.clone(),
            Error::Usage(e) => e.message.clone(),
            Error::Io(e) => e.to_string(),
            Error::Custom(msg) => msg.clone(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    pub fn usage(kind: UsageErrorKind, message: impl Into<String>) -> Self {
        Error::Usage(UsageError {
            kind,
            message: message.into(),
        })
    }

    pub fn not_connected(message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::NotConnected,
            code: None,
            message: message.into(),
            source: None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Usage(e) => write!(f, "Usage error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(ConfigError {
            message: format!("invalid configuration: {err}"),
            source: Some(Box::new(err)),
        })
    }
}

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
