//! MySQL client error codes and conversions into [`nsdb_core::Error`].

use std::fmt;

use nsdb_core::Error;
use nsdb_core::error::{
    ConnectionError, ConnectionErrorKind, ProtocolError, QueryError, QueryErrorKind,
};

use crate::protocol::ErrPacket;

/// Client-side error codes (CR_xxx).
pub mod client {
    /// Can't connect to local MySQL server through socket
    pub const CR_CONNECTION_ERROR: u16 = 2002;
    /// Can't connect to MySQL server on host
    pub const CR_CONN_HOST_ERROR: u16 = 2003;
    /// Unknown MySQL server host
    pub const CR_UNKNOWN_HOST: u16 = 2005;
    /// MySQL server has gone away
    pub const CR_SERVER_GONE_ERROR: u16 = 2006;
    /// Lost connection to MySQL server during query
    pub const CR_SERVER_LOST: u16 = 2013;
    /// Commands out of sync
    pub const CR_COMMANDS_OUT_OF_SYNC: u16 = 2014;
    /// Malformed packet
    pub const CR_MALFORMED_PACKET: u16 = 2027;
    /// Authentication plugin cannot be loaded
    pub const CR_AUTH_PLUGIN_CANNOT_LOAD: u16 = 2059;
    /// LOAD DATA LOCAL INFILE request rejected
    pub const CR_LOAD_DATA_LOCAL_INFILE_REJECTED: u16 = 2068;
}

/// The error recorded by the last command on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Server (1xxx) or client (2xxx) error number
    pub code: u16,
    pub sqlstate: String,
    pub message: String,
}

impl LastError {
    pub fn new(code: u16, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }

    /// A client-side error; these always carry the generic SQLSTATE.
    pub fn client(code: u16, message: impl Into<String>) -> Self {
        Self::new(code, "HY000", message)
    }

    pub fn from_packet(err: &ErrPacket) -> Self {
        Self::new(err.error_code, err.sql_state.clone(), err.error_message.clone())
    }

    /// Convert to the shared error type, choosing the category by code.
    pub fn to_error(&self) -> Error {
        match self.code {
            client::CR_CONNECTION_ERROR | client::CR_CONN_HOST_ERROR => {
                connection_error(ConnectionErrorKind::Connect, self)
            }
            client::CR_UNKNOWN_HOST => connection_error(ConnectionErrorKind::DnsResolution, self),
            client::CR_SERVER_GONE_ERROR | client::CR_SERVER_LOST => {
                connection_error(ConnectionErrorKind::Disconnected, self)
            }
            client::CR_AUTH_PLUGIN_CANNOT_LOAD | 1045 | 1251 => {
                connection_error(ConnectionErrorKind::Authentication, self)
            }
            client::CR_MALFORMED_PACKET => Error::Protocol(ProtocolError {
                code: Some(u32::from(self.code)),
                message: self.message.clone(),
                raw_data: None,
                source: None,
            }),
            _ => Error::Query(QueryError {
                kind: query_error_kind(self.code),
                code: Some(u32::from(self.code)),
                sql: None,
                sqlstate: Some(self.sqlstate.clone()),
                message: self.message.clone(),
                source: None,
            }),
        }
    }
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code, self.message)
    }
}

fn connection_error(kind: ConnectionErrorKind, err: &LastError) -> Error {
    Error::Connection(ConnectionError {
        kind,
        code: Some(u32::from(err.code)),
        message: err.message.clone(),
        source: None,
    })
}

/// Classify a server error number.
pub fn query_error_kind(code: u16) -> QueryErrorKind {
    match code {
        // ER_DUP_ENTRY, ER_ROW_IS_REFERENCED_2, ER_NO_REFERENCED_ROW_2
        1062 | 1451 | 1452 => QueryErrorKind::Constraint,
        // ER_PARSE_ERROR
        1064 => QueryErrorKind::Syntax,
        // ER_BAD_DB_ERROR, ER_BAD_FIELD_ERROR, ER_NO_SUCH_TABLE
        1049 | 1054 | 1146 => QueryErrorKind::NotFound,
        // ER_DBACCESS_DENIED_ERROR, ER_ACCESS_DENIED_ERROR, ER_TABLEACCESS_DENIED_ERROR
        1044 | 1045 | 1142 => QueryErrorKind::Permission,
        // ER_LOCK_DEADLOCK
        1213 => QueryErrorKind::Deadlock,
        _ => QueryErrorKind::Database,
    }
}

/// Message text the client library uses for its own error codes.
pub(crate) fn server_lost(detail: impl fmt::Display) -> LastError {
    LastError::client(
        client::CR_SERVER_LOST,
        format!("Lost connection to MySQL server during query ({detail})"),
    )
}

pub(crate) fn server_gone() -> LastError {
    LastError::client(client::CR_SERVER_GONE_ERROR, "MySQL server has gone away")
}

pub(crate) fn malformed_packet() -> LastError {
    LastError::client(client::CR_MALFORMED_PACKET, "Malformed packet")
}

pub(crate) fn out_of_sync() -> LastError {
    LastError::client(
        client::CR_COMMANDS_OUT_OF_SYNC,
        "Commands out of sync; you can't run this command now",
    )
}
