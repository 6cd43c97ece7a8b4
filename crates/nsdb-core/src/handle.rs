//! Per-connection handle shared between the host and a driver.

use std::any::Any;
use std::fmt;

use crate::config::DataSourceConfig;
use crate::set::Set;

/// Longest exception code kept on a handle (the host reserves six bytes).
pub const MAX_EXCEPTION_CODE: usize = 5;

/// Longest exception message kept on a handle, in bytes.
pub const MAX_ERROR_MSG: usize = 1024;

/// Connection context owned by the host and passed to every driver call.
///
/// The driver owns the contents of the `connection` and `statement` slots;
/// the host only sees them as opaque values.
pub struct Handle {
    /// Name the driver was registered under
    pub driver: String,
    /// Driver-specific datasource string
    pub datasource: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connected: bool,
    /// Whether a result set is open and rows remain
    pub fetching_rows: bool,
    /// Column labels of the current statement
    pub row: Set,
    connection: Option<Box<dyn Any + Send>>,
    statement: Option<Box<dyn Any + Send>>,
    exception_code: String,
    exception_msg: String,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("driver", &self.driver)
            .field("datasource", &self.datasource)
            .field("user", &self.user)
            .field("connected", &self.connected)
            .field("fetching_rows", &self.fetching_rows)
            .field("has_statement", &self.statement.is_some())
            .field("exception_code", &self.exception_code)
            .finish_non_exhaustive()
    }
}

impl Handle {
    /// Create a disconnected handle for the named driver.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            datasource: None,
            user: None,
            password: None,
            connected: false,
            fetching_rows: false,
            row: Set::new("row"),
            connection: None,
            statement: None,
            exception_code: String::new(),
            exception_msg: String::new(),
        }
    }

    /// Create a handle from a pool configuration entry.
    pub fn from_config(config: &DataSourceConfig) -> Self {
        let mut handle = Self::new(config.driver.clone());
        handle.datasource = Some(config.datasource.clone());
        handle.user.clone_from(&config.user);
        handle.password.clone_from(&config.password);
        handle
    }

    /// Set the datasource.
    pub fn datasource(mut self, datasource: impl Into<String>) -> Self {
        self.datasource = Some(datasource.into());
        self
    }

    /// Set the user name.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Record an exception on the handle, truncating both parts to the
    /// host's buffer sizes.
    pub fn set_exception(&mut self, code: impl fmt::Display, message: &str) {
        let mut code = code.to_string();
        truncate_on_char_boundary(&mut code, MAX_EXCEPTION_CODE);
        self.exception_code = code;

        let mut msg = message.to_string();
        truncate_on_char_boundary(&mut msg, MAX_ERROR_MSG);
        self.exception_msg = msg;
    }

    pub fn clear_exception(&mut self) {
        self.exception_code.clear();
        self.exception_msg.clear();
    }

    pub fn exception_code(&self) -> &str {
        &self.exception_code
    }

    pub fn exception_msg(&self) -> &str {
        &self.exception_msg
    }

    /// Store the driver's connection object.
    pub fn set_connection<T: Any + Send>(&mut self, conn: T) {
        self.connection = Some(Box::new(conn));
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Borrow the connection object as `T`, if present and of that type.
    pub fn connection_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.connection.as_mut()?.downcast_mut::<T>()
    }

    /// Remove the connection object, returning it if it was a `T`.
    pub fn take_connection<T: Any + Send>(&mut self) -> Option<T> {
        let boxed = self.connection.take()?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Store the driver's pending statement.
    pub fn set_statement<T: Any + Send>(&mut self, statement: T) {
        self.statement = Some(Box::new(statement));
    }

    pub fn has_statement(&self) -> bool {
        self.statement.is_some()
    }

    pub fn statement_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.statement.as_mut()?.downcast_mut::<T>()
    }

    pub fn take_statement<T: Any + Send>(&mut self) -> Option<T> {
        let boxed = self.statement.take()?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Borrow the connection and the pending statement at the same time.
    pub fn connection_and_statement<C: Any + Send, S: Any + Send>(
        &mut self,
    ) -> (Option<&mut C>, Option<&mut S>) {
        let conn = self
            .connection
            .as_mut()
            .and_then(|c| c.downcast_mut::<C>());
        let stmt = self.statement.as_mut().and_then(|s| s.downcast_mut::<S>());
        (conn, stmt)
    }
}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}
