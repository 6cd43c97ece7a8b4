//! Driver capability trait and process-wide driver registry.
//!
//! A database engine plugs into the host by implementing [`DbDriver`] and
//! registering an instance under a name with [`register_driver`]. Each
//! method corresponds to one slot of the host's operation table.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{Error, Result};
use crate::handle::Handle;
use crate::interp::ServerRegistry;
use crate::set::Set;

/// Outcome of [`DbDriver::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// Statement completed without a result set
    Dml,
    /// A result set is pending; call [`DbDriver::bind_row`] then
    /// [`DbDriver::get_row`]
    Rows,
}

/// Outcome of [`DbDriver::get_row`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The caller's row now holds the next row's values
    Row,
    /// The result set is exhausted and has been released
    EndData,
}

/// The operation table a database driver registers with the host.
///
/// Handles are driven from one thread at a time; a driver may be called
/// concurrently for different handles.
pub trait DbDriver: Send + Sync {
    /// Name reported to the host.
    fn name(&self) -> &str;

    /// Engine type, used to check that a handle belongs to this driver.
    fn db_type(&self) -> &str;

    /// Per-virtual-server initialization.
    fn server_init(&self, server: &str, module: &str, servers: &ServerRegistry) -> Result<()> {
        let _ = (server, module, servers);
        Ok(())
    }

    /// Connect the handle using its datasource and credentials.
    fn open_db(&self, handle: &mut Handle) -> Result<()>;

    /// Release the handle's connection.
    fn close_db(&self, handle: &mut Handle) -> Result<()>;

    /// Run a statement that returns no rows.
    fn dml(&self, handle: &mut Handle, sql: Option<&str>) -> Result<()>;

    /// Run a query and return its column labels.
    fn select<'h>(&self, handle: &'h mut Handle, sql: Option<&str>) -> Result<&'h Set>;

    /// Copy the next row of the pending result into `row`.
    fn get_row(&self, handle: &mut Handle, row: &mut Set) -> Result<FetchStatus>;

    /// Rows affected or returned by the last statement.
    fn get_row_count(&self, handle: &mut Handle) -> Result<u64>;

    /// Discard any pending rows.
    fn flush(&self, handle: &mut Handle) -> Result<()> {
        self.cancel(handle)
    }

    /// Discard any pending rows.
    fn cancel(&self, handle: &mut Handle) -> Result<()>;

    /// Run a statement of unknown shape.
    fn exec(&self, handle: &mut Handle, sql: Option<&str>) -> Result<ExecStatus>;

    /// Column labels of the result left pending by [`exec`](DbDriver::exec).
    fn bind_row<'h>(&self, handle: &'h mut Handle) -> Result<&'h Set>;
}

type DriverMap = RwLock<HashMap<String, Arc<dyn DbDriver>>>;

static DRIVERS: OnceLock<DriverMap> = OnceLock::new();

fn drivers() -> &'static DriverMap {
    DRIVERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register `driver` under `name`.
pub fn register_driver(name: &str, driver: Arc<dyn DbDriver>) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("driver name must not be empty"));
    }
    let mut map = drivers()
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if map.contains_key(name) {
        return Err(Error::config(format!("driver \"{name}\" already registered")));
    }
    tracing::debug!(driver = name, db_type = driver.db_type(), "registered driver");
    map.insert(name.to_string(), driver);
    Ok(())
}

/// Look up a registered driver.
pub fn driver(name: &str) -> Option<Arc<dyn DbDriver>> {
    drivers()
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(name)
        .cloned()
}

/// Names of all registered drivers, sorted.
pub fn registered_drivers() -> Vec<String> {
    let mut names: Vec<String> = drivers()
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

/// Name of the driver `handle` was created for.
pub fn driver_name(handle: &Handle) -> &str {
    &handle.driver
}

/// Engine type of the driver that owns `handle`, if it is registered.
pub fn driver_db_type(handle: &Handle) -> Option<String> {
    driver(&handle.driver).map(|d| d.db_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDriver;

    impl DbDriver for NullDriver {
        fn name(&self) -> &str {
            "null"
        }
        fn db_type(&self) -> &str {
            "null"
        }
        fn open_db(&self, handle: &mut Handle) -> Result<()> {
            handle.connected = true;
            Ok(())
        }
        fn close_db(&self, handle: &mut Handle) -> Result<()> {
            handle.connected = false;
            Ok(())
        }
        fn dml(&self, _handle: &mut Handle, _sql: Option<&str>) -> Result<()> {
            Ok(())
        }
        fn select<'h>(&self, handle: &'h mut Handle, _sql: Option<&str>) -> Result<&'h Set> {
            Ok(&handle.row)
        }
        fn get_row(&self, _handle: &mut Handle, _row: &mut Set) -> Result<FetchStatus> {
            Ok(FetchStatus::EndData)
        }
        fn get_row_count(&self, _handle: &mut Handle) -> Result<u64> {
            Ok(0)
        }
        fn cancel(&self, handle: &mut Handle) -> Result<()> {
            handle.fetching_rows = false;
            Ok(())
        }
        fn exec(&self, _handle: &mut Handle, _sql: Option<&str>) -> Result<ExecStatus> {
            Ok(ExecStatus::Dml)
        }
        fn bind_row<'h>(&self, handle: &'h mut Handle) -> Result<&'h Set> {
            Ok(&handle.row)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        register_driver("null-test", Arc::new(NullDriver)).unwrap();
        assert!(registered_drivers().contains(&"null-test".to_string()));

        let driver = driver("null-test").unwrap();
        let mut handle = Handle::new("null-test");
        driver.open_db(&mut handle).unwrap();
        assert!(handle.connected);
        assert_eq!(driver_name(&handle), "null-test");
        assert_eq!(driver_db_type(&handle).as_deref(), Some("null"));

        handle.fetching_rows = true;
        driver.flush(&mut handle).unwrap();
        assert!(!handle.fetching_rows);
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        register_driver("null-dup", Arc::new(NullDriver)).unwrap();
        assert!(register_driver("null-dup", Arc::new(NullDriver)).is_err());
        assert!(register_driver("", Arc::new(NullDriver)).is_err());
        assert!(driver("never-registered").is_none());
    }
}
