//! The `mysql` driver: the host's operation table implemented over
//! [`MySqlConnection`].
//!
//! The handle's connection slot holds a [`MySqlConnection`] and its
//! statement slot holds the [`ResultSet`] being fetched. Every operation
//! copies the connection's last error onto the handle after each client
//! call, so scripts see the server's error number and text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use nsdb_core::error::{QueryError, QueryErrorKind, UsageErrorKind};
use nsdb_core::{
    DbDriver, Error, ExecStatus, FetchStatus, Handle, Interp, Result, ServerRegistry, Set,
    at_exit, driver_name, register_driver,
};

use crate::command::MySqlCommand;
use crate::connection::MySqlConnection;
use crate::datasource::DataSource;
use crate::library;
use crate::log::{log_error, log_vendor_error};
use crate::result::ResultSet;

/// Engine type reported for every handle this driver owns.
pub const DB_TYPE: &str = "mysql";

/// Name of the extension command installed into each interpreter.
pub const COMMAND_NAME: &str = "ns_mysql";

static INCLUDE_TABLENAMES: AtomicBool = AtomicBool::new(false);
static REGISTER_AT_EXIT: Once = Once::new();

/// Whether column labels are qualified as `table.column`.
pub fn include_tablenames() -> bool {
    INCLUDE_TABLENAMES.load(Ordering::Relaxed)
}

/// Turn `table.column` labels on or off for every handle. Labels already
/// built are left as they are.
pub fn set_include_tablenames(on: bool) {
    INCLUDE_TABLENAMES.store(on, Ordering::Relaxed);
}

/// Load the driver under `driver`.
///
/// The client library is initialized on the first call and shut down by an
/// at-exit hook. Later calls only register another name.
pub fn driver_init(driver: Option<&str>, path: &str) -> Result<()> {
    let Some(driver) = driver else {
        tracing::error!(
            bug = true,
            "nsdbmysql: Ns_DbDriverInit() called with NULL driver name."
        );
        return Err(Error::config("driver name is missing"));
    };

    if !library::thread_safe() {
        tracing::error!("nsdbmysql: mysql library not compiled thread safe");
        return Err(Error::config("mysql library not compiled thread safe"));
    }

    library::init()?;
    REGISTER_AT_EXIT.call_once(|| {
        at_exit::register("nsdbmysql:cleanshutdown", || {
            library::end();
        });
    });

    tracing::debug!(driver, path, "nsdbmysql: loading driver");
    register_driver(driver, Arc::new(MySqlDriver)).inspect_err(|_| {
        tracing::error!("nsdbmysql: Could not register the {} driver.", driver);
    })
}

/// The MySQL operation table.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDriver;

impl DbDriver for MySqlDriver {
    fn name(&self) -> &str {
        DB_TYPE
    }

    fn db_type(&self) -> &str {
        DB_TYPE
    }

    fn server_init(&self, server: &str, module: &str, servers: &ServerRegistry) -> Result<()> {
        tracing::debug!(server, module, "nsdbmysql: installing {}", COMMAND_NAME);
        servers.register_trace(
            server,
            Arc::new(|interp: &mut Interp| {
                interp.create_command(COMMAND_NAME, Arc::new(MySqlCommand));
                Ok(())
            }),
        );
        Ok(())
    }

    fn open_db(&self, handle: &mut Handle) -> Result<()> {
        let Some(datasource) = handle.datasource.clone() else {
            return Err(invalid_connection());
        };
        library::thread_init();

        let source = match DataSource::parse(&datasource) {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(
                    "nsdbmysql: {}: invalid datasource {}",
                    driver_name(handle),
                    datasource
                );
                return Err(err);
            }
        };

        let config = source.to_config(handle.user.as_deref(), handle.password.as_deref());
        match MySqlConnection::connect(config) {
            Ok(conn) => {
                handle.set_connection(conn);
                handle.connected = true;
                Ok(())
            }
            Err(err) => {
                log_error(Some(handle), &err);
                Err(err)
            }
        }
    }

    fn close_db(&self, handle: &mut Handle) -> Result<()> {
        if !handle.has_connection() {
            return Err(invalid_connection());
        }
        library::thread_init();

        release_statement(handle);
        if let Some(conn) = handle.take_connection::<MySqlConnection>() {
            conn.close();
        }
        handle.connected = false;
        Ok(())
    }

    fn dml(&self, handle: &mut Handle, sql: Option<&str>) -> Result<()> {
        let sql = require_sql(sql)?;
        require_connection(handle)?;
        library::thread_init();

        query(handle, sql)?;
        // A row-returning statement run here leaves nothing to fetch
        if let Some(conn) = handle.connection_mut::<MySqlConnection>() {
            conn.free_result();
        }
        Ok(())
    }

    fn select<'h>(&self, handle: &'h mut Handle, sql: Option<&str>) -> Result<&'h Set> {
        let sql = require_sql(sql)?;
        require_connection(handle)?;
        library::thread_init();

        release_statement(handle);
        query(handle, sql)?;
        let result = store_result(handle)?;

        if result.num_fields() == 0 {
            tracing::error!(
                "DbSelect({}):  Query did not return rows:  {}",
                handle.datasource.as_deref().unwrap_or_default(),
                sql
            );
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::ResultShape,
                code: None,
                sql: Some(sql.to_string()),
                sqlstate: None,
                message: "Query did not return rows".to_string(),
                source: None,
            }));
        }

        build_labels(&mut handle.row, &result);
        handle.set_statement(result);
        handle.fetching_rows = true;
        Ok(&handle.row)
    }

    fn get_row(&self, handle: &mut Handle, row: &mut Set) -> Result<FetchStatus> {
        if !handle.fetching_rows {
            let message = format!(
                "DbGetRow({}):  No rows waiting to fetch.",
                handle.datasource.as_deref().unwrap_or_default()
            );
            tracing::error!("{}", message);
            return Err(Error::usage(UsageErrorKind::NoPendingRows, message));
        }
        library::thread_init();

        let numcols = handle
            .statement_mut::<ResultSet>()
            .map_or(0, |result| result.num_fields());
        if numcols == 0 {
            release_statement(handle);
            return Err(Error::usage(
                UsageErrorKind::NoPendingRows,
                "result set has no columns",
            ));
        }

        if numcols != row.len() {
            let message = format!(
                "DbGetRow: Number of columns in row ({}) not equal to number of columns in row fetched ({}).",
                row.len(),
                numcols
            );
            tracing::error!("{}", message);
            release_statement(handle);
            return Err(Error::usage(UsageErrorKind::ColumnMismatch, message));
        }

        let Some(values) = handle
            .statement_mut::<ResultSet>()
            .and_then(ResultSet::fetch_row)
        else {
            release_statement(handle);
            return Ok(FetchStatus::EndData);
        };

        for (i, value) in values.into_iter().enumerate() {
            row.put_value(i, value.unwrap_or_default());
        }
        Ok(FetchStatus::Row)
    }

    fn get_row_count(&self, handle: &mut Handle) -> Result<u64> {
        let conn = connection(handle)?;
        library::thread_init();
        Ok(conn.affected_rows())
    }

    fn cancel(&self, handle: &mut Handle) -> Result<()> {
        require_connection(handle)?;
        library::thread_init();

        if handle.fetching_rows {
            release_statement(handle);
        }
        Ok(())
    }

    fn exec(&self, handle: &mut Handle, sql: Option<&str>) -> Result<ExecStatus> {
        let sql = require_sql(sql)?;
        require_connection(handle)?;
        library::thread_init();

        release_statement(handle);
        query(handle, sql)?;

        let conn = connection(handle)?;
        let result = conn.store_result();
        let field_count = conn.field_count();

        match result {
            None if field_count == 0 => Ok(ExecStatus::Dml),
            None => {
                tracing::error!("nsdbmysql: DbExec() has columns but result set is NULL");
                Err(Error::Query(QueryError {
                    kind: QueryErrorKind::ResultShape,
                    code: None,
                    sql: Some(sql.to_string()),
                    sqlstate: None,
                    message: "DbExec() has columns but result set is NULL".to_string(),
                    source: None,
                }))
            }
            Some(result) if result.num_fields() == 0 => Ok(ExecStatus::Dml),
            Some(result) => {
                handle.set_statement(result);
                handle.fetching_rows = true;
                Ok(ExecStatus::Rows)
            }
        }
    }

    fn bind_row<'h>(&self, handle: &'h mut Handle) -> Result<&'h Set> {
        let Some(result) = handle.take_statement::<ResultSet>() else {
            return Err(invalid_connection());
        };
        library::thread_init();

        build_labels(&mut handle.row, &result);
        handle.set_statement(result);
        Ok(&handle.row)
    }
}

fn invalid_connection() -> Error {
    tracing::error!("nsdbmysql: Invalid connection.");
    Error::not_connected("Invalid connection.")
}

fn require_sql(sql: Option<&str>) -> Result<&str> {
    sql.ok_or_else(|| {
        tracing::error!("nsdbmysql: no sql.");
        Error::usage(UsageErrorKind::NoSql, "no sql.")
    })
}

fn require_connection(handle: &mut Handle) -> Result<()> {
    connection(handle).map(|_| ())
}

pub(crate) fn connection(handle: &mut Handle) -> Result<&mut MySqlConnection> {
    handle
        .connection_mut::<MySqlConnection>()
        .ok_or_else(invalid_connection)
}

/// Run `sql` and copy any client error onto the handle.
fn query(handle: &mut Handle, sql: &str) -> Result<()> {
    let outcome = connection(handle)?.query(sql);
    log_vendor_error(handle);
    outcome
}

/// Take the buffered result of the statement just run. A statement that
/// produced no result set yields an empty one.
fn store_result(handle: &mut Handle) -> Result<ResultSet> {
    let result = connection(handle)?.store_result();
    log_vendor_error(handle);
    Ok(result.unwrap_or_default())
}

/// Drop the pending result set and stop fetching.
fn release_statement(handle: &mut Handle) {
    let _ = handle.take_statement::<ResultSet>();
    handle.fetching_rows = false;
}

/// Replace `row` with one key per column of `result`.
fn build_labels(row: &mut Set, result: &ResultSet) {
    row.clear();
    for label in result.labels(include_tablenames()) {
        row.put(label, None);
    }
}
