//! MySQL driver for the nsdb handle interface.
//!
//! Two layers live in this crate:
//!
//! - A blocking MySQL client written against the wire protocol: packet
//!   framing, the v10 handshake with `mysql_native_password`,
//!   `caching_sha2_password`, `sha256_password` and
//!   `mysql_clear_password`, text-protocol queries with fully buffered
//!   result sets, and per-connection last-error state.
//! - The `mysql` driver that plugs that client into `nsdb-core`: the
//!   operation table ([`MySqlDriver`]), process and thread lifecycle
//!   ([`library`]), and the `ns_mysql` extension command.
//!
//! # Datasources
//!
//! A handle's datasource is `host:port:database` or
//! `host:/path/to/mysqld.sock:database`.
//!
//! # Example
//!
//! ```rust,ignore
//! use nsdb_core::{Handle, driver};
//!
//! nsdb_mysql::driver_init(Some("mysql"), "nsdbmysql")?;
//! let mysql = driver("mysql").unwrap();
//!
//! let mut handle = Handle::new("mysql")
//!     .datasource("localhost:3306:sales")
//!     .user("web");
//! mysql.open_db(&mut handle)?;
//! let labels = mysql.select(&mut handle, Some("SELECT id, name FROM customers"))?;
//! ```

pub mod auth;
pub mod command;
pub mod config;
pub mod connection;
pub mod datasource;
pub mod driver;
pub mod error;
pub mod library;
pub mod log;
pub mod protocol;
pub mod result;
pub mod types;

pub use command::MySqlCommand;
pub use config::{Endpoint, MySqlConfig};
pub use connection::{ConnectionState, MySqlConnection};
pub use datasource::DataSource;
pub use driver::{MySqlDriver, driver_init, include_tablenames, set_include_tablenames};
pub use error::LastError;
pub use library::MODULE_VERSION;
pub use result::ResultSet;
