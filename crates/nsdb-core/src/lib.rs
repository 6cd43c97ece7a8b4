//! Core types and traits for nsdb database drivers.
//!
//! This crate is the host side of the driver interface:
//!
//! - [`Handle`] - per-connection context passed to every driver call
//! - [`Set`] - ordered key/value row container used for labels and values
//! - [`DbDriver`] - the operation table a driver implements
//! - [`register_driver`] / [`driver`] - process-wide driver registry
//! - [`Interp`] / [`ServerRegistry`] - extension command surface
//! - [`at_exit`] - process shutdown hooks

pub mod at_exit;
pub mod config;
pub mod driver;
pub mod error;
pub mod handle;
pub mod interp;
pub mod set;

pub use config::DataSourceConfig;
pub use driver::{
    DbDriver, ExecStatus, FetchStatus, driver, driver_db_type, driver_name, register_driver,
    registered_drivers,
};
pub use error::{Error, Result};
pub use handle::{Handle, MAX_ERROR_MSG, MAX_EXCEPTION_CODE};
pub use interp::{Interp, InterpTrace, ObjCommand, Reply, ServerRegistry};
pub use set::Set;
