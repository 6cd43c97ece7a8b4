//! Copying client errors onto handles.

use nsdb_core::{Error, Handle, MAX_ERROR_MSG};

use crate::connection::MySqlConnection;

/// Log the connection's last error, if it has one, and record it as the
/// handle's exception. A clean connection leaves the handle untouched.
pub fn log_vendor_error(handle: &mut Handle) {
    let Some(conn) = handle.connection_mut::<MySqlConnection>() else {
        return;
    };
    let Some(err) = conn.last_error().cloned() else {
        return;
    };
    record(Some(handle), u32::from(err.code), &err.message);
}

/// Log `err` and, when it carries a client or server error number, record
/// it on `handle`.
pub fn log_error(handle: Option<&mut Handle>, err: &Error) {
    match err.vendor_code() {
        Some(code) if code != 0 => record(handle, code, &err.message()),
        _ => tracing::error!("nsdbmysql: {}", err.message()),
    }
}

fn record(handle: Option<&mut Handle>, code: u32, message: &str) {
    let mut end = message.len().min(MAX_ERROR_MSG);
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    let message = &message[..end];

    tracing::error!("MySQL log message: ({code}) '{message}'");
    if let Some(handle) = handle {
        handle.set_exception(code, message);
    }
}
