//! Process-wide and per-thread client library state.
//!
//! [`init`] runs once per process before any driver is registered and
//! [`end`] runs once at process exit. Worker threads call [`thread_init`]
//! before touching a connection; the per-thread state is released when the
//! thread exits.

use std::cell::RefCell;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use nsdb_core::{Error, Result};

use crate::connection::MySqlConnection;

/// Version of the host module interface this driver implements.
pub const MODULE_VERSION: i32 = 1;

/// Marker for an initialized client library.
#[derive(Debug)]
pub struct Library;

static LIBRARY: OnceLock<Library> = OnceLock::new();
static ENDED: AtomicBool = AtomicBool::new(false);
static ATTACHED: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD: RefCell<Option<ThreadState>> = const { RefCell::new(None) };
}

/// Whether connections may be used from threads other than the one that
/// opened them.
pub fn thread_safe() -> bool {
    fn assert_send<T: Send>() {}
    assert_send::<MySqlConnection>();
    true
}

/// Initialize the client library. Later calls return the same state.
pub fn init() -> Result<&'static Library> {
    if ENDED.load(Ordering::Acquire) {
        return Err(Error::config("mysql client library already shut down"));
    }
    Ok(LIBRARY.get_or_init(|| {
        tracing::debug!("nsdbmysql: library init");
        Library
    }))
}

pub fn is_initialized() -> bool {
    LIBRARY.get().is_some() && !ENDED.load(Ordering::Acquire)
}

/// Shut the client library down. Returns `false` if it already was.
pub fn end() -> bool {
    if ENDED.swap(true, Ordering::AcqRel) {
        return false;
    }
    tracing::debug!("nsdbmysql: AtExit");
    true
}

/// Per-thread client state; dropping it detaches the thread.
#[derive(Debug)]
pub struct ThreadState {
    thread: std::thread::ThreadId,
}

impl Drop for ThreadState {
    fn drop(&mut self) {
        tracing::debug!(thread = ?self.thread, "nsdbmysql: CleanupThread");
        ATTACHED.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Attach the calling thread to the client library; idempotent per thread.
pub fn thread_init() {
    // Thread-locals are gone while the thread is being torn down
    let _ = THREAD.try_with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_none() {
            let thread = std::thread::current().id();
            tracing::debug!(thread = ?thread, "nsdbmysql: InitThread");
            ATTACHED.fetch_add(1, Ordering::AcqRel);
            *slot = Some(ThreadState { thread });
        }
    });
}

/// Detach the calling thread before it exits. Returns whether it was attached.
pub fn thread_end() -> bool {
    THREAD
        .try_with(|slot| slot.borrow_mut().take())
        .ok()
        .flatten()
        .is_some()
}

/// Whether the calling thread has called [`thread_init`].
pub fn thread_initialized() -> bool {
    THREAD
        .try_with(|slot| slot.borrow().is_some())
        .unwrap_or(false)
}

/// Number of threads currently attached.
pub fn attached_threads() -> usize {
    ATTACHED.load(Ordering::Acquire)
}
