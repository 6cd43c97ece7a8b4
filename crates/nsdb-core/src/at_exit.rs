//! Process shutdown hooks.
//!
//! Drivers that own process-wide resources register a hook here; the host
//! calls [`run`] once while shutting down.

use std::sync::Mutex;

type Hook = (String, Box<dyn FnOnce() + Send>);

static HOOKS: Mutex<Vec<Hook>> = Mutex::new(Vec::new());

/// Register a hook to run at process exit.
pub fn register(label: impl Into<String>, hook: impl FnOnce() + Send + 'static) {
    let label = label.into();
    tracing::debug!(hook = %label, "registered at-exit hook");
    HOOKS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push((label, Box::new(hook)));
}

/// Run and discard all registered hooks in registration order.
///
/// Hooks registered while this runs are kept for a later call.
pub fn run() -> usize {
    let hooks = std::mem::take(
        &mut *HOOKS
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner),
    );
    let count = hooks.len();
    for (label, hook) in hooks {
        tracing::debug!(hook = %label, "running at-exit hook");
        hook();
    }
    count
}

/// Labels of the hooks that have not run yet.
pub fn pending() -> Vec<String> {
    HOOKS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .iter()
        .map(|(label, _)| label.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hooks_run_once_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            let calls = Arc::clone(&calls);
            register(format!("test:{name}"), move || {
                order.lock().unwrap().push(name);
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(pending().contains(&"test:first".to_string()));

        run();
        run();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let order = order.lock().unwrap();
        let first = order.iter().position(|n| *n == "first").unwrap();
        let second = order.iter().position(|n| *n == "second").unwrap();
        assert!(first < second);
    }
}
