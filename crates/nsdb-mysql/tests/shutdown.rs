//! Process shutdown ends the client library.

use nsdb_core::at_exit;
use nsdb_mysql::{driver_init, library};

#[test]
fn test_at_exit_ends_library_once() {
    driver_init(Some("mysql"), "nsdbmysql").unwrap();
    assert!(library::is_initialized());
    assert!(
        at_exit::pending()
            .iter()
            .any(|h| h == "nsdbmysql:cleanshutdown")
    );

    assert_eq!(at_exit::run(), 1);
    assert!(!library::is_initialized());
    assert!(!library::end());
    assert_eq!(at_exit::run(), 0);

    // A shut down library cannot be loaded again
    assert!(driver_init(Some("mysql-late"), "nsdbmysql").is_err());
}
