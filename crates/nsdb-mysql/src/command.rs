//! The `ns_mysql` extension command.
//!
//! ```text
//! ns_mysql include_tablenames handle 1|0
//! ns_mysql list_dbs handle ?wild?
//! ns_mysql list_tables handle ?wild?
//! ns_mysql resultrows handle
//! ns_mysql select_db handle database
//! ns_mysql insert_id handle
//! ns_mysql version handle
//! ```

use nsdb_core::error::UsageErrorKind;
use nsdb_core::interp::{get_index, wrong_num_args};
use nsdb_core::{Error, Handle, Interp, ObjCommand, Reply, Result, driver_db_type};

use crate::driver::{DB_TYPE, connection, set_include_tablenames};
use crate::library;
use crate::log::log_vendor_error;

const OPTIONS: [&str; 7] = [
    "include_tablenames",
    "list_dbs",
    "list_tables",
    "resultrows",
    "select_db",
    "insert_id",
    "version",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opt {
    IncludeTablenames,
    ListDbs,
    ListTables,
    ResultRows,
    SelectDb,
    InsertId,
    Version,
}

impl Opt {
    const ALL: [Opt; 7] = [
        Opt::IncludeTablenames,
        Opt::ListDbs,
        Opt::ListTables,
        Opt::ResultRows,
        Opt::SelectDb,
        Opt::InsertId,
        Opt::Version,
    ];
}

/// `ns_mysql option handle ?args?`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlCommand;

impl ObjCommand for MySqlCommand {
    fn call(&self, interp: &mut Interp, argv: &[&str]) -> Result<Reply> {
        if argv.len() < 3 {
            return Err(wrong_num_args(argv, 1, "option handle ?args?"));
        }
        let opt = Opt::ALL[get_index(argv[1], &OPTIONS, "option")?];

        let name = argv[2];
        let handle = interp.handle_mut(name)?;
        if driver_db_type(handle).as_deref() != Some(DB_TYPE) {
            return Err(Error::usage(
                UsageErrorKind::WrongDriver,
                format!("handle \"{name}\" is not of type \"{DB_TYPE}\""),
            ));
        }
        library::thread_init();

        match opt {
            Opt::IncludeTablenames => {
                if argv.len() != 4 {
                    return Err(wrong_num_args(argv, 2, "handle 1|0"));
                }
                set_include_tablenames(atoi(argv[3]) != 0);
                Ok(Reply::Empty)
            }
            Opt::ListDbs | Opt::ListTables => {
                if argv.len() > 4 {
                    return Err(wrong_num_args(argv, 2, "handle ?wild?"));
                }
                list(handle, opt, argv.get(3).copied())
            }
            Opt::ResultRows => {
                let conn = connection(handle)?;
                Ok(Reply::Int(conn.affected_rows() as i64))
            }
            Opt::SelectDb => {
                if argv.len() != 4 {
                    return Err(wrong_num_args(argv, 2, "handle database"));
                }
                let outcome = connection(handle)?.select_db(argv[3]);
                log_vendor_error(handle);
                outcome
                    .map(|()| Reply::Empty)
                    .map_err(|_| Error::Custom("mysql_select_db failed.".to_string()))
            }
            Opt::InsertId => {
                let conn = connection(handle)?;
                Ok(Reply::Int(conn.insert_id() as i64))
            }
            Opt::Version => {
                let conn = connection(handle)?;
                Ok(Reply::Text(format!("mysql{}", conn.server_version())))
            }
        }
    }
}

/// Every value of every row of `SHOW DATABASES` / `SHOW TABLES`.
fn list(handle: &mut Handle, opt: Opt, wild: Option<&str>) -> Result<Reply> {
    let conn = connection(handle)?;
    let (outcome, failed) = if opt == Opt::ListDbs {
        (conn.list_dbs(wild), "mysql_list_dbs failed.")
    } else {
        (conn.list_tables(wild), "mysql_list_tables failed.")
    };
    log_vendor_error(handle);

    let result = outcome.map_err(|_| Error::Custom(failed.to_string()))?;
    Ok(Reply::List(result.into_elements()))
}

/// C `atoi`: optional leading whitespace and sign, then digits; anything
/// else reads as 0.
fn atoi(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative { -value } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MySqlDriver, include_tablenames};
    use nsdb_core::register_driver;
    use std::sync::Arc;

    fn interp() -> Interp {
        // Another test may have registered it already
        let _ = register_driver("mysql", Arc::new(MySqlDriver));
        let mut interp = Interp::new("server1");
        interp.create_command("ns_mysql", Arc::new(MySqlCommand));
        interp.add_handle("nsdb0", Handle::new("mysql"));
        interp.add_handle("pg0", Handle::new("postgres"));
        interp
    }

    #[test]
    fn test_atoi() {
        assert_eq!(atoi("1"), 1);
        assert_eq!(atoi("  42abc"), 42);
        assert_eq!(atoi("-7"), -7);
        assert_eq!(atoi("yes"), 0);
        assert_eq!(atoi(""), 0);
    }

    #[test]
    fn test_arity_errors() {
        let mut interp = interp();
        let err = interp.eval(&["ns_mysql", "version"]).unwrap_err();
        assert_eq!(
            err.message(),
            "wrong # args: should be \"ns_mysql option handle ?args?\""
        );

        let err = interp
            .eval(&["ns_mysql", "select_db", "nsdb0"])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "wrong # args: should be \"ns_mysql select_db handle database\""
        );

        let err = interp
            .eval(&["ns_mysql", "list_dbs", "nsdb0", "a%", "extra"])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "wrong # args: should be \"ns_mysql list_dbs handle ?wild?\""
        );

        let err = interp
            .eval(&["ns_mysql", "include_tablenames", "nsdb0"])
            .unwrap_err();
        assert_eq!(
            err.message(),
            "wrong # args: should be \"ns_mysql include_tablenames handle 1|0\""
        );
    }

    #[test]
    fn test_bad_option() {
        let mut interp = interp();
        let err = interp.eval(&["ns_mysql", "bogus", "nsdb0"]).unwrap_err();
        assert_eq!(
            err.message(),
            "bad option \"bogus\": must be include_tablenames, list_dbs, list_tables, \
             resultrows, select_db, insert_id, or version"
        );
        let err = interp.eval(&["ns_mysql", "list", "nsdb0"]).unwrap_err();
        assert!(err.message().starts_with("ambiguous option \"list\""));
    }

    #[test]
    fn test_handle_checks() {
        let mut interp = interp();
        let err = interp.eval(&["ns_mysql", "version", "pg0"]).unwrap_err();
        assert_eq!(err.message(), "handle \"pg0\" is not of type \"mysql\"");

        let err = interp.eval(&["ns_mysql", "version", "nsdb7"]).unwrap_err();
        assert_eq!(err.message(), "invalid database id:  \"nsdb7\"");

        let err = interp.eval(&["ns_mysql", "insert_id", "nsdb0"]).unwrap_err();
        assert_eq!(err.message(), "Invalid connection.");
    }

    #[test]
    fn test_include_tablenames_toggle() {
        let mut interp = interp();
        let reply = interp
            .eval(&["ns_mysql", "include_tablenames", "nsdb0", "1"])
            .unwrap();
        assert_eq!(reply, Reply::Empty);
        assert!(include_tablenames());

        interp
            .eval(&["ns_mysql", "inc", "nsdb0", "off"])
            .unwrap();
        assert!(!include_tablenames());
    }
}
