//! A scripted MySQL server for driver tests.
//!
//! Speaks just enough of the protocol for the client: a v10 handshake
//! offering `mysql_native_password` without CLIENT_DEPRECATE_EOF, then
//! COM_QUERY, COM_INIT_DB and COM_QUIT. Query replies come from
//! a script closure.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use nsdb_core::DbDriver;

pub const SERVER_VERSION: &str = "8.0.36-scripted";

/// How the server answers one statement.
#[derive(Debug, Clone)]
pub enum Response {
    Ok {
        affected_rows: u64,
        insert_id: u64,
    },
    Err {
        code: u16,
        sqlstate: &'static str,
        message: String,
    },
    /// A result set; each column is `(table, name)`.
    Rows {
        columns: Vec<(&'static str, &'static str)>,
        rows: Vec<Vec<Option<&'static str>>>,
    },
    /// A result set flagged with more results to come, then `then`
    MoreResults {
        first: Box<Response>,
        then: Box<Response>,
    },
    /// A result set whose column definition is cut short, followed by
    /// the rest of the result set
    Malformed,
    /// Drop the connection without replying
    Hangup,
}

impl Response {
    pub fn ok(affected_rows: u64) -> Self {
        Response::Ok {
            affected_rows,
            insert_id: 0,
        }
    }

    pub fn err(code: u16, sqlstate: &'static str, message: impl Into<String>) -> Self {
        Response::Err {
            code,
            sqlstate,
            message: message.into(),
        }
    }
}

type Script = Arc<dyn Fn(&str) -> Response + Send + Sync>;

enum Listen {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

/// A running scripted server. Each accepted connection is served on its
/// own thread.
pub struct ScriptedServer {
    listen: Listen,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub fn start(script: impl Fn(&str) -> Response + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let script: Script = Arc::new(script);

        let log = Arc::clone(&queries);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let script = Arc::clone(&script);
                let log = Arc::clone(&log);
                std::thread::spawn(move || serve(stream, &script, &log));
            }
        });

        Self {
            listen: Listen::Tcp(addr),
            queries,
        }
    }

    #[cfg(unix)]
    pub fn start_unix(script: impl Fn(&str) -> Response + Send + Sync + 'static) -> Self {
        use std::os::unix::net::UnixListener;

        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = std::env::temp_dir().join(format!(
            "nsdb-mysql-{}-{}.sock",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let script: Script = Arc::new(script);

        let log = Arc::clone(&queries);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let script = Arc::clone(&script);
                let log = Arc::clone(&log);
                std::thread::spawn(move || serve(stream, &script, &log));
            }
        });

        Self {
            listen: Listen::Unix(path),
            queries,
        }
    }

    /// Datasource string reaching this server with `database` selected.
    pub fn datasource(&self, database: &str) -> String {
        match &self.listen {
            Listen::Tcp(addr) => format!("{}:{}:{database}", addr.ip(), addr.port()),
            Listen::Unix(path) => format!("localhost:{}:{database}", path.display()),
        }
    }

    /// Statements received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        if let Listen::Unix(path) = &self.listen {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// The statements used across the driver scenarios.
pub fn sales_script(sql: &str) -> Response {
    match sql {
        "SELECT id, name FROM customers ORDER BY id" => Response::Rows {
            columns: vec![("customers", "id"), ("customers", "name")],
            rows: vec![vec![Some("1"), Some("Ada")], vec![Some("2"), None]],
        },
        "SELECT id FROM customers WHERE 1 = 0" => Response::Rows {
            columns: vec![("customers", "id")],
            rows: vec![],
        },
        "SELECT c.id, o.total FROM customers c JOIN orders o ON o.customer_id = c.id" => {
            Response::Rows {
                columns: vec![("customers", "id"), ("orders", "total")],
                rows: vec![vec![Some("1"), Some("9.50")]],
            }
        }
        "CALL monthly_report()" => Response::MoreResults {
            first: Box::new(Response::Rows {
                columns: vec![("", "month")],
                rows: vec![vec![Some("2024-01")]],
            }),
            then: Box::new(Response::err(
                1146,
                "42S02",
                "Table 'sales.ledger' doesn't exist",
            )),
        },
        "SELECT * FROM garbled" => Response::Malformed,
        "UPDATE customers SET active = 1" => Response::ok(3),
        "INSERT INTO customers (name) VALUES ('Grace')" => Response::Ok {
            affected_rows: 1,
            insert_id: 42,
        },
        "SHOW DATABASES" => Response::Rows {
            columns: vec![("", "Database")],
            rows: vec![vec![Some("sales")], vec![Some("test")]],
        },
        "SHOW DATABASES LIKE 's%'" => Response::Rows {
            columns: vec![("", "Database")],
            rows: vec![vec![Some("sales")]],
        },
        "SHOW TABLES" => Response::Rows {
            columns: vec![("", "Tables_in_sales")],
            rows: vec![vec![Some("customers")], vec![Some("orders")]],
        },
        "SELECT nope FROM customers" => Response::err(
            1054,
            "42S22",
            "Unknown column 'nope' in 'field list'",
        ),
        "HANGUP" => Response::Hangup,
        other => Response::err(
            1064,
            "42000",
            format!("You have an error in your SQL syntax near '{other}'"),
        ),
    }
}

/// The registered `mysql` driver.
pub fn mysql() -> Arc<dyn DbDriver> {
    static INIT: Once = Once::new();
    INIT.call_once(|| nsdb_mysql::driver_init(Some("mysql"), "nsdbmysql").unwrap());
    nsdb_core::driver("mysql").unwrap()
}

fn serve<S: Read + Write>(mut stream: S, script: &Script, log: &Mutex<Vec<String>>) {
    let _ = session(&mut stream, script, log);
}

fn session<S: Read + Write>(
    stream: &mut S,
    script: &Script,
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    const CAPS: u32 = 1 // LONG_PASSWORD
        | (1 << 3) // CONNECT_WITH_DB
        | (1 << 9) // PROTOCOL_41
        | (1 << 13) // TRANSACTIONS
        | (1 << 15) // SECURE_CONNECTION
        | (1 << 19); // PLUGIN_AUTH

    let mut hello = Vec::new();
    hello.push(10);
    hello.extend_from_slice(SERVER_VERSION.as_bytes());
    hello.push(0);
    hello.extend_from_slice(&7u32.to_le_bytes());
    hello.extend_from_slice(b"abcdefgh");
    hello.push(0);
    hello.extend_from_slice(&((CAPS & 0xFFFF) as u16).to_le_bytes());
    hello.push(45);
    hello.extend_from_slice(&2u16.to_le_bytes());
    hello.extend_from_slice(&((CAPS >> 16) as u16).to_le_bytes());
    hello.push(21);
    hello.extend_from_slice(&[0; 10]);
    hello.extend_from_slice(b"ijklmnopqrst");
    hello.push(0);
    hello.extend_from_slice(b"mysql_native_password\0");
    write_packet(stream, 0, &hello)?;

    let (_, login) = read_packet(stream)?;
    let user_end = login[32..].iter().position(|b| *b == 0).unwrap_or(0);
    let user = String::from_utf8_lossy(&login[32..32 + user_end]).into_owned();
    if user == "denied" {
        let message = format!("Access denied for user '{user}'@'localhost' (using password: NO)");
        return write_packet(stream, 2, &err_payload(1045, "28000", &message));
    }
    write_packet(stream, 2, &ok_payload(0, 0))?;

    loop {
        let (_, packet) = read_packet(stream)?;
        let Some((&command, body)) = packet.split_first() else {
            return Ok(());
        };
        let text = String::from_utf8_lossy(body).into_owned();
        match command {
            // COM_QUIT
            0x01 => return Ok(()),
            // COM_INIT_DB
            0x02 if text == "nope" => {
                write_packet(stream, 1, &err_payload(1049, "42000", "Unknown database 'nope'"))?;
            }
            0x02 => write_packet(stream, 1, &ok_payload(0, 0))?,
            0x03 => {
                log.lock().unwrap().push(text.clone());
                match script(&text) {
                    Response::Hangup => return Ok(()),
                    response => {
                write_response(stream, 1, &response, 0)?;
            }
                }
            }
            _ => write_packet(stream, 1, &err_payload(1047, "08S01", "Unknown command"))?,
        }
    }
}

/// Write `response` starting at sequence `seq`; returns the next sequence.
///
/// `status` is added to the server status of the final OK or EOF packet.
fn write_response<S: Write>(
    stream: &mut S,
    mut seq: u8,
    response: &Response,
    status: u16,
) -> std::io::Result<u8> {
    match response {
        Response::Ok {
            affected_rows,
            insert_id,
        } => {
            let mut payload = ok_payload(*affected_rows, *insert_id);
            payload[3..5].copy_from_slice(&(0x0002 | status).to_le_bytes());
            write_packet(stream, seq, &payload)?;
        }
        Response::Err {
            code,
            sqlstate,
            message,
        } => write_packet(stream, seq, &err_payload(*code, sqlstate, message))?,
        Response::Rows { columns, rows } => {
            write_packet(stream, seq, &[columns.len() as u8])?;
            for (table, column) in columns {
                seq += 1;
                write_packet(stream, seq, &column_definition(table, column))?;
            }
            seq += 1;
            write_packet(stream, seq, &eof_payload(0))?;
            for row in rows {
                let mut payload = Vec::new();
                for value in row {
                    match value {
                        Some(text) => lenenc_str(&mut payload, text),
                        None => payload.push(0xFB),
                    }
                }
                seq += 1;
                write_packet(stream, seq, &payload)?;
            }
            seq += 1;
            write_packet(stream, seq, &eof_payload(status))?;
        }
        Response::MoreResults { first, then } => {
            // SERVER_MORE_RESULTS_EXISTS
            seq = write_response(stream, seq, first, 0x0008)?;
            return write_response(stream, seq, then, status);
        }
        Response::Malformed => {
            write_packet(stream, seq, &[1])?;
            let mut truncated = Vec::new();
            lenenc_str(&mut truncated, "def");
            write_packet(stream, seq + 1, &truncated)?;
            write_packet(stream, seq + 2, &eof_payload(0))?;
            write_packet(stream, seq + 3, &[1, b'1'])?;
            seq += 4;
            write_packet(stream, seq, &eof_payload(status))?;
        }
        Response::Hangup => return Ok(seq),
    }
    Ok(seq.wrapping_add(1))
}

fn column_definition(table: &str, name: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    lenenc_str(&mut payload, "def");
    lenenc_str(&mut payload, "sales");
    lenenc_str(&mut payload, table);
    lenenc_str(&mut payload, table);
    lenenc_str(&mut payload, name);
    lenenc_str(&mut payload, name);
    payload.push(0x0c);
    payload.extend_from_slice(&45u16.to_le_bytes());
    payload.extend_from_slice(&255u32.to_le_bytes());
    // VAR_STRING
    payload.push(0xFD);
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.push(0);
    payload.extend_from_slice(&[0, 0]);
    payload
}

fn ok_payload(affected_rows: u64, insert_id: u64) -> Vec<u8> {
    assert!(affected_rows < 251 && insert_id < 251);
    vec![0x00, affected_rows as u8, insert_id as u8, 0x02, 0x00, 0x00, 0x00]
}

fn err_payload(code: u16, sqlstate: &str, message: &str) -> Vec<u8> {
    let mut payload = vec![0xFF];
    payload.extend_from_slice(&code.to_le_bytes());
    payload.push(b'#');
    payload.extend_from_slice(sqlstate.as_bytes());
    payload.extend_from_slice(message.as_bytes());
    payload
}

fn eof_payload(status: u16) -> Vec<u8> {
    let status = (0x0002 | status).to_le_bytes();
    vec![0xFE, 0x00, 0x00, status[0], status[1]]
}

fn lenenc_str(buf: &mut Vec<u8>, text: &str) {
    assert!(text.len() < 251);
    buf.push(text.len() as u8);
    buf.extend_from_slice(text.as_bytes());
}

fn write_packet<S: Write>(stream: &mut S, seq: u8, payload: &[u8]) -> std::io::Result<()> {
    let len = payload.len() as u32;
    let mut packet = len.to_le_bytes()[..3].to_vec();
    packet.push(seq);
    packet.extend_from_slice(payload);
    stream.write_all(&packet)?;
    stream.flush()
}

fn read_packet<S: Read>(stream: &mut S) -> std::io::Result<(u8, Vec<u8>)> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header)?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0; len];
    stream.read_exact(&mut payload)?;
    Ok((header[3], payload))
}

/// A TCP port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
