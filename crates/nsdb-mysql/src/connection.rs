//! MySQL client connection.
//!
//! A blocking client over TCP or a Unix domain socket speaking the text
//! protocol. Every command resets the connection's last error; failures
//! are recorded there (readable through [`MySqlConnection::errno`] and
//! [`MySqlConnection::error`]) and also returned as [`nsdb_core::Error`].
//!
//! Result sets are buffered completely when a query returns. The buffered
//! result stays with the connection until [`MySqlConnection::store_result`]
//! hands it over; running another command before that is a
//! commands-out-of-sync error.

// MySQL protocol uses well-defined packet sizes that fit in u32 (max 16MB)
#![allow(clippy::cast_possible_truncation)]

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;

use nsdb_core::{Error, Result};

use crate::auth;
use crate::config::{Endpoint, MySqlConfig};
use crate::error::{self, LastError, client};
use crate::protocol::writer::build_packet_from_payload;
use crate::protocol::{
    Command, MAX_PACKET_SIZE, PacketHeader, PacketReader, PacketType, PacketWriter, capabilities,
    server_status,
};
use crate::result::{ResultSet, RowValues};
use crate::types::{ColumnDef, escape_wild};

/// Connection state in the protocol state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport open, awaiting handshake
    Connecting,
    /// Performing authentication handshake
    Authenticating,
    /// Ready for commands
    Ready,
    /// The transport failed; every further command reports the server gone
    Broken,
    /// Closed by the client
    Closed,
}

/// Server details received during the handshake.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub capabilities: u32,
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub auth_plugin: String,
    /// Scramble, without the trailing NUL
    pub auth_data: Vec<u8>,
    pub charset: u8,
    pub status_flags: u16,
}

enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn set_timeouts(
        &self,
        read: Option<std::time::Duration>,
        write: Option<std::time::Duration>,
    ) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => {
                s.set_read_timeout(read)?;
                s.set_write_timeout(write)
            }
            #[cfg(unix)]
            Stream::Unix(s) => {
                s.set_read_timeout(read)?;
                s.set_write_timeout(write)
            }
        }
    }

    fn is_local(&self) -> bool {
        match self {
            Stream::Tcp(_) => false,
            #[cfg(unix)]
            Stream::Unix(_) => true,
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

/// MySQL connection.
pub struct MySqlConnection {
    stream: Stream,
    state: ConnectionState,
    server: ServerInfo,
    /// Capabilities in effect (client request ∩ server offer)
    client_caps: u32,
    status_flags: u16,
    affected_rows: u64,
    last_insert_id: u64,
    warnings: u16,
    /// Column count of the last statement
    field_count: usize,
    pending: Option<ResultSet>,
    last_error: Option<LastError>,
    config: MySqlConfig,
    sequence_id: u8,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("state", &self.state)
            .field("connection_id", &self.server.connection_id)
            .field("host", &self.config.host)
            .field("endpoint", &self.config.endpoint)
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

impl MySqlConnection {
    /// Establish a new connection.
    ///
    /// 1. Open the TCP or Unix socket transport
    /// 2. Receive the server handshake
    /// 3. Send the handshake response
    /// 4. Complete authentication (auth switch, caching_sha2 exchanges)
    #[tracing::instrument(level = "debug", skip(config), fields(host = %config.host))]
    pub fn connect(config: MySqlConfig) -> Result<Self> {
        Self::establish(config).map_err(|e| e.to_error())
    }

    fn establish(config: MySqlConfig) -> std::result::Result<Self, LastError> {
        let stream = open_stream(&config)?;
        stream
            .set_timeouts(Some(config.connect_timeout), Some(config.connect_timeout))
            .map_err(error::server_lost)?;

        let mut conn = Self {
            stream,
            state: ConnectionState::Connecting,
            server: ServerInfo {
                capabilities: 0,
                protocol_version: 0,
                server_version: String::new(),
                connection_id: 0,
                auth_plugin: String::new(),
                auth_data: Vec::new(),
                charset: 0,
                status_flags: 0,
            },
            client_caps: 0,
            status_flags: 0,
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
            field_count: 0,
            pending: None,
            last_error: None,
            config,
            sequence_id: 0,
        };

        conn.server = conn.read_handshake()?;
        conn.status_flags = conn.server.status_flags;
        conn.state = ConnectionState::Authenticating;

        let plugin = if auth::is_supported(&conn.server.auth_plugin) {
            conn.server.auth_plugin.clone()
        } else {
            auth::plugins::MYSQL_NATIVE_PASSWORD.to_string()
        };
        conn.send_handshake_response(&plugin)?;
        conn.authenticate(plugin)?;

        conn.stream
            .set_timeouts(conn.config.read_timeout, conn.config.write_timeout)
            .map_err(error::server_lost)?;
        conn.state = ConnectionState::Ready;

        tracing::debug!(
            server_version = %conn.server.server_version,
            connection_id = conn.server.connection_id,
            "Connected to MySQL server"
        );
        Ok(conn)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn connection_id(&self) -> u32 {
        self.server.connection_id
    }

    /// Server version text from the handshake.
    pub fn server_version(&self) -> &str {
        &self.server.server_version
    }

    /// Rows affected by the last statement; rows returned after a query
    /// that produced a result set.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// AUTO_INCREMENT value generated by the last statement.
    pub fn insert_id(&self) -> u64 {
        self.last_insert_id
    }

    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    pub fn status_flags(&self) -> u16 {
        self.status_flags
    }

    /// Column count of the last statement.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Error number of the last command, 0 when it succeeded.
    pub fn errno(&self) -> u32 {
        self.last_error.as_ref().map_or(0, |e| u32::from(e.code))
    }

    /// Error text of the last command, empty when it succeeded.
    pub fn error(&self) -> &str {
        self.last_error.as_ref().map_or("", |e| e.message.as_str())
    }

    /// SQLSTATE of the last command, `00000` when it succeeded.
    pub fn sqlstate(&self) -> &str {
        self.last_error.as_ref().map_or("00000", |e| e.sqlstate.as_str())
    }

    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Run one SQL statement.
    ///
    /// A statement that returns rows leaves its buffered result on the
    /// connection for [`store_result`](Self::store_result).
    pub fn query(&mut self, sql: &str) -> Result<()> {
        tracing::trace!(sql = %sql, "Executing MySQL query");
        let outcome = self.begin_command().and_then(|()| self.run_query(sql));
        self.record(outcome).map_err(|e| attach_sql(e, sql))
    }

    /// Hand over the buffered result of the last query, once.
    pub fn store_result(&mut self) -> Option<ResultSet> {
        self.pending.take()
    }

    /// Drop the buffered result of the last query, if any.
    pub fn free_result(&mut self) {
        self.pending = None;
    }

    /// Change the default database (COM_INIT_DB).
    pub fn select_db(&mut self, database: &str) -> Result<()> {
        let outcome = self.begin_command().and_then(|()| {
            self.write_command(Command::InitDb, database.as_bytes())?;
            self.read_ok()
        });
        self.record(outcome)?;
        self.config.database = Some(database.to_string());
        Ok(())
    }

    /// Databases matching the `LIKE` pattern `wild` (all when `None`).
    pub fn list_dbs(&mut self, wild: Option<&str>) -> Result<ResultSet> {
        self.list("SHOW DATABASES", wild)
    }

    /// Tables of the current database matching `wild` (all when `None`).
    pub fn list_tables(&mut self, wild: Option<&str>) -> Result<ResultSet> {
        self.list("SHOW TABLES", wild)
    }

    fn list(&mut self, show: &str, wild: Option<&str>) -> Result<ResultSet> {
        let sql = match wild {
            Some(wild) => format!("{show} LIKE '{}'", escape_wild(wild)),
            None => show.to_string(),
        };
        self.query(&sql)?;
        Ok(self.store_result().unwrap_or_default())
    }

    /// Say goodbye (COM_QUIT) and drop the transport.
    pub fn close(mut self) {
        if self.state == ConnectionState::Ready {
            // No reply follows COM_QUIT
            let _ = self.write_command(Command::Quit, &[]);
        }
        self.state = ConnectionState::Closed;
        tracing::debug!(connection_id = self.server.connection_id, "Closed MySQL connection");
    }

    /// Store the outcome of a command as the connection's last error.
    ///
    /// A failed command never leaves a result behind. Transport failures and
    /// malformed replies leave the wire out of step, so the connection is
    /// marked broken.
    fn record<T>(&mut self, outcome: std::result::Result<T, LastError>) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                self.pending = None;
                if matches!(
                    err.code,
                    client::CR_SERVER_LOST
                        | client::CR_SERVER_GONE_ERROR
                        | client::CR_MALFORMED_PACKET
                ) {
                    self.state = ConnectionState::Broken;
                }
                let converted = err.to_error();
                self.last_error = Some(err);
                Err(converted)
            }
        }
    }

    fn begin_command(&mut self) -> std::result::Result<(), LastError> {
        self.last_error = None;
        match self.state {
            ConnectionState::Ready => {}
            _ => return Err(error::server_gone()),
        }
        if self.pending.is_some() {
            return Err(error::out_of_sync());
        }
        Ok(())
    }

    fn run_query(&mut self, sql: &str) -> std::result::Result<(), LastError> {
        self.field_count = 0;
        self.write_command(Command::Query, sql.as_bytes())?;

        let payload = self.read_packet()?;
        let result = self.read_query_response(&payload)?;
        if let Some(rs) = &result {
            self.field_count = rs.num_fields();
            self.affected_rows = rs.num_rows() as u64;
        }

        // Further results (stored procedures) are read and dropped
        while self.status_flags & server_status::SERVER_MORE_RESULTS_EXISTS != 0 {
            let payload = self.read_packet()?;
            self.skip_query_response(&payload)?;
        }
        self.pending = result;
        Ok(())
    }

    /// Parse the response to COM_QUERY: OK, ERR, local infile, or a result set.
    fn read_query_response(
        &mut self,
        payload: &[u8],
    ) -> std::result::Result<Option<ResultSet>, LastError> {
        let Some(&first) = payload.first() else {
            return Err(error::malformed_packet());
        };

        match PacketType::from_first_byte(first, payload.len() as u32) {
            PacketType::Ok => {
                let ok = PacketReader::new(payload)
                    .parse_ok_packet()
                    .ok_or_else(error::malformed_packet)?;
                self.affected_rows = ok.affected_rows;
                self.last_insert_id = ok.last_insert_id;
                self.status_flags = ok.status_flags;
                self.warnings = ok.warnings;
                Ok(None)
            }
            PacketType::Error => Err(self.parse_error(payload)),
            PacketType::LocalInfile => {
                // Decline by sending an empty file, then take the server's verdict
                self.write_packet(&[])?;
                let verdict = self.read_packet()?;
                if verdict.first() == Some(&0xFF) {
                    return Err(self.parse_error(&verdict));
                }
                Err(LastError::client(
                    client::CR_LOAD_DATA_LOCAL_INFILE_REJECTED,
                    "LOAD DATA LOCAL INFILE file request rejected due to restrictions on access.",
                ))
            }
            PacketType::Eof | PacketType::Data => self.read_result_set(payload).map(Some),
        }
    }

    fn skip_query_response(&mut self, payload: &[u8]) -> std::result::Result<(), LastError> {
        let (affected, insert_id, warnings) =
            (self.affected_rows, self.last_insert_id, self.warnings);
        let outcome = self.read_query_response(payload);
        self.affected_rows = affected;
        self.last_insert_id = insert_id;
        self.warnings = warnings;
        outcome.map(|_| ())
    }

    /// Read column definitions and rows following a column-count packet.
    fn read_result_set(&mut self, first_packet: &[u8]) -> std::result::Result<ResultSet, LastError> {
        let column_count = PacketReader::new(first_packet)
            .read_lenenc_int()
            .ok_or_else(error::malformed_packet)? as usize;

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let payload = self.read_packet()?;
            columns.push(ColumnDef::parse(&payload).ok_or_else(error::malformed_packet)?);
        }

        let deprecate_eof = self.client_caps & capabilities::CLIENT_DEPRECATE_EOF != 0;
        if !deprecate_eof {
            let payload = self.read_packet()?;
            if !PacketType::is_row_terminator(&payload, false) {
                return Err(error::malformed_packet());
            }
        }

        let mut rows = Vec::new();
        loop {
            let payload = self.read_packet()?;

            if payload.first() == Some(&0xFF) {
                return Err(self.parse_error(&payload));
            }

            if PacketType::is_row_terminator(&payload, deprecate_eof) {
                let mut reader = PacketReader::new(&payload);
                if deprecate_eof {
                    let ok = reader.parse_ok_packet().ok_or_else(error::malformed_packet)?;
                    self.status_flags = ok.status_flags;
                    self.warnings = ok.warnings;
                } else {
                    let eof = reader.parse_eof_packet().ok_or_else(error::malformed_packet)?;
                    self.status_flags = eof.status_flags;
                    self.warnings = eof.warnings;
                }
                break;
            }

            rows.push(parse_text_row(&payload, column_count)?);
        }

        Ok(ResultSet::new(columns, rows))
    }

    /// Read an OK packet answering a simple command.
    fn read_ok(&mut self) -> std::result::Result<(), LastError> {
        let payload = self.read_packet()?;
        match payload.first() {
            Some(0x00) => {
                if let Some(ok) = PacketReader::new(&payload).parse_ok_packet() {
                    self.status_flags = ok.status_flags;
                    self.warnings = ok.warnings;
                }
                Ok(())
            }
            Some(0xFF) => Err(self.parse_error(&payload)),
            _ => Err(error::malformed_packet()),
        }
    }

    fn parse_error(&self, payload: &[u8]) -> LastError {
        PacketReader::new(payload)
            .parse_err_packet()
            .map_or_else(error::malformed_packet, |err| LastError::from_packet(&err))
    }

    /// Read the initial handshake (protocol v10).
    fn read_handshake(&mut self) -> std::result::Result<ServerInfo, LastError> {
        let payload = self.read_packet()?;

        if payload.first() == Some(&0xFF) {
            return Err(self.parse_error(&payload));
        }

        let mut reader = PacketReader::new(&payload);
        let protocol_version = reader.read_u8().ok_or_else(error::malformed_packet)?;
        if protocol_version != 10 {
            return Err(LastError::client(
                client::CR_MALFORMED_PACKET,
                format!("Unsupported protocol version: {protocol_version}"),
            ));
        }

        let server_version = reader.read_null_string().ok_or_else(error::malformed_packet)?;
        let connection_id = reader.read_u32_le().ok_or_else(error::malformed_packet)?;
        let auth_data_1 = reader.read_bytes(8).ok_or_else(error::malformed_packet)?;

        // Filler
        reader.skip(1);

        let caps_lower = reader.read_u16_le().ok_or_else(error::malformed_packet)?;
        let charset = reader.read_u8().unwrap_or(crate::protocol::charset::DEFAULT_CHARSET);
        let status_flags = reader.read_u16_le().unwrap_or(0);
        let caps_upper = reader.read_u16_le().unwrap_or(0);
        let capabilities = u32::from(caps_lower) | (u32::from(caps_upper) << 16);

        let auth_data_len = if capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.read_u8().unwrap_or(0) as usize
        } else {
            reader.skip(1);
            0
        };

        // Reserved
        reader.skip(10);

        let mut auth_data = auth_data_1.to_vec();
        if capabilities & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            let len2 = auth_data_len.saturating_sub(8).max(13);
            let part2 = reader
                .read_bytes(len2.min(reader.remaining()))
                .unwrap_or_default();
            let part2 = part2.strip_suffix(&[0]).unwrap_or(part2);
            auth_data.extend_from_slice(part2);
        }

        let auth_plugin = if capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.read_null_string().unwrap_or_default()
        } else {
            auth::plugins::MYSQL_NATIVE_PASSWORD.to_string()
        };

        Ok(ServerInfo {
            capabilities,
            protocol_version,
            server_version,
            connection_id,
            auth_plugin,
            auth_data,
            charset,
            status_flags,
        })
    }

    fn send_handshake_response(&mut self, plugin: &str) -> std::result::Result<(), LastError> {
        self.client_caps = self.config.capability_flags() & self.server.capabilities;
        let client_caps = self.client_caps;

        let password = self.config.password.clone().unwrap_or_default();
        let auth_response = auth::scramble(plugin, &password, &self.server.auth_data)?;

        let mut writer = PacketWriter::new();
        writer.write_u32_le(client_caps);
        writer.write_u32_le(self.config.max_packet_size);
        writer.write_u8(self.config.charset);
        writer.write_zeros(23);
        writer.write_null_string(&self.config.user);

        if client_caps & capabilities::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            writer.write_lenenc_bytes(&auth_response);
        } else if client_caps & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            // Scrambles are at most 32 bytes
            writer.write_u8(auth_response.len() as u8);
            writer.write_bytes(&auth_response);
        } else {
            writer.write_bytes(&auth_response);
            writer.write_u8(0);
        }

        if client_caps & capabilities::CLIENT_CONNECT_WITH_DB != 0 {
            writer.write_null_string(self.config.database.as_deref().unwrap_or(""));
        }

        if client_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            writer.write_null_string(plugin);
        }

        if client_caps & capabilities::CLIENT_CONNECT_ATTRS != 0 {
            let mut attrs = PacketWriter::new();
            for (key, value) in &self.config.attributes {
                attrs.write_lenenc_string(key);
                attrs.write_lenenc_string(value);
            }
            writer.write_lenenc_bytes(attrs.as_bytes());
        }

        self.write_packet(writer.as_bytes())
    }

    /// Drive the authentication exchange until the server accepts or
    /// rejects the client.
    fn authenticate(&mut self, mut plugin: String) -> std::result::Result<(), LastError> {
        let password = self.config.password.clone().unwrap_or_default();
        let mut seed = self.server.auth_data.clone();

        loop {
            let payload = self.read_packet()?;
            match payload.first() {
                Some(0x00) => {
                    if let Some(ok) = PacketReader::new(&payload).parse_ok_packet() {
                        self.status_flags = ok.status_flags;
                    }
                    return Ok(());
                }
                Some(0xFF) => return Err(self.parse_error(&payload)),
                Some(0xFE) => {
                    // Auth switch request: plugin name, then a fresh scramble
                    let mut reader = PacketReader::new(&payload[1..]);
                    plugin = reader.read_null_string().unwrap_or_default();
                    let data = reader.read_rest();
                    seed = data.strip_suffix(&[0]).unwrap_or(data).to_vec();
                    tracing::debug!(plugin = %plugin, "MySQL auth switch");
                    let response = auth::scramble(&plugin, &password, &seed)?;
                    self.write_packet(&response)?;
                }
                Some(0x01) => {
                    use auth::caching_sha2::{FAST_AUTH_SUCCESS, PERFORM_FULL_AUTH};
                    use auth::plugins::CACHING_SHA2_PASSWORD;

                    let data = &payload[1..];
                    let response = match (plugin.as_str(), data) {
                        (CACHING_SHA2_PASSWORD, [FAST_AUTH_SUCCESS]) => continue,
                        (CACHING_SHA2_PASSWORD, [PERFORM_FULL_AUTH]) => {
                            if self.stream.is_local() {
                                auth::clear_password(&password)
                            } else {
                                vec![auth::caching_sha2::REQUEST_PUBLIC_KEY]
                            }
                        }
                        // The server's public key, PEM encoded
                        _ => auth::sha256_password_rsa(&password, &seed, data)?,
                    };
                    self.write_packet(&response)?;
                }
                _ => return Err(error::malformed_packet()),
            }
        }
    }

    fn write_command(&mut self, command: Command, payload: &[u8]) -> std::result::Result<(), LastError> {
        self.sequence_id = 0;
        let mut writer = PacketWriter::with_capacity(1 + payload.len());
        writer.write_u8(command as u8);
        writer.write_bytes(payload);
        self.write_packet(writer.as_bytes())
    }

    /// Read one logical packet, joining continuation packets.
    fn read_packet(&mut self) -> std::result::Result<Vec<u8>, LastError> {
        let mut payload = Vec::new();
        loop {
            let mut header_buf = [0u8; PacketHeader::SIZE];
            self.stream
                .read_exact(&mut header_buf)
                .map_err(error::server_lost)?;
            let header = PacketHeader::from_bytes(&header_buf);
            self.sequence_id = header.sequence_id.wrapping_add(1);

            let len = header.payload_length as usize;
            let start = payload.len();
            payload.resize(start + len, 0);
            self.stream
                .read_exact(&mut payload[start..])
                .map_err(error::server_lost)?;

            if len < MAX_PACKET_SIZE {
                return Ok(payload);
            }
        }
    }

    fn write_packet(&mut self, payload: &[u8]) -> std::result::Result<(), LastError> {
        let packet = build_packet_from_payload(payload, self.sequence_id);
        let chunks = payload.len() / MAX_PACKET_SIZE + 1;
        self.sequence_id = self.sequence_id.wrapping_add(chunks as u8);

        self.stream
            .write_all(&packet)
            .and_then(|()| self.stream.flush())
            .map_err(|_| error::server_gone())
    }
}

/// Parse one text-protocol row of `column_count` values.
fn parse_text_row(payload: &[u8], column_count: usize) -> std::result::Result<RowValues, LastError> {
    let mut reader = PacketReader::new(payload);
    (0..column_count)
        .map(|_| reader.read_text_value().ok_or_else(error::malformed_packet))
        .collect()
}

fn open_stream(config: &MySqlConfig) -> std::result::Result<Stream, LastError> {
    match &config.endpoint {
        Endpoint::Socket(path) => open_unix(path),
        Endpoint::Tcp(_) => {
            let addrs = config.resolve()?;
            let mut last_err = None;
            for addr in &addrs {
                match TcpStream::connect_timeout(addr, config.connect_timeout) {
                    Ok(stream) => {
                        let _ = stream.set_nodelay(true);
                        return Ok(Stream::Tcp(stream));
                    }
                    Err(e) => last_err = Some(e),
                }
            }
            let detail = last_err.map_or_else(String::new, |e| e.to_string());
            Err(LastError::client(
                client::CR_CONN_HOST_ERROR,
                format!(
                    "Can't connect to MySQL server on '{}' ({detail})",
                    config.socket_addr()
                ),
            ))
        }
    }
}

#[cfg(unix)]
fn open_unix(path: &std::path::Path) -> std::result::Result<Stream, LastError> {
    UnixStream::connect(path).map(Stream::Unix).map_err(|e| {
        LastError::client(
            client::CR_CONNECTION_ERROR,
            format!(
                "Can't connect to local MySQL server through socket '{}' ({e})",
                path.display()
            ),
        )
    })
}

#[cfg(not(unix))]
fn open_unix(path: &std::path::Path) -> std::result::Result<Stream, LastError> {
    Err(LastError::client(
        client::CR_CONNECTION_ERROR,
        format!(
            "Can't connect to local MySQL server through socket '{}' (unsupported platform)",
            path.display()
        ),
    ))
}

fn attach_sql(err: Error, sql: &str) -> Error {
    match err {
        Error::Query(mut q) => {
            q.sql = Some(sql.to_string());
            Error::Query(q)
        }
        other => other,
    }
}
