//! MySQL connection configuration.

use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LastError, client};

/// Default MySQL TCP port.
pub const DEFAULT_PORT: u16 = 3306;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP port; 0 selects [`DEFAULT_PORT`]
    Tcp(u16),
    /// Unix domain socket path
    Socket(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp(DEFAULT_PORT)
    }
}

/// MySQL connection configuration.
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    /// Hostname or IP address
    pub host: String,
    pub endpoint: Endpoint,
    pub user: String,
    pub password: Option<String>,
    /// Database selected at connect time
    pub database: Option<String>,
    /// Character set (default: utf8mb4)
    pub charset: u8,
    pub connect_timeout: Duration,
    /// Read timeout once connected; `None` blocks indefinitely
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
    /// Connection attributes sent with the handshake
    pub attributes: HashMap<String, String>,
    /// Max allowed packet size (default: 64MB)
    pub max_packet_size: u32,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            endpoint: Endpoint::default(),
            user: String::new(),
            password: None,
            database: None,
            charset: crate::protocol::charset::DEFAULT_CHARSET,
            connect_timeout: Duration::from_secs(30),
            read_timeout: None,
            write_timeout: None,
            attributes: HashMap::new(),
            max_packet_size: 64 * 1024 * 1024,
        }
    }
}

impl MySqlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Connect over TCP on `port`.
    pub fn port(mut self, port: u16) -> Self {
        self.endpoint = Endpoint::Tcp(port);
        self
    }

    /// Connect through a Unix domain socket.
    pub fn socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.endpoint = Endpoint::Socket(path.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn charset(mut self, charset: u8) -> Self {
        self.charset = charset;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Set a connection attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// TCP port after applying the default.
    pub fn tcp_port(&self) -> Option<u16> {
        match self.endpoint {
            Endpoint::Tcp(0) => Some(DEFAULT_PORT),
            Endpoint::Tcp(port) => Some(port),
            Endpoint::Socket(_) => None,
        }
    }

    /// `host:port` display form of the TCP endpoint.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port().unwrap_or(DEFAULT_PORT))
    }

    /// Resolve the TCP endpoint; hostnames go through the system resolver.
    pub fn resolve(&self) -> Result<Vec<SocketAddr>, LastError> {
        let port = self.tcp_port().unwrap_or(DEFAULT_PORT);
        let unknown_host = || {
            LastError::client(
                client::CR_UNKNOWN_HOST,
                format!("Unknown MySQL server host '{}'", self.host),
            )
        };
        let addrs: Vec<SocketAddr> = (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(|_| unknown_host())?
            .collect();
        if addrs.is_empty() {
            return Err(unknown_host());
        }
        Ok(addrs)
    }

    /// Capability flags requested from the server.
    pub fn capability_flags(&self) -> u32 {
        use crate::protocol::capabilities::{
            CLIENT_CONNECT_ATTRS, CLIENT_CONNECT_WITH_DB, DEFAULT_CLIENT_FLAGS,
        };

        let mut flags = DEFAULT_CLIENT_FLAGS;

        if self.database.as_deref().is_some_and(|db| !db.is_empty()) {
            flags |= CLIENT_CONNECT_WITH_DB;
        }

        if !self.attributes.is_empty() {
            flags |= CLIENT_CONNECT_ATTRS;
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::capabilities::*;

    #[test]
    fn test_config_builder() {
        let config = MySqlConfig::new()
            .host("db.example.com")
            .port(3307)
            .user("web")
            .password("secret")
            .database("sales")
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(5))
            .attribute("program_name", "nsdb");

        assert_eq!(config.host, "db.example.com");
        assert_eq!(config.endpoint, Endpoint::Tcp(3307));
        assert_eq!(config.user, "web");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.database.as_deref(), Some("sales"));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.write_timeout, None);
        assert_eq!(
            config.attributes.get("program_name").map(String::as_str),
            Some("nsdb")
        );
    }

    #[test]
    fn test_default_port() {
        let config = MySqlConfig::new().host("db.example.com").port(0);
        assert_eq!(config.tcp_port(), Some(DEFAULT_PORT));
        assert_eq!(config.socket_addr(), "db.example.com:3306");

        let config = MySqlConfig::new().socket("/tmp/mysql.sock");
        assert_eq!(config.tcp_port(), None);
    }

    #[test]
    fn test_resolve_loopback() {
        let addrs = MySqlConfig::new().host("127.0.0.1").port(3307).resolve().unwrap();
        assert_eq!(addrs[0].port(), 3307);
        assert!(addrs[0].ip().is_loopback());
    }

    #[test]
    fn test_capability_flags() {
        let flags = MySqlConfig::new().capability_flags();
        assert!(flags & CLIENT_PROTOCOL_41 != 0);
        assert!(flags & CLIENT_SECURE_CONNECTION != 0);
        assert!(flags & CLIENT_CONNECT_WITH_DB == 0);
        assert!(flags & CLIENT_MULTI_STATEMENTS == 0);

        let flags = MySqlConfig::new()
            .database("sales")
            .attribute("k", "v")
            .capability_flags();
        assert!(flags & CLIENT_CONNECT_WITH_DB != 0);
        assert!(flags & CLIENT_CONNECT_ATTRS != 0);

        // An empty database name is not sent
        let flags = MySqlConfig::new().database("").capability_flags();
        assert!(flags & CLIENT_CONNECT_WITH_DB == 0);
    }
}
