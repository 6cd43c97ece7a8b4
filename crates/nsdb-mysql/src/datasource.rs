//! Datasource strings: `host:port:database` or `host:/socket/path:database`.

use std::path::PathBuf;

use nsdb_core::{Error, Result};

use crate::config::{Endpoint, MySqlConfig};

/// A parsed datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    /// Host name; empty means the client default (`localhost`)
    pub host: String,
    pub endpoint: Endpoint,
    pub database: String,
}

impl DataSource {
    /// Split on the first two `:`.
    ///
    /// The middle segment is a socket path when it starts with `/`,
    /// otherwise a TCP port read from its leading digits (no digits reads
    /// as 0, which selects the default port).
    pub fn parse(datasource: &str) -> Result<Self> {
        let invalid = || Error::config(format!("invalid datasource {datasource}"));

        let (host, rest) = datasource.split_once(':').ok_or_else(invalid)?;
        let (port, database) = rest.split_once(':').ok_or_else(invalid)?;

        let endpoint = if port.starts_with('/') {
            Endpoint::Socket(PathBuf::from(port))
        } else {
            Endpoint::Tcp(parse_port(port).ok_or_else(invalid)?)
        };

        Ok(Self {
            host: host.to_string(),
            endpoint,
            database: database.to_string(),
        })
    }

    /// Connection settings for this datasource and the given credentials.
    pub fn to_config(&self, user: Option<&str>, password: Option<&str>) -> MySqlConfig {
        let mut config = MySqlConfig::new();
        if !self.host.is_empty() {
            config = config.host(self.host.as_str());
        }
        config.endpoint = self.endpoint.clone();
        if let Some(user) = user {
            config = config.user(user);
        }
        if let Some(password) = password {
            config = config.password(password);
        }
        if !self.database.is_empty() {
            config = config.database(self.database.as_str());
        }
        config
    }
}

/// Leading-digit port parse: `"3306x"` is 3306, `"abc"` is 0. Values that
/// do not fit a port are rejected.
fn parse_port(segment: &str) -> Option<u16> {
    let trimmed = segment.trim_start();
    let digits: &str = trimmed
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("");
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse::<u16>().ok()
}
