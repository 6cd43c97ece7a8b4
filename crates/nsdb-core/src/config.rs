//! Pool configuration entries that describe how to build a [`Handle`].
//!
//! [`Handle`]: crate::Handle

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One configured datasource, as the host reads it from its config file.
///
/// ```rust
/// use nsdb_core::DataSourceConfig;
///
/// let config = DataSourceConfig::from_json(
///     r#"{"driver": "mysql", "datasource": "localhost:3306:sales", "user": "web"}"#,
/// ).unwrap();
/// assert_eq!(config.driver, "mysql");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Registered driver name
    pub driver: String,
    /// Driver-specific datasource string
    pub datasource: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DataSourceConfig {
    /// Parse a single entry from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON object mapping pool names to entries.
    pub fn pools_from_json(text: &str) -> Result<Vec<(String, Self)>> {
        let pools: std::collections::BTreeMap<String, Self> = serde_json::from_str(text)?;
        pools
            .into_iter()
            .map(|(name, config)| {
                config.validate()?;
                Ok((name, config))
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.driver.is_empty() {
            return Err(Error::config("driver name must not be empty"));
        }
        Ok(())
    }
}
