use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Connection settings for the graph database.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Neo4jConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: String::new(),
            database: default_database(),
            fetch_size: default_fetch_size(),
            max_connections: default_max_connections(),
        }
    }
}

/// Paging policy and the optional per-query deadline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Page size used when a caller does not ask for one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Hard upper bound on page size; larger requests are clamped.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    /// When set, every catalog operation is abandoned after this many seconds.
    #[serde(default)]
    pub query_timeout_secs: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            query_timeout_secs: None,
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }
}

fn default_uri() -> String {
    "127.0.0.1:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_fetch_size() -> usize {
    500
}

fn default_max_connections() -> usize {
    10
}

fn default_limit() -> u32 {
    20
}

fn default_max_limit() -> u32 {
    100
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.neo4j.uri, "127.0.0.1:7687");
        assert_eq!(config.neo4j.username, "neo4j");
        assert_eq!(config.neo4j.database, "neo4j");
        assert_eq!(config.catalog.default_limit, 20);
        assert_eq!(config.catalog.max_limit, 100);
        assert!(config.catalog.timeout().is_none());
    }

    #[test]
    fn test_parse_full_document() {
        let yaml = r#"
neo4j:
  uri: bolt.example.com:7687
  username: reader
  password: secret
  database: movies
  fetch_size: 200
  max_connections: 4
catalog:
  default_limit: 10
  max_limit: 50
  query_timeout_secs: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.neo4j.uri, "bolt.example.com:7687");
        assert_eq!(config.neo4j.password, "secret");
        assert_eq!(config.neo4j.database, "movies");
        assert_eq!(config.neo4j.fetch_size, 200);
        assert_eq!(config.catalog.default_limit, 10);
        assert_eq!(config.catalog.max_limit, 50);
        assert_eq!(config.catalog.timeout(), Some(Duration::from_secs(5)));
    }
}
