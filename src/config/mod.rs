//! Configuration loading and management

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use validator::Validate;

use crate::core::error::ConfigError;
use crate::core::schema::QuerySchema;

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Address the REST exposure listens on
    #[serde(default = "default_bind")]
    #[validate(length(min = 1))]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Complete configuration: server settings plus one schema per collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,

    /// Collection schemas, served under `/api/{name}`
    #[serde(default)]
    pub collections: Vec<QuerySchema>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    ///
    /// The result is checked; an invalid config never leaves this function.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Validate field constraints and cross-field rules
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.bind_addr()?;

        let mut names = HashSet::new();
        for schema in &self.collections {
            if !names.insert(schema.name.as_str()) {
                return Err(ConfigError::Schema {
                    collection: schema.name.clone(),
                    message: "collection is declared twice".to_string(),
                });
            }
            schema.check()?;
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.server.bind.clone()))
    }

    pub fn collection(&self, name: &str) -> Option<&QuerySchema> {
        self.collections.iter().find(|schema| schema.name == name)
    }

    /// Merge another configuration into this one
    ///
    /// Collections with the same name are replaced in place; new ones are
    /// appended. The other config's server settings win.
    pub fn merge(mut self, other: AppConfig) -> Self {
        for schema in other.collections {
            match self.collections.iter_mut().find(|s| s.name == schema.name) {
                Some(existing) => *existing = schema,
                None => self.collections.push(schema),
            }
        }
        self.server = other.server;
        self
    }

    /// Every preset listing
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            collections: vec![
                QuerySchema::videos(),
                QuerySchema::directory(),
                QuerySchema::favorites(),
                QuerySchema::community(),
                QuerySchema::users(),
                QuerySchema::notifications(),
                QuerySchema::categories(),
            ],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}
