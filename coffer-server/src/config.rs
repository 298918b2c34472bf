use coffer_core::{CofferError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root under which the per-node directories are created.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: PathBuf,
    /// Number of storage nodes created at startup, named `node1..nodeN`.
    #[serde(default = "default_node_count")]
    pub node_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
    #[serde(default = "default_virtual_nodes")]
    pub virtual_nodes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_metadata_dir() -> PathBuf {
    PathBuf::from("./metadata")
}

fn default_node_count() -> usize {
    3
}

fn default_replication_factor() -> usize {
    2
}

fn default_virtual_nodes() -> usize {
    150
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            storage: StorageConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            metadata_dir: default_metadata_dir(),
            node_count: default_node_count(),
        }
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replication_factor: default_replication_factor(),
            virtual_nodes: default_virtual_nodes(),
        }
    }
}

impl Config {
    /// Load from an optional config file layered under `COFFER_*`
    /// environment overrides (e.g. `COFFER_STORAGE__NODE_COUNT=5`).
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(::config::Environment::with_prefix("COFFER").separator("__"))
            .build()
            .map_err(|e| CofferError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| CofferError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.node_count == 0 {
            return Err(CofferError::Config(
                "storage.node_count must be at least 1".to_string(),
            ));
        }
        if self.replication.replication_factor == 0 {
            return Err(CofferError::Config(
                "replication.replication_factor must be at least 1".to_string(),
            ));
        }
        if self.replication.virtual_nodes == 0 {
            return Err(CofferError::Config(
                "replication.virtual_nodes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
