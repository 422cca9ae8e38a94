//! Configuration for the command line client

use config::Config;
use serde::Deserialize;

use crate::{Client, ClientOptions, MemoryStore, DEFAULT_ADDRESS};

/// Prefix of the environment variables that override the configuration file
pub const ENV_PREFIX: &str = "REDLOAD";

/// All configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Where the client connects.
    pub client: ClientOptions,
    /// Which store commands are sent to.
    pub backend: Backend,
    /// Default filter of the log output, overridden by `RUST_LOG`.
    pub log_level: String,
}

/// Store that client handles are created for
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A Redis server at the configured address.
    #[default]
    Redis,
    /// An in-process store that lives as long as the process, for dry runs.
    Memory,
}

impl Configuration {
    /// Get the configuration from an optional file, then from the environment.
    ///
    /// Environment variables are prefixed with `REDLOAD` and use `__` to separate nested
    /// keys, e.g. `REDLOAD__CLIENT__ADDRESS`.
    pub fn get(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(name) = file {
            builder = builder.add_source(config::File::with_name(name));
        }
        let conf = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        let mut conf: Self = conf.try_deserialize()?;
        if conf.client.address.is_empty() {
            conf.client.address = DEFAULT_ADDRESS.to_string();
        }
        if conf.log_level.is_empty() {
            conf.log_level = "info".to_string();
        }
        Ok(conf)
    }

    /// Creates a client handle for the configured backend.
    pub fn client(&self) -> Client {
        match self.backend {
            Backend::Redis => Client::new(self.client.clone()),
            Backend::Memory => Client::with_store(MemoryStore::default()),
        }
    }
}
