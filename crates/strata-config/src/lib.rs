//! Configuration management for Strata
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (STRATA_* prefix, highest precedence)
//! 2. strata.local.toml (gitignored, local overrides)
//! 3. strata.toml (git-tracked, project config)
//! 4. ~/.config/strata/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! This is the environment surface the front-end boundary consumes: the
//! identity store id, broker id, audience, region, and resource id it needs
//! to authenticate users and call the storage resource with exchanged
//! credentials.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Strata configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub deployment: DeploymentConfig,
    pub identity: IdentityConfig,
    pub broker: BrokerConfig,
    pub storage: StorageConfig,
}

/// Deployment-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub name: String,
    pub region: String,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            name: "strata-deployment".to_string(),
            region: "eu-west-1".to_string(),
        }
    }
}

/// Identity store surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Identity record store identifier.
    pub store_id: String,
    /// Audience / client application id tokens are issued to.
    pub audience: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            audience: String::new(),
            token_ttl_secs: 3600,
        }
    }
}

/// Credential broker surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Credential broker identifier.
    pub broker_id: String,
    /// Issued-credential lifetime in seconds.
    pub credential_ttl_secs: u64,
    /// Path to the operator-applied federation table artifact.
    pub federation_table: PathBuf,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            broker_id: String::new(),
            credential_ttl_secs: 3600,
            federation_table: PathBuf::from("federation.toml"),
        }
    }
}

/// Storage resource surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Identifier of the partitioned storage resource.
    pub resource_id: String,
    /// Session tag key the access policy substitutes.
    pub tag_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            resource_id: String::new(),
            tag_key: "client".to_string(),
        }
    }
}

impl StrataConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.broker.federation_table.is_relative() {
            self.broker.federation_table = base.join(&self.broker.federation_table);
        }
    }

    /// Checks that every field the front-end boundary needs is populated.
    ///
    /// The defaults leave deployment-specific identifiers empty on purpose:
    /// an unconfigured deployment should fail here, at startup, not at the
    /// first denied storage call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.identity.store_id.is_empty() {
            missing.push("identity.store_id");
        }
        if self.identity.audience.is_empty() {
            missing.push("identity.audience");
        }
        if self.broker.broker_id.is_empty() {
            missing.push("broker.broker_id");
        }
        if self.storage.resource_id.is_empty() {
            missing.push("storage.resource_id");
        }
        if self.storage.tag_key.is_empty() {
            missing.push("storage.tag_key");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(format!(
                "missing required configuration: {}",
                missing.join(", ")
            )))
        }
    }
}
