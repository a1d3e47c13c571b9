//! Configuration file support for mvpnd
//!
//! Loads and validates table configuration from TOML files.
//! Default location: /etc/mvpnd/mvpnd.toml

use crate::error::{Result, TableError};
use crate::instance::{RoutingInstance, DEFAULT_PARTITION_COUNT};
use bgp_types::{ExtCommunity, MvpnPrefix, RouteDistinguisher};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// Largest accepted partition count.
pub const MAX_PARTITION_COUNT: usize = 1024;

/// A routing instance to build an inetmvpn table for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name
    pub name: String,

    /// Whether this is the default (master) instance
    #[serde(default)]
    pub default: bool,
}

impl InstanceConfig {
    pub fn routing_instance(&self) -> RoutingInstance {
        if self.default {
            RoutingInstance::default_instance()
        } else {
            RoutingInstance::new(self.name.clone())
        }
    }
}

/// A route to install at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSeed {
    /// Instance whose table receives the route
    pub instance: String,

    /// Prefix in `<type>-<rd>-<group>,<source>` form
    pub prefix: String,

    /// Advertising peer; absent for locally originated routes
    #[serde(default)]
    pub peer: Option<u32>,

    #[serde(default)]
    pub path_id: u32,

    #[serde(default = "default_local_pref")]
    pub local_pref: u32,

    /// RD of the originating VRF, carried on the path attributes
    #[serde(default)]
    pub source_rd: Option<String>,

    /// Extended communities to attach when replicating
    #[serde(default)]
    pub community: Option<String>,
}

impl RouteSeed {
    pub fn parsed_prefix(&self) -> Result<MvpnPrefix> {
        Ok(self.prefix.parse()?)
    }

    pub fn parsed_source_rd(&self) -> Result<RouteDistinguisher> {
        match &self.source_rd {
            Some(rd) => Ok(rd.parse()?),
            None => Ok(RouteDistinguisher::NULL),
        }
    }

    pub fn parsed_community(&self) -> Result<Option<ExtCommunity>> {
        match &self.community {
            Some(community) => Ok(Some(community.parse()?)),
            None => Ok(None),
        }
    }
}

/// Complete mvpnd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvpnConfig {
    /// Number of partitions per table
    #[serde(default = "default_partition_count")]
    pub partition_count: usize,

    /// Default log filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Routing instances to build tables for
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,

    /// Routes installed at startup
    #[serde(default)]
    pub routes: Vec<RouteSeed>,
}

fn default_partition_count() -> usize {
    DEFAULT_PARTITION_COUNT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_local_pref() -> u32 {
    100
}

impl Default for MvpnConfig {
    fn default() -> Self {
        Self {
            partition_count: default_partition_count(),
            log_level: default_log_level(),
            instances: Vec::new(),
            routes: Vec::new(),
        }
    }
}

impl MvpnConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                TableError::config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(TableError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TableError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default instance, if one is configured.
    pub fn default_instance(&self) -> Option<&InstanceConfig> {
        self.instances.iter().find(|i| i.default)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.partition_count == 0 || self.partition_count > MAX_PARTITION_COUNT {
            return Err(TableError::config(format!(
                "partition_count must be 1-{}",
                MAX_PARTITION_COUNT
            )));
        }

        let mut names = HashSet::new();
        for instance in &self.instances {
            if instance.name.is_empty() {
                return Err(TableError::config("instance name must not be empty"));
            }
            if !names.insert(instance.name.as_str()) {
                return Err(TableError::config(format!(
                    "duplicate instance '{}'",
                    instance.name
                )));
            }
        }

        if self.instances.iter().filter(|i| i.default).count() > 1 {
            return Err(TableError::config(
                "at most one default instance is allowed",
            ));
        }

        for route in &self.routes {
            if !names.contains(route.instance.as_str()) {
                return Err(TableError::config(format!(
                    "route {} references unknown instance '{}'",
                    route.prefix, route.instance
                )));
            }
            route.parsed_prefix()?;
            route.parsed_source_rd()?;
            route.parsed_community()?;
        }

        Ok(())
    }
}
