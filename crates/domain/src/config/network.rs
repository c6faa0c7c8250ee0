use crate::interface_filter::InterfaceNameFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use super::errors::ConfigError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Port served to clients. 0 disables TCP listeners.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Only listen on these interfaces (trailing `*` matches a prefix).
    #[serde(default)]
    pub interfaces: Vec<String>,

    /// Only listen on interfaces carrying one of these addresses.
    #[serde(default)]
    pub listen_addresses: Vec<IpAddr>,

    /// Never listen on these interfaces, whatever else matches.
    #[serde(default)]
    pub except_interfaces: Vec<String>,

    /// Interfaces that serve DNS but not DHCP.
    #[serde(default)]
    pub no_dhcp_interfaces: Vec<String>,

    /// Canonical bridge name -> interfaces bridged into it.
    #[serde(default)]
    pub bridge_interfaces: BTreeMap<String, Vec<String>>,

    /// Bind one listener per interface address even without restrictions.
    #[serde(default)]
    pub bind_interfaces: bool,

    /// Treat an upstream server whose socket cannot be bound as fatal.
    #[serde(default)]
    pub require_interface_binding: bool,

    #[serde(default)]
    pub routing_mark: Option<u32>,

    /// Fixed source port for upstream queries. 0 lets the kernel pick.
    #[serde(default)]
    pub query_port: u16,

    #[serde(default = "default_dad_retry_attempts")]
    pub dad_retry_attempts: u32,

    #[serde(default = "default_dad_retry_interval_ms")]
    pub dad_retry_interval_ms: u64,

    #[serde(default = "default_tcp_backlog")]
    pub tcp_backlog: i32,

    /// How often interfaces are re-enumerated. 0 disables rescans.
    #[serde(default = "default_rescan_interval_secs")]
    pub rescan_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            interfaces: vec![],
            listen_addresses: vec![],
            except_interfaces: vec![],
            no_dhcp_interfaces: vec![],
            bridge_interfaces: BTreeMap::new(),
            bind_interfaces: false,
            require_interface_binding: false,
            routing_mark: None,
            query_port: 0,
            dad_retry_attempts: default_dad_retry_attempts(),
            dad_retry_interval_ms: default_dad_retry_interval_ms(),
            tcp_backlog: default_tcp_backlog(),
            rescan_interval_secs: default_rescan_interval_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn interface_filter(&self) -> InterfaceNameFilter {
        Self::build_filter(self, &self.interfaces)
    }

    /// Same exclusions and bridges, but with a new list of allowed names.
    pub fn interface_filter_for(&self, names: &[String]) -> InterfaceNameFilter {
        Self::build_filter(self, names)
    }

    fn build_filter(&self, names: &[String]) -> InterfaceNameFilter {
        let mut filter = InterfaceNameFilter::new();
        for name in names {
            filter = filter.allow_name(name.as_str());
        }
        for addr in &self.listen_addresses {
            filter = filter.allow_address(*addr);
        }
        for name in &self.except_interfaces {
            filter = filter.exclude_name(name.as_str());
        }
        for (canonical, aliases) in &self.bridge_interfaces {
            for alias in aliases {
                filter = filter.bridge_alias(alias.as_str(), canonical.as_str());
            }
        }
        filter
    }

    /// Wildcard sockets are used unless the operator asked for per-address
    /// binding or restricted the interfaces.
    pub fn wants_wildcard(&self) -> bool {
        !self.bind_interfaces && self.interfaces.is_empty() && self.listen_addresses.is_empty()
    }

    pub fn dad_retry_interval(&self) -> Duration {
        Duration::from_millis(self.dad_retry_interval_ms)
    }

    pub fn rescan_interval(&self) -> Option<Duration> {
        (self.rescan_interval_secs > 0).then(|| Duration::from_secs(self.rescan_interval_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tcp_backlog <= 0 {
            return Err(ConfigError::Validation(
                "tcp_backlog must be positive".to_string(),
            ));
        }

        for name in self
            .interfaces
            .iter()
            .chain(&self.except_interfaces)
            .chain(self.bridge_interfaces.keys())
        {
            if name.is_empty() || name.len() > 15 {
                return Err(ConfigError::Validation(format!(
                    "Invalid interface name '{}'",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn default_port() -> u16 {
    53
}

fn default_dad_retry_attempts() -> u32 {
    20
}

fn default_dad_retry_interval_ms() -> u64 {
    1000
}

fn default_tcp_backlog() -> i32 {
    32
}

fn default_rescan_interval_secs() -> u64 {
    5
}
