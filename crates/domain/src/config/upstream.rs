use crate::errors::NetworkError;
use crate::upstream::{ServerDefaults, UpstreamServerSpec};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Statically configured servers, in server-line syntax.
    #[serde(default)]
    pub servers: Vec<String>,

    /// `/domain/ip` entries answered locally.
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Re-read on reload for the dynamic part of the server list.
    #[serde(default = "default_resolv_file")]
    pub resolv_file: String,

    /// Ignore `resolv_file` entirely.
    #[serde(default)]
    pub no_resolv: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: vec![],
            addresses: vec![],
            resolv_file: default_resolv_file(),
            no_resolv: false,
        }
    }
}

impl UpstreamConfig {
    pub fn static_servers(
        &self,
        defaults: &ServerDefaults,
    ) -> Result<Vec<UpstreamServerSpec>, NetworkError> {
        let mut specs = Vec::new();
        for line in &self.servers {
            specs.extend(UpstreamServerSpec::parse(line, defaults)?);
        }
        for entry in &self.addresses {
            specs.extend(parse_address_entry(entry)?);
        }
        Ok(specs)
    }
}

/// `/dom1/dom2/ip`: every listed domain resolves to `ip`.
fn parse_address_entry(entry: &str) -> Result<Vec<UpstreamServerSpec>, NetworkError> {
    let invalid = || NetworkError::InvalidServer(entry.to_string());

    let body = entry.trim().strip_prefix('/').ok_or_else(invalid)?;
    let (domains, addr) = body.rsplit_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;

    Ok(domains
        .split('/')
        .filter(|d| !d.is_empty())
        .map(|domain| UpstreamServerSpec::literal(domain, addr))
        .collect())
}

fn default_resolv_file() -> String {
    "/etc/resolv.conf".to_string()
}
