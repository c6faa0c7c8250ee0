use crate::ports::InterfaceEnumerator;
use ferrous_netd_domain::{Interface, InterfaceNameFilter, InterfaceScope, NetworkError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one enumeration pass run through the interface filter.
#[derive(Debug, Default)]
pub struct DiscoveredInterfaces {
    /// Interfaces we should listen on, carrying the service port.
    pub accepted: Vec<Interface>,
    /// Every local address seen, in scope or not. Used for loop detection.
    pub local: Vec<Interface>,
    /// (alias, canonical) pairs of bridged interfaces.
    pub aliases: Vec<(String, String)>,
    pub rejected: usize,
}

/// Use case: enumerate host interfaces and decide which ones we serve
pub struct DiscoverInterfacesUseCase {
    enumerator: Arc<dyn InterfaceEnumerator>,
    no_dhcp: Vec<String>,
}

impl DiscoverInterfacesUseCase {
    pub fn new(enumerator: Arc<dyn InterfaceEnumerator>) -> Self {
        Self {
            enumerator,
            no_dhcp: Vec::new(),
        }
    }

    pub fn with_no_dhcp(mut self, names: Vec<String>) -> Self {
        self.no_dhcp = names;
        self
    }

    pub fn execute(
        &self,
        filter: &mut InterfaceNameFilter,
        service_port: u16,
    ) -> Result<DiscoveredInterfaces, NetworkError> {
        debug!("Enumerating network interfaces");

        let interfaces = self.enumerator.enumerate()?;
        let mut discovered = DiscoveredInterfaces::default();

        for interface in interfaces {
            let dhcp_ok = self.dhcp_allowed(&interface.name);
            let interface = interface.with_port(service_port).with_dhcp(dhcp_ok);

            match filter.classify(&interface.name, interface.address.addr()) {
                InterfaceScope::InScope => {
                    debug!(interface = %interface, "Interface in scope");
                    discovered.accepted.push(interface.clone());
                }
                InterfaceScope::AliasOf(canonical) => {
                    debug!(
                        interface = %interface.name,
                        canonical = %canonical,
                        "Interface bridged into another"
                    );
                    discovered
                        .aliases
                        .push((interface.name.to_string(), canonical));
                }
                InterfaceScope::OutOfScope => {
                    discovered.rejected += 1;
                }
            }

            discovered.local.push(interface);
        }

        info!(
            accepted = discovered.accepted.len(),
            aliased = discovered.aliases.len(),
            rejected = discovered.rejected,
            "Interfaces discovered"
        );

        Ok(discovered)
    }

    /// Logs filter entries that never matched anything; usually a typo.
    pub fn warn_unused(filter: &InterfaceNameFilter) {
        for name in filter.unused_names() {
            warn!(interface = name, "Configured interface not found");
        }
        for addr in filter.unused_addresses() {
            warn!(address = %addr, "Configured listen address not found on any interface");
        }
        for alias in filter.unused_aliases() {
            warn!(interface = alias, "Bridged interface not found");
        }
    }

    fn dhcp_allowed(&self, name: &str) -> bool {
        !self.no_dhcp.iter().any(|n| n == name)
    }
}
