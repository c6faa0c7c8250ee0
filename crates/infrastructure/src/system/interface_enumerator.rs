use ferrous_netd_application::ports::InterfaceEnumerator;
use ferrous_netd_domain::{AddressKey, Interface, NetworkError};
use if_addrs::IfAddr;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::debug;

/// Host interface enumeration via getifaddrs, with MTUs read from sysfs.
pub struct SystemInterfaceEnumerator {
    sysfs_root: PathBuf,
}

impl SystemInterfaceEnumerator {
    pub fn new() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys/class/net"),
        }
    }

    pub fn with_sysfs_root(path: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: path.into(),
        }
    }

    /// 0 when the MTU cannot be read.
    pub fn mtu(&self, name: &str) -> u32 {
        std::fs::read_to_string(self.sysfs_root.join(name).join("mtu"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn convert(&self, intf: if_addrs::Interface) -> Interface {
        let (ip, netmask) = match &intf.addr {
            IfAddr::V4(v4) => (IpAddr::V4(v4.ip), IpAddr::V4(v4.netmask)),
            IfAddr::V6(v6) => (IpAddr::V6(v6.ip), IpAddr::V6(v6.netmask)),
        };
        let index = intf.index.unwrap_or(0);
        let address = AddressKey::with_scope(ip, 0, index);

        let mut interface = Interface::new(intf.name.as_str(), address, netmask)
            .with_mtu(self.mtu(&intf.name));
        if let Some(index) = intf.index {
            interface = interface.with_index(index);
        }
        interface
    }
}

impl Default for SystemInterfaceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceEnumerator for SystemInterfaceEnumerator {
    fn enumerate(&self) -> Result<Vec<Interface>, NetworkError> {
        let interfaces: Vec<Interface> = if_addrs::get_if_addrs()
            .map_err(|e| NetworkError::Enumeration(e.to_string()))?
            .into_iter()
            .map(|intf| self.convert(intf))
            .collect();

        debug!(count = interfaces.len(), "Enumerated interface addresses");
        Ok(interfaces)
    }
}
