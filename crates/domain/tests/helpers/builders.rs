#![allow(dead_code)]
use ferrous_netd_domain::{AddressKey, Interface};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

pub struct InterfaceBuilder {
    name: Arc<str>,
    address: IpAddr,
    port: u16,
    scope_id: u32,
    netmask: IpAddr,
    mtu: u32,
    dhcp_ok: bool,
}

impl InterfaceBuilder {
    pub fn new(name: &str, address: &str) -> Self {
        let address = IpAddr::from_str(address).unwrap();
        let netmask = if address.is_ipv4() {
            IpAddr::from_str("255.255.255.0").unwrap()
        } else {
            IpAddr::from_str("ffff:ffff:ffff:ffff::").unwrap()
        };
        Self {
            name: name.into(),
            address,
            port: 53,
            scope_id: 0,
            netmask,
            mtu: 1500,
            dhcp_ok: true,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scope_id(mut self, scope_id: u32) -> Self {
        self.scope_id = scope_id;
        self
    }

    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn no_dhcp(mut self) -> Self {
        self.dhcp_ok = false;
        self
    }

    pub fn build(self) -> Interface {
        let key = AddressKey::with_scope(self.address, self.port, self.scope_id);
        Interface::new(self.name, key, self.netmask)
            .with_mtu(self.mtu)
            .with_dhcp(self.dhcp_ok)
    }
}

pub fn key(s: &str) -> AddressKey {
    AddressKey::from_str(s).unwrap()
}
