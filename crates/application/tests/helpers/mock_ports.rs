#![allow(dead_code)]

use ferrous_netd_application::ports::{InterfaceEnumerator, UpstreamSource};
use ferrous_netd_domain::{AddressKey, Interface, NetworkError};
use std::net::IpAddr;
use std::sync::Mutex;

pub struct MockInterfaceEnumerator {
    interfaces: Mutex<Vec<Interface>>,
    error: Mutex<Option<NetworkError>>,
}

impl MockInterfaceEnumerator {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        Self {
            interfaces: Mutex::new(interfaces),
            error: Mutex::new(None),
        }
    }

    pub fn set_interfaces(&self, interfaces: Vec<Interface>) {
        *self.interfaces.lock().unwrap() = interfaces;
    }

    pub fn set_error(&self, error: NetworkError) {
        *self.error.lock().unwrap() = Some(error);
    }
}

impl InterfaceEnumerator for MockInterfaceEnumerator {
    fn enumerate(&self) -> Result<Vec<Interface>, NetworkError> {
        if let Some(e) = self.error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.interfaces.lock().unwrap().clone())
    }
}

pub struct MockUpstreamSource {
    lines: Mutex<Result<Vec<String>, NetworkError>>,
}

impl MockUpstreamSource {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: Mutex::new(Ok(lines.iter().map(|l| l.to_string()).collect())),
        }
    }

    pub fn failing() -> Self {
        Self {
            lines: Mutex::new(Err(NetworkError::UpstreamSource {
                path: "mock".to_string(),
                reason: "unavailable".to_string(),
            })),
        }
    }
}

impl UpstreamSource for MockUpstreamSource {
    fn read_servers(&self) -> Result<Vec<String>, NetworkError> {
        self.lines.lock().unwrap().clone()
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

pub fn make_interface(name: &str, addr: &str) -> Interface {
    let addr: IpAddr = addr.parse().unwrap();
    let netmask: IpAddr = if addr.is_ipv4() {
        "255.255.255.0".parse().unwrap()
    } else {
        "ffff:ffff:ffff:ffff::".parse().unwrap()
    };
    Interface::new(name, AddressKey::new(addr, 0), netmask).with_mtu(1500)
}
