#![allow(dead_code)]
use ferrous_netd_domain::{AddressKey, Interface, ServerDefaults, UpstreamServerSpec};
use std::net::{IpAddr, TcpListener};

pub fn loopback(name: &str, addr: &str) -> Interface {
    let ip: IpAddr = addr.parse().unwrap();
    Interface::new(name, AddressKey::new(ip, 0), "255.0.0.0".parse().unwrap()).with_mtu(65536)
}

pub fn server(line: &str) -> UpstreamServerSpec {
    UpstreamServerSpec::parse(line, &ServerDefaults::default())
        .unwrap()
        .remove(0)
}

pub fn servers(lines: &[&str]) -> Vec<UpstreamServerSpec> {
    lines.iter().map(|l| server(l)).collect()
}

/// A port that was free on `addr` a moment ago.
pub fn free_port(addr: &str) -> u16 {
    let listener = TcpListener::bind((addr, 0)).unwrap();
    listener.local_addr().unwrap().port()
}
