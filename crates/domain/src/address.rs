use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub const ALL: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    pub fn unspecified(self) -> IpAddr {
        match self {
            Self::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bind target: address, port and (for IPv6 link-local) the scope id.
///
/// Two keys compare equal when family, address and port match. The scope id
/// only takes part in the comparison for link-local IPv6 addresses, where the
/// kernel needs it to pick an interface; anywhere else it is noise.
#[derive(Debug, Clone, Copy)]
pub struct AddressKey {
    addr: IpAddr,
    port: u16,
    scope_id: u32,
}

impl AddressKey {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self {
            addr,
            port,
            scope_id: 0,
        }
    }

    pub fn with_scope(addr: IpAddr, port: u16, scope_id: u32) -> Self {
        let scope_id = if addr.is_ipv6() { scope_id } else { 0 };
        Self {
            addr,
            port,
            scope_id,
        }
    }

    pub fn unspecified(family: AddressFamily, port: u16) -> Self {
        Self::new(family.unspecified(), port)
    }

    pub fn family(&self) -> AddressFamily {
        match self.addr {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scope_id(&self) -> u32 {
        self.scope_id
    }

    pub fn with_port(&self, port: u16) -> Self {
        Self { port, ..*self }
    }

    pub fn is_unspecified(&self) -> bool {
        self.addr.is_unspecified()
    }

    pub fn is_link_local(&self) -> bool {
        match self.addr {
            IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
            IpAddr::V4(_) => false,
        }
    }

    fn effective_scope(&self) -> u32 {
        if self.is_link_local() {
            self.scope_id
        } else {
            0
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        match self.addr {
            IpAddr::V4(v4) => SocketAddr::new(IpAddr::V4(v4), self.port),
            IpAddr::V6(v6) => {
                SocketAddr::V6(SocketAddrV6::new(v6, self.port, 0, self.effective_scope()))
            }
        }
    }
}

impl PartialEq for AddressKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
            && self.port == other.port
            && self.effective_scope() == other.effective_scope()
    }
}

impl Eq for AddressKey {}

impl Hash for AddressKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
        self.port.hash(state);
        self.effective_scope().hash(state);
    }
}

impl From<SocketAddr> for AddressKey {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self::new(IpAddr::V4(*v4.ip()), v4.port()),
            SocketAddr::V6(v6) => Self::with_scope(IpAddr::V6(*v6.ip()), v6.port(), v6.scope_id()),
        }
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(v4) => write!(f, "{}#{}", v4, self.port),
            IpAddr::V6(v6) if self.is_link_local() && self.scope_id != 0 => {
                write!(f, "{}%{}#{}", v6, self.scope_id, self.port)
            }
            IpAddr::V6(v6) => write!(f, "{}#{}", v6, self.port),
        }
    }
}

/// Parses `addr`, `addr#port` or `addr%scope#port`. A missing port is 0.
impl FromStr for AddressKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = match s.rsplit_once('#') {
            Some((h, p)) => (
                h,
                p.parse::<u16>()
                    .map_err(|_| format!("Invalid port in '{}'", s))?,
            ),
            None => (s, 0),
        };

        let (host, scope_id) = match host.split_once('%') {
            Some((h, scope)) => (
                h,
                scope
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid scope id in '{}'", s))?,
            ),
            None => (host, 0),
        };

        let addr = host
            .parse::<IpAddr>()
            .map_err(|_| format!("Invalid address '{}'", host))?;

        Ok(Self::with_scope(addr, port, scope_id))
    }
}

/// Options applied to a socket between creation and bind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketOptions {
    pub reuse_address: bool,
    pub mark: Option<u32>,
    pub bound_device: Option<String>,
    pub ipv6_only: bool,
    pub packet_info: bool,
}

impl SocketOptions {
    /// Options for a listener bound to one specific address.
    pub fn bound_listener(family: AddressFamily) -> Self {
        Self {
            reuse_address: true,
            ipv6_only: family == AddressFamily::Ipv6,
            ..Self::default()
        }
    }

    /// Options for a wildcard listener. One socket serves every local address,
    /// so the destination address has to come back as ancillary data.
    pub fn wildcard_listener(family: AddressFamily) -> Self {
        Self {
            reuse_address: true,
            ipv6_only: family == AddressFamily::Ipv6,
            packet_info: true,
            ..Self::default()
        }
    }

    pub fn upstream(interface: &str, mark: Option<u32>) -> Self {
        Self {
            mark,
            bound_device: (!interface.is_empty()).then(|| interface.to_string()),
            ..Self::default()
        }
    }
}
