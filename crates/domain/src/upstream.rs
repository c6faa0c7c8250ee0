use crate::address::{AddressFamily, AddressKey};
use crate::errors::NetworkError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_DNS_PORT: u16 = 53;

/// Identity of an upstream server entry for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server-{}", self.0)
    }
}

/// Which queries a server entry is used for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DomainRouting {
    /// Every query not claimed by a more specific entry.
    Default,
    /// Queries for names under this domain.
    HasDomain(Arc<str>),
    /// Queries for unqualified names (no dots).
    ForNoDots,
    /// Names under this domain are answered locally and never forwarded.
    NoAddress(Arc<str>),
    /// Unqualified names are answered locally and never forwarded.
    NoDotsLocal,
    /// Names under this domain resolve to the entry's own address.
    LiteralAddress(Arc<str>),
}

impl DomainRouting {
    /// Entries that never leave the host need no upstream socket.
    pub fn forwards(&self) -> bool {
        !matches!(
            self,
            Self::NoAddress(_) | Self::NoDotsLocal | Self::LiteralAddress(_)
        )
    }

    pub fn domain(&self) -> Option<&str> {
        match self {
            Self::HasDomain(d) | Self::NoAddress(d) | Self::LiteralAddress(d) => Some(d),
            Self::Default | Self::ForNoDots | Self::NoDotsLocal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerOrigin {
    /// Came from configuration; survives reloads.
    Static,
    /// Came from a reload source; replaced wholesale on each reload.
    Dynamic,
}

/// Defaults applied while parsing server lines.
#[derive(Debug, Clone, Copy)]
pub struct ServerDefaults {
    pub port: u16,
    pub query_port: u16,
    pub routing_mark: Option<u32>,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            port: DEFAULT_DNS_PORT,
            query_port: 0,
            routing_mark: None,
        }
    }
}

/// Everything needed to build an upstream server entry, minus its socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamServerSpec {
    pub address: AddressKey,
    pub source: AddressKey,
    pub interface: Arc<str>,
    pub routing_mark: Option<u32>,
    pub routing: DomainRouting,
    pub origin: ServerOrigin,
}

impl UpstreamServerSpec {
    pub fn new(address: AddressKey, defaults: &ServerDefaults) -> Self {
        Self {
            source: AddressKey::unspecified(address.family(), defaults.query_port),
            address,
            interface: Arc::from(""),
            routing_mark: defaults.routing_mark,
            routing: DomainRouting::Default,
            origin: ServerOrigin::Static,
        }
    }

    pub fn dynamic(mut self) -> Self {
        self.origin = ServerOrigin::Dynamic;
        self
    }

    pub fn is_static(&self) -> bool {
        self.origin == ServerOrigin::Static
    }

    /// Builds the entry for `/domain/ip`: names under `domain` answer with `ip`.
    pub fn literal(domain: &str, addr: IpAddr) -> Self {
        let address = AddressKey::new(addr, 0);
        Self {
            source: AddressKey::unspecified(address.family(), 0),
            address,
            interface: Arc::from(""),
            routing_mark: None,
            routing: DomainRouting::LiteralAddress(Arc::from(normalize_domain(domain))),
            origin: ServerOrigin::Static,
        }
    }

    /// Parses one server line:
    ///
    /// `[/dom1/dom2/]addr[#port][@source[#port]][@interface]`
    ///
    /// An empty domain (`//`) selects unqualified names, and a domain list with
    /// no address marks those domains as local-only. One spec is produced per
    /// listed domain.
    pub fn parse(line: &str, defaults: &ServerDefaults) -> Result<Vec<Self>, NetworkError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(NetworkError::InvalidServer(line.to_string()));
        }

        let (domains, rest) = split_domains(line)?;

        if rest.is_empty() {
            if domains.is_empty() {
                return Err(NetworkError::InvalidServer(line.to_string()));
            }
            return Ok(domains
                .into_iter()
                .map(|domain| local_only(&domain))
                .collect());
        }

        let mut parts = rest.split('@');
        let target = parts.next().unwrap_or_default();
        let source = parts.next();
        let interface = parts.next();
        if parts.next().is_some() {
            return Err(NetworkError::InvalidServer(line.to_string()));
        }

        let address = parse_endpoint(target, defaults.port)
            .map_err(|_| NetworkError::InvalidServer(line.to_string()))?;

        let mut base = Self::new(address, defaults);

        match (source, interface) {
            (Some(src), iface) => {
                match parse_endpoint(src, defaults.query_port) {
                    Ok(src_key) => {
                        if src_key.family() != address.family() {
                            return Err(NetworkError::InvalidServer(line.to_string()));
                        }
                        base.source = src_key;
                        if let Some(iface) = iface {
                            base.interface = Arc::from(iface);
                        }
                    }
                    // `addr@eth0`: a lone non-address suffix names the interface.
                    Err(_) if iface.is_none() && !src.is_empty() => {
                        base.interface = Arc::from(src);
                    }
                    Err(_) => return Err(NetworkError::InvalidServer(line.to_string())),
                }
            }
            (None, _) => {}
        }

        if domains.is_empty() {
            return Ok(vec![base]);
        }

        Ok(domains
            .into_iter()
            .map(|domain| {
                let mut spec = base.clone();
                spec.routing = if domain.is_empty() {
                    DomainRouting::ForNoDots
                } else {
                    DomainRouting::HasDomain(Arc::from(domain.as_str()))
                };
                spec
            })
            .collect())
    }
}

impl FromStr for UpstreamServerSpec {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut specs = Self::parse(s, &ServerDefaults::default())?;
        if specs.len() != 1 {
            return Err(NetworkError::InvalidServer(s.to_string()));
        }
        Ok(specs.remove(0))
    }
}

impl fmt::Display for UpstreamServerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.routing {
            DomainRouting::Default => write!(f, "{}", self.address)?,
            DomainRouting::HasDomain(d) => write!(f, "/{}/{}", d, self.address)?,
            DomainRouting::ForNoDots => write!(f, "//{}", self.address)?,
            DomainRouting::NoAddress(d) => return write!(f, "/{}/", d),
            DomainRouting::NoDotsLocal => return f.write_str("//"),
            DomainRouting::LiteralAddress(d) => return write!(f, "/{}/{}", d, self.address.addr()),
        }
        if !self.interface.is_empty() {
            write!(f, "@{}", self.interface)?;
        }
        Ok(())
    }
}

fn local_only(domain: &str) -> UpstreamServerSpec {
    let address = AddressKey::unspecified(AddressFamily::Ipv4, 0);
    UpstreamServerSpec {
        address,
        source: address,
        interface: Arc::from(""),
        routing_mark: None,
        routing: if domain.is_empty() {
            DomainRouting::NoDotsLocal
        } else {
            DomainRouting::NoAddress(Arc::from(domain))
        },
        origin: ServerOrigin::Static,
    }
}

fn split_domains(line: &str) -> Result<(Vec<String>, &str), NetworkError> {
    let Some(body) = line.strip_prefix('/') else {
        return Ok((Vec::new(), line));
    };

    let Some(end) = body.rfind('/') else {
        return Err(NetworkError::InvalidServer(line.to_string()));
    };

    let domains = body[..end].split('/').map(normalize_domain).collect();
    Ok((domains, &body[end + 1..]))
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// `addr`, `addr#port`, `addr%scope#port`; bracketed IPv6 with `:port` is
/// accepted too since that is how resolvers usually get written down.
fn parse_endpoint(s: &str, default_port: u16) -> Result<AddressKey, String> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| format!("Unterminated bracket in '{}'", s))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p.parse().map_err(|_| format!("Invalid port in '{}'", s))?,
            None if tail.is_empty() => default_port,
            None => return Err(format!("Unexpected suffix in '{}'", s)),
        };
        let key: AddressKey = host.parse()?;
        return Ok(key.with_port(port));
    }

    let key: AddressKey = s.parse()?;
    if s.contains('#') {
        Ok(key)
    } else {
        Ok(key.with_port(default_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_default_port() {
        let key = parse_endpoint("9.9.9.9", 53).unwrap();
        assert_eq!(key.port(), 53);
    }

    #[test]
    fn test_parse_endpoint_bracketed_ipv6() {
        let key = parse_endpoint("[2001:db8::1]:5353", 53).unwrap();
        assert_eq!(key.port(), 5353);
        assert!(key.addr().is_ipv6());
    }

    #[test]
    fn test_split_domains_without_prefix() {
        let (domains, rest) = split_domains("1.1.1.1").unwrap();
        assert!(domains.is_empty());
        assert_eq!(rest, "1.1.1.1");
    }

    #[test]
    fn test_split_domains_unterminated() {
        assert!(split_domains("/lan").is_err());
    }
}
