use super::socket::local_bind;
use dashmap::DashMap;
use ferrous_netd_domain::{AddressKey, NetworkError};
use socket2::Socket;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    source: AddressKey,
    interface: Arc<str>,
    mark: Option<u32>,
}

/// Outbound UDP socket shared by every upstream server with the same source
/// address, source interface and routing mark.
pub struct UpstreamSourceSocket {
    socket: Socket,
    source: AddressKey,
    interface: Arc<str>,
    mark: Option<u32>,
}

impl UpstreamSourceSocket {
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn source(&self) -> AddressKey {
        self.source
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn mark(&self) -> Option<u32> {
        self.mark
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok().and_then(|a| a.as_socket())
    }
}

impl std::fmt::Debug for UpstreamSourceSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSourceSocket")
            .field("source", &self.source)
            .field("interface", &self.interface)
            .field("mark", &self.mark)
            .finish()
    }
}

/// Cache of upstream source sockets.
///
/// Entries live as long as the pool. Lookups and inserts go through the map's
/// shard locks only; socket creation happens outside of them.
pub struct UpstreamSocketPool {
    sockets: DashMap<PoolKey, Arc<UpstreamSourceSocket>>,

    /// With a fixed query port every server needs an explicitly bound socket.
    query_port_configured: bool,

    total_created: AtomicU64,
    total_reused: AtomicU64,
}

impl UpstreamSocketPool {
    pub fn new(query_port_configured: bool) -> Self {
        info!(query_port_configured, "Initializing upstream socket pool");

        Self {
            sockets: DashMap::new(),
            query_port_configured,
            total_created: AtomicU64::new(0),
            total_reused: AtomicU64::new(0),
        }
    }

    /// Returns the shared socket for this source tuple, creating it on a miss.
    ///
    /// `Ok(None)` means the server can use a fresh ephemeral socket per query:
    /// nothing about its source needs a dedicated bind.
    pub fn get_or_create(
        &self,
        source: AddressKey,
        interface: &str,
        mark: Option<u32>,
    ) -> Result<Option<Arc<UpstreamSourceSocket>>, NetworkError> {
        if !self.query_port_configured
            && interface.is_empty()
            && mark.is_none()
            && source.is_unspecified()
            && source.port() == 0
        {
            return Ok(None);
        }

        let key = PoolKey {
            source,
            interface: Arc::from(interface),
            mark,
        };

        if let Some(existing) = self.sockets.get(&key) {
            self.total_reused.fetch_add(1, Ordering::Relaxed);
            debug!(source = %source, interface, "Reusing upstream socket");
            return Ok(Some(Arc::clone(existing.value())));
        }

        let socket = local_bind(&source, interface, mark, false).map_err(|e| {
            NetworkError::PoolAllocation {
                source_address: source.to_string(),
                reason: e.to_string(),
            }
        })?;

        let created = Arc::new(UpstreamSourceSocket {
            socket,
            source,
            interface: Arc::clone(&key.interface),
            mark,
        });

        let entry = self.sockets.entry(key).or_insert_with(|| {
            self.total_created.fetch_add(1, Ordering::Relaxed);
            debug!(source = %source, interface, "Created upstream socket");
            Arc::clone(&created)
        });

        Ok(Some(Arc::clone(entry.value())))
    }

    /// Socket for a TCP connection to an upstream: same source address,
    /// device and mark, but never the fixed query port. Not pooled.
    pub fn bind_tcp_source(
        source: &AddressKey,
        interface: &str,
        mark: Option<u32>,
    ) -> Result<Socket, NetworkError> {
        local_bind(source, interface, mark, true).map_err(|e| NetworkError::PoolAllocation {
            source_address: source.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_created: self.total_created.load(Ordering::Relaxed),
            total_reused: self.total_reused.load(Ordering::Relaxed),
            entries: self.sockets.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_created: u64,
    pub total_reused: u64,
    pub entries: usize,
}

impl PoolStats {
    pub fn reuse_rate(&self) -> f64 {
        if self.total_created == 0 {
            0.0
        } else {
            self.total_reused as f64 / self.total_created as f64
        }
    }
}
