use super::socket::{open_socket, SocketKind};
use arc_swap::ArcSwap;
use ferrous_netd_domain::{
    AddressFamily, AddressKey, Interface, InterfaceId, NetworkError, SocketOptions,
};
use socket2::Socket;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const WILDCARD: u64 = u64::MAX;

/// A server-facing UDP (+TCP) socket pair.
///
/// Shared with query-path readers through [`ListenerReader`] snapshots. The
/// sockets themselves are released when the last `Arc` goes away; `close`
/// only flags the listener so readers stop handing out its sockets.
pub struct Listener {
    address: AddressKey,
    udp: Option<Socket>,
    tcp: Option<Socket>,
    interface: AtomicU64,
    mtu: AtomicU32,
    dhcp_allowed: AtomicBool,
    closed: AtomicBool,
}

impl Listener {
    fn new(address: AddressKey, udp: Socket, tcp: Option<Socket>) -> Self {
        Self {
            address,
            udp: Some(udp),
            tcp,
            interface: AtomicU64::new(WILDCARD),
            mtu: AtomicU32::new(0),
            dhcp_allowed: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    fn bound(
        address: AddressKey,
        udp: Socket,
        tcp: Option<Socket>,
        id: InterfaceId,
        iface: &Interface,
    ) -> Self {
        let listener = Self::new(address, udp, tcp);
        listener.retarget(id, iface);
        listener
    }

    pub fn address(&self) -> AddressKey {
        self.address
    }

    pub fn udp(&self) -> Option<&Socket> {
        if self.is_closed() {
            return None;
        }
        self.udp.as_ref()
    }

    pub fn tcp(&self) -> Option<&Socket> {
        if self.is_closed() {
            return None;
        }
        self.tcp.as_ref()
    }

    /// `None` for wildcard listeners.
    pub fn interface(&self) -> Option<InterfaceId> {
        match self.interface.load(Ordering::Acquire) {
            WILDCARD => None,
            bits => Some(InterfaceId::from_bits(bits)),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.interface().is_none()
    }

    pub fn family(&self) -> AddressFamily {
        self.address.family()
    }

    pub fn mtu(&self) -> u32 {
        self.mtu.load(Ordering::Relaxed)
    }

    pub fn dhcp_allowed(&self) -> bool {
        self.dhcp_allowed.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns true only for the call that actually closed the listener.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    fn retarget(&self, id: InterfaceId, iface: &Interface) {
        self.mtu.store(iface.mtu, Ordering::Relaxed);
        self.dhcp_allowed.store(iface.dhcp_ok, Ordering::Relaxed);
        self.interface.store(id.to_bits(), Ordering::Release);
    }

    fn kind(&self) -> &'static str {
        if self.is_wildcard() {
            "wildcard"
        } else {
            "bound"
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("address", &self.address)
            .field("interface", &self.interface())
            .field("tcp", &self.tcp.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Bind attempts for an IPv6 address still undergoing DAD.
    pub dad_retry_attempts: u32,
    pub dad_retry_interval: Duration,
    pub tcp_backlog: i32,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            dad_retry_attempts: 20,
            dad_retry_interval: Duration::from_secs(1),
            tcp_backlog: 32,
        }
    }
}

/// Lock-free view of the listeners for the query path.
#[derive(Clone)]
pub struct ListenerReader {
    published: Arc<ArcSwap<Vec<Arc<Listener>>>>,
}

impl ListenerReader {
    pub fn snapshot(&self) -> Arc<Vec<Arc<Listener>>> {
        self.published.load_full()
    }
}

/// Owns every server-facing listener.
///
/// Mutated only by the control task; each mutation republishes the list for
/// readers.
pub struct ListenerSet {
    listeners: Vec<Arc<Listener>>,
    published: Arc<ArcSwap<Vec<Arc<Listener>>>>,
    options: ListenerOptions,
}

impl ListenerSet {
    pub fn new(options: ListenerOptions) -> Self {
        Self {
            listeners: Vec::new(),
            published: Arc::new(ArcSwap::from_pointee(Vec::new())),
            options,
        }
    }

    pub fn reader(&self) -> ListenerReader {
        ListenerReader {
            published: Arc::clone(&self.published),
        }
    }

    /// Opens a listener on `iface`'s address. Returns `Ok(false)` if one is
    /// already open on that address and port.
    pub fn add_bound(
        &mut self,
        id: InterfaceId,
        iface: &Interface,
        service_port: u16,
    ) -> Result<bool, NetworkError> {
        let key = iface.address.with_port(service_port);
        if self.find(&key).is_some() {
            debug!(address = %key, "Listener already open");
            return Ok(false);
        }

        let options = SocketOptions::bound_listener(key.family());
        let udp = self.open_udp_with_dad_retry(&key, &options)?;
        let tcp = self.open_tcp(&key, service_port, &options)?;

        let listener = Listener::bound(key, udp, tcp, id, iface);
        info!(
            address = %key,
            interface = %iface.name,
            reason = "interface in scope",
            "Created bound listener"
        );

        self.listeners.push(Arc::new(listener));
        self.publish();
        Ok(true)
    }

    /// Opens one wildcard listener per address family the kernel supports.
    /// Returns how many were created.
    pub fn add_wildcard(&mut self, service_port: u16) -> Result<usize, NetworkError> {
        let mut created = 0;
        let mut failure = None;

        for family in AddressFamily::ALL {
            if self.wildcard(family).is_some() {
                continue;
            }

            let key = AddressKey::unspecified(family, service_port);
            let options = SocketOptions::wildcard_listener(family);

            let udp = match open_socket(&key, SocketKind::Udp, &options) {
                Ok(socket) => socket,
                Err(e) if e.is_family_unsupported() => {
                    warn!(family = %family, "Address family not supported, skipping");
                    continue;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            let tcp = match self.open_tcp(&key, service_port, &options) {
                Ok(tcp) => tcp,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            info!(address = %key, reason = "wildcard mode", "Created wildcard listener");
            self.listeners.push(Arc::new(Listener::new(key, udp, tcp)));
            created += 1;
        }

        // Readers must see whatever was opened, even on failure.
        if created > 0 {
            self.publish();
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(created),
        }
    }

    /// Closes and drops every listener matching `predicate`.
    pub fn remove<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Listener) -> bool,
    {
        let before = self.listeners.len();

        self.listeners.retain(|listener| {
            if !predicate(listener.as_ref()) {
                return true;
            }
            if listener.close() {
                info!(
                    address = %listener.address(),
                    reason = listener.kind(),
                    "Closing listener"
                );
            }
            false
        });

        let removed = before - self.listeners.len();
        if removed > 0 {
            self.publish();
        }
        removed
    }

    pub fn remove_wildcards(&mut self) -> usize {
        self.remove(Listener::is_wildcard)
    }

    pub fn remove_bound_to(&mut self, id: InterfaceId) -> usize {
        self.remove(|l| l.interface() == Some(id))
    }

    /// Points every listener that referenced `old` at `new` without touching
    /// its sockets.
    pub fn retarget(&mut self, old: InterfaceId, new: InterfaceId, iface: &Interface) -> usize {
        let mut count = 0;
        for listener in &self.listeners {
            if listener.interface() == Some(old) {
                listener.retarget(new, iface);
                count += 1;
            }
        }
        count
    }

    pub fn find(&self, key: &AddressKey) -> Option<&Arc<Listener>> {
        self.listeners.iter().find(|l| l.address() == *key)
    }

    pub fn wildcard(&self, family: AddressFamily) -> Option<&Arc<Listener>> {
        self.listeners
            .iter()
            .find(|l| l.is_wildcard() && l.family() == family)
    }

    pub fn has_wildcard(&self) -> bool {
        self.listeners.iter().any(|l| l.is_wildcard())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Listener>> {
        self.listeners.iter()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn close_all(&mut self) -> usize {
        self.remove(|_| true)
    }

    fn open_udp_with_dad_retry(
        &self,
        key: &AddressKey,
        options: &SocketOptions,
    ) -> Result<Socket, NetworkError> {
        let attempts = self.options.dad_retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            match open_socket(key, SocketKind::Udp, options) {
                Ok(socket) => return Ok(socket),
                Err(e)
                    if key.family() == AddressFamily::Ipv6
                        && e.is_address_not_available()
                        && attempt < attempts =>
                {
                    debug!(
                        address = %key,
                        attempt,
                        "Address not yet available, waiting for DAD"
                    );
                    attempt += 1;
                    std::thread::sleep(self.options.dad_retry_interval);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn open_tcp(
        &self,
        key: &AddressKey,
        service_port: u16,
        options: &SocketOptions,
    ) -> Result<Option<Socket>, NetworkError> {
        if service_port == 0 {
            return Ok(None);
        }

        let tcp = open_socket(key, SocketKind::Tcp, options)?;
        tcp.listen(self.options.tcp_backlog)
            .map_err(|e| NetworkError::Io(format!("listen on {}: {}", key, e)))?;
        Ok(Some(tcp))
    }

    fn publish(&self) {
        self.published.store(Arc::new(self.listeners.clone()));
    }
}

impl Drop for ListenerSet {
    fn drop(&mut self) {
        self.close_all();
    }
}
