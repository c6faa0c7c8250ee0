use super::upstream_pool::{UpstreamSocketPool, UpstreamSourceSocket};
use arc_swap::{ArcSwap, ArcSwapOption};
use ferrous_netd_application::ports::ForwardingStateTracker;
use ferrous_netd_domain::{
    AddressKey, NetworkError, ServerId, ServerOrigin, UpstreamServerSpec,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct UpstreamServer {
    id: ServerId,
    spec: UpstreamServerSpec,
    socket: ArcSwapOption<UpstreamSourceSocket>,
    queries: AtomicU64,
    failed_queries: AtomicU64,
}

impl UpstreamServer {
    fn new(id: ServerId, spec: UpstreamServerSpec) -> Self {
        Self {
            id,
            spec,
            socket: ArcSwapOption::empty(),
            queries: AtomicU64::new(0),
            failed_queries: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn spec(&self) -> &UpstreamServerSpec {
        &self.spec
    }

    pub fn address(&self) -> AddressKey {
        self.spec.address
    }

    pub fn is_static(&self) -> bool {
        self.spec.is_static()
    }

    /// `None` either before normalisation or when the server just uses an
    /// ephemeral socket per query.
    pub fn socket(&self) -> Option<Arc<UpstreamSourceSocket>> {
        self.socket.load_full()
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn failed_queries(&self) -> u64 {
        self.failed_queries.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for UpstreamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamServer")
            .field("id", &self.id)
            .field("spec", &self.spec.to_string())
            .field("bound", &self.socket.load().is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub kept_static: usize,
    pub removed: usize,
    pub added: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Servers dropped because they pointed back at one of our own addresses.
    pub local_loops: usize,
    pub unspecified: usize,
    /// Servers dropped because no socket could be bound for them.
    pub disabled: usize,
    pub pooled: usize,
}

impl NormalizeReport {
    pub fn removed(&self) -> usize {
        self.local_loops + self.unspecified + self.disabled
    }
}

/// Lock-free view of the upstream servers for the query path.
#[derive(Clone)]
pub struct UpstreamReader {
    published: Arc<ArcSwap<Vec<Arc<UpstreamServer>>>>,
}

impl UpstreamReader {
    pub fn snapshot(&self) -> Arc<Vec<Arc<UpstreamServer>>> {
        self.published.load_full()
    }
}

/// Ordered upstream servers: static entries first, in configuration order,
/// followed by whatever the last reload supplied.
pub struct UpstreamServerList {
    servers: Vec<Arc<UpstreamServer>>,
    published: Arc<ArcSwap<Vec<Arc<UpstreamServer>>>>,
    tracker: Arc<dyn ForwardingStateTracker>,
    next_id: u64,
}

impl UpstreamServerList {
    pub fn new(tracker: Arc<dyn ForwardingStateTracker>) -> Self {
        Self {
            servers: Vec::new(),
            published: Arc::new(ArcSwap::from_pointee(Vec::new())),
            tracker,
            next_id: 1,
        }
    }

    pub fn reader(&self) -> UpstreamReader {
        UpstreamReader {
            published: Arc::clone(&self.published),
        }
    }

    pub fn add_static(&mut self, specs: Vec<UpstreamServerSpec>) -> Vec<ServerId> {
        let ids = specs
            .into_iter()
            .map(|mut spec| {
                spec.origin = ServerOrigin::Static;
                self.push(spec)
            })
            .collect();
        self.publish();
        ids
    }

    /// Replaces every dynamic server with `entries`. Static servers stay put.
    pub fn reload(&mut self, entries: Vec<UpstreamServerSpec>) -> ReloadReport {
        let mut report = ReloadReport::default();
        let tracker = Arc::clone(&self.tracker);

        self.servers.retain(|server| {
            if server.is_static() {
                report.kept_static += 1;
                return true;
            }
            tracker.on_server_removed(server.id());
            debug!(server = %server.spec(), "Dropping dynamic upstream");
            report.removed += 1;
            false
        });

        for spec in entries {
            self.push(spec.dynamic());
            report.added += 1;
        }

        self.publish();
        info!(
            kept_static = report.kept_static,
            removed = report.removed,
            added = report.added,
            "Upstream servers reloaded"
        );
        report
    }

    /// Drops servers that cannot or must not be used and binds a source
    /// socket for the rest.
    ///
    /// With `require_binding` a socket failure is returned as an error; the
    /// list keeps whatever was normalised up to that point.
    pub fn check_and_normalize(
        &mut self,
        local_addresses: &[AddressKey],
        pool: &UpstreamSocketPool,
        require_binding: bool,
    ) -> Result<NormalizeReport, NetworkError> {
        let mut report = NormalizeReport::default();
        let mut kept = Vec::with_capacity(self.servers.len());
        let mut failure = None;
        let mut servers = std::mem::take(&mut self.servers).into_iter();

        for server in servers.by_ref() {
            if !server.spec().routing.forwards() {
                kept.push(server);
                continue;
            }

            let address = server.address();

            if address.is_unspecified() && address.addr().is_ipv4() {
                warn!(server = %server.spec(), reason = "unspecified address", "Ignoring upstream");
                self.tracker.on_server_removed(server.id());
                report.unspecified += 1;
                continue;
            }

            if local_addresses.contains(&address) {
                warn!(server = %server.spec(), reason = "local interface", "Ignoring upstream");
                self.tracker.on_server_removed(server.id());
                report.local_loops += 1;
                continue;
            }

            if server.socket.load().is_some() {
                kept.push(server);
                continue;
            }

            let spec = server.spec();
            match pool.get_or_create(spec.source, &spec.interface, spec.routing_mark) {
                Ok(Some(socket)) => {
                    server.socket.store(Some(socket));
                    report.pooled += 1;
                    kept.push(server);
                }
                Ok(None) => kept.push(server),
                Err(e) if require_binding => {
                    kept.push(server);
                    failure = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(
                        server = %server.spec(),
                        reason = "cannot bind source socket",
                        error = %e,
                        "Ignoring upstream"
                    );
                    self.tracker.on_server_removed(server.id());
                    report.disabled += 1;
                }
            }
        }

        kept.extend(servers);
        self.servers = kept;
        self.publish();

        if let Some(e) = failure {
            return Err(e);
        }

        debug!(
            servers = self.servers.len(),
            removed = report.removed(),
            pooled = report.pooled,
            "Upstream servers normalized"
        );
        Ok(report)
    }

    pub fn get(&self, id: ServerId) -> Option<&Arc<UpstreamServer>> {
        self.servers.iter().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<UpstreamServer>> {
        self.servers.iter()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    fn push(&mut self, spec: UpstreamServerSpec) -> ServerId {
        let id = ServerId(self.next_id);
        self.next_id += 1;
        self.servers.push(Arc::new(UpstreamServer::new(id, spec)));
        id
    }

    fn publish(&self) {
        self.published.store(Arc::new(self.servers.clone()));
    }
}
