use super::listener::{ListenerOptions, ListenerReader, ListenerSet};
use super::reconciler::{ListenerReconciler, ReconcileReport};
use super::upstream_list::{NormalizeReport, ReloadReport, UpstreamReader, UpstreamServerList};
use super::upstream_pool::{PoolStats, UpstreamSocketPool};
use crate::system::StaticServerSource;
use ferrous_netd_application::ports::{
    ForwardingStateTracker, InterfaceEnumerator, UpstreamSource,
};
use ferrous_netd_application::use_cases::{
    DiscoverInterfacesUseCase, DiscoveredInterfaces, LoadUpstreamsUseCase,
};
use ferrous_netd_domain::config::NetworkConfig;
use ferrous_netd_domain::{
    AddressKey, Interface, InterfaceArena, InterfaceId, InterfaceNameFilter, NetworkError,
    ServerDefaults, UpstreamServerSpec,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the daemon owns on the network side. Lives on the control task;
/// query-path code only sees the readers.
pub struct NetworkState {
    config: NetworkConfig,
    defaults: ServerDefaults,
    filter: InterfaceNameFilter,
    discover: DiscoverInterfacesUseCase,
    upstream_source: Option<Arc<dyn UpstreamSource>>,

    arena: InterfaceArena,
    interfaces: Vec<InterfaceId>,
    local_addresses: Vec<AddressKey>,
    wildcard: bool,

    listeners: ListenerSet,
    reconciler: ListenerReconciler,
    pool: UpstreamSocketPool,
    servers: UpstreamServerList,
}

impl NetworkState {
    pub fn new(
        config: NetworkConfig,
        defaults: ServerDefaults,
        enumerator: Arc<dyn InterfaceEnumerator>,
        tracker: Arc<dyn ForwardingStateTracker>,
        upstream_source: Option<Arc<dyn UpstreamSource>>,
    ) -> Self {
        let listeners = ListenerSet::new(ListenerOptions {
            dad_retry_attempts: config.dad_retry_attempts,
            dad_retry_interval: config.dad_retry_interval(),
            tcp_backlog: config.tcp_backlog,
        });

        Self {
            filter: config.interface_filter(),
            discover: DiscoverInterfacesUseCase::new(enumerator)
                .with_no_dhcp(config.no_dhcp_interfaces.clone()),
            wildcard: config.wants_wildcard(),
            reconciler: ListenerReconciler::new(config.port),
            pool: UpstreamSocketPool::new(defaults.query_port != 0),
            servers: UpstreamServerList::new(tracker),
            arena: InterfaceArena::new(),
            interfaces: Vec::new(),
            local_addresses: Vec::new(),
            upstream_source,
            defaults,
            listeners,
            config,
        }
    }

    /// Opens the initial listeners and upstream sockets. Any error here is
    /// fatal for the daemon.
    pub fn start(&mut self, static_servers: Vec<UpstreamServerSpec>) -> Result<(), NetworkError> {
        let discovered = self.discover.execute(&mut self.filter, self.config.port)?;
        DiscoverInterfacesUseCase::warn_unused(&self.filter);

        if self.wildcard {
            self.listeners.add_wildcard(self.config.port)?;
            self.replace_interfaces(discovered);
        } else {
            self.apply_interfaces(discovered)?;
        }

        self.servers.add_static(static_servers);
        if let Err(e) = self.load_dynamic() {
            warn!(error = %e, "Failed to read upstream servers, continuing with static ones");
        }
        self.normalize_servers()?;

        info!(
            listeners = self.listeners.len(),
            wildcard = self.wildcard,
            servers = self.servers.len(),
            "Network state initialized"
        );
        Ok(())
    }

    /// Re-enumerates interfaces. In wildcard mode only the local address list
    /// changes; otherwise listeners are reconciled against the new list.
    pub fn rescan(&mut self) -> Result<Option<ReconcileReport>, NetworkError> {
        let discovered = self.discover.execute(&mut self.filter, self.config.port)?;

        let report = if self.wildcard {
            self.replace_interfaces(discovered);
            None
        } else {
            Some(self.apply_interfaces(discovered)?)
        };

        self.normalize_servers()?;
        Ok(report)
    }

    /// Restricts listening to `names`. An empty list goes back to wildcard
    /// listeners unless the configuration pins addresses or binding mode.
    pub fn set_interfaces(&mut self, names: Vec<String>) -> Result<ReconcileReport, NetworkError> {
        let mut filter = self.config.interface_filter_for(&names);
        let discovered = self.discover.execute(&mut filter, self.config.port)?;
        DiscoverInterfacesUseCase::warn_unused(&filter);
        self.filter = filter;

        let to_wildcard = names.is_empty()
            && !self.config.bind_interfaces
            && self.config.listen_addresses.is_empty();

        let report = if to_wildcard {
            let removed = self.listeners.remove(|l| !l.is_wildcard());
            let created = self.listeners.add_wildcard(self.config.port)?;
            self.replace_interfaces(discovered);
            ReconcileReport {
                created,
                removed,
                ..ReconcileReport::default()
            }
        } else {
            self.apply_interfaces(discovered)?
        };

        self.wildcard = to_wildcard;
        info!(interfaces = ?names, wildcard = self.wildcard, "Interfaces reconfigured");

        self.normalize_servers()?;
        Ok(report)
    }

    /// Re-reads the dynamic upstream source. On a read error the current list
    /// is kept.
    pub fn reload_upstreams(&mut self) -> Result<ReloadReport, NetworkError> {
        let report = self.load_dynamic()?;
        self.normalize_servers()?;
        Ok(report)
    }

    /// Replaces the dynamic servers with operator-supplied lines.
    pub fn set_servers(&mut self, lines: Vec<String>) -> Result<ReloadReport, NetworkError> {
        let source = Arc::new(StaticServerSource::new(lines));
        let specs = LoadUpstreamsUseCase::new(source, self.defaults).execute()?;
        let report = self.servers.reload(specs);
        self.normalize_servers()?;
        Ok(report)
    }

    pub fn shutdown(&mut self) -> usize {
        for server in self.servers.iter() {
            info!(
                server = %server.spec(),
                queries = server.queries(),
                failed = server.failed_queries(),
                "Upstream statistics"
            );
        }
        let stats = self.pool.stats();
        info!(
            created = stats.total_created,
            reused = stats.total_reused,
            reuse_rate = stats.reuse_rate(),
            "Upstream socket pool statistics"
        );

        let closed = self.listeners.close_all();
        info!(closed, "Listeners closed");
        closed
    }

    pub fn listener_reader(&self) -> ListenerReader {
        self.listeners.reader()
    }

    pub fn upstream_reader(&self) -> UpstreamReader {
        self.servers.reader()
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    pub fn servers(&self) -> &UpstreamServerList {
        &self.servers
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Interfaces we currently serve (every local address in wildcard mode).
    pub fn interfaces(&self) -> Vec<&Interface> {
        self.interfaces
            .iter()
            .filter_map(|id| self.arena.get(*id))
            .collect()
    }

    fn apply_interfaces(
        &mut self,
        discovered: DiscoveredInterfaces,
    ) -> Result<ReconcileReport, NetworkError> {
        // Only addresses we listen on can loop back to us.
        self.local_addresses = local_keys(&discovered.accepted);
        let new: Vec<InterfaceId> = discovered
            .accepted
            .into_iter()
            .map(|iface| self.arena.insert(iface))
            .collect();
        let old = std::mem::replace(&mut self.interfaces, new);

        self.reconciler
            .reconcile(&mut self.arena, old, &self.interfaces, &mut self.listeners)
    }

    fn replace_interfaces(&mut self, discovered: DiscoveredInterfaces) {
        for id in self.interfaces.drain(..) {
            self.arena.remove(id);
        }
        self.local_addresses = local_keys(&discovered.local);
        self.interfaces = discovered
            .local
            .into_iter()
            .map(|iface| self.arena.insert(iface))
            .collect();
    }

    fn load_dynamic(&mut self) -> Result<ReloadReport, NetworkError> {
        let Some(source) = &self.upstream_source else {
            return Ok(ReloadReport::default());
        };
        let specs = LoadUpstreamsUseCase::new(Arc::clone(source), self.defaults).execute()?;
        Ok(self.servers.reload(specs))
    }

    fn normalize_servers(&mut self) -> Result<NormalizeReport, NetworkError> {
        self.servers.check_and_normalize(
            &self.local_addresses,
            &self.pool,
            self.config.require_interface_binding,
        )
    }
}

/// Keys carry the service port: a server on one of our addresses but on
/// another port is not a loop.
fn local_keys(interfaces: &[Interface]) -> Vec<AddressKey> {
    interfaces.iter().map(|iface| iface.address).collect()
}
