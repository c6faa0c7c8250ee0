use ferrous_netd_application::ports::UpstreamSource;
use ferrous_netd_domain::Config;
use ferrous_netd_infrastructure::network::{InFlightForwards, NetworkState};
use ferrous_netd_infrastructure::system::{ResolvFileSource, SystemInterfaceEnumerator};
use std::sync::Arc;
use tracing::info;

pub struct NetworkServices {
    pub state: NetworkState,
    pub forwards: Arc<InFlightForwards>,
}

impl NetworkServices {
    /// Builds the network state and opens every listener. Fails if any
    /// listener or required upstream socket cannot be bound.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing network state");

        let defaults = config.server_defaults();
        let forwards = Arc::new(InFlightForwards::new());
        let upstream_source = Self::upstream_source(config);

        let mut state = NetworkState::new(
            config.network.clone(),
            defaults,
            Arc::new(SystemInterfaceEnumerator::new()),
            forwards.clone(),
            upstream_source,
        );

        let static_servers = config.upstream.static_servers(&defaults)?;
        state.start(static_servers)?;

        Ok(Self { state, forwards })
    }

    fn upstream_source(config: &Config) -> Option<Arc<dyn UpstreamSource>> {
        if config.upstream.no_resolv {
            return None;
        }
        Some(Arc::new(ResolvFileSource::new(&config.upstream.resolv_file)))
    }
}
