pub mod forward_tracker;
pub mod listener;
pub mod reconciler;
pub mod socket;
pub mod state;
pub mod upstream_list;
pub mod upstream_pool;

pub use forward_tracker::InFlightForwards;
pub use listener::{Listener, ListenerOptions, ListenerReader, ListenerSet};
pub use reconciler::{ListenerReconciler, ReconcileReport};
pub use socket::SocketKind;
pub use state::NetworkState;
pub use upstream_list::{
    NormalizeReport, ReloadReport, UpstreamReader, UpstreamServer, UpstreamServerList,
};
pub use upstream_pool::{PoolStats, UpstreamSocketPool, UpstreamSourceSocket};
