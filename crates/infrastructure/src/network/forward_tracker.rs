use dashmap::DashMap;
use ferrous_netd_application::ports::ForwardingStateTracker;
use ferrous_netd_domain::ServerId;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// In-flight forwarded queries, keyed by the upstream server they went to.
#[derive(Default)]
pub struct InFlightForwards {
    pending: DashMap<ServerId, Vec<u16>>,
    abandoned: AtomicU64,
}

impl InFlightForwards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, server: ServerId, query_id: u16) {
        self.pending.entry(server).or_default().push(query_id);
    }

    /// Returns false if the query was not pending (answered twice, or its
    /// server has since been removed).
    pub fn complete(&self, server: ServerId, query_id: u16) -> bool {
        let Some(mut ids) = self.pending.get_mut(&server) else {
            return false;
        };
        match ids.iter().position(|id| *id == query_id) {
            Some(pos) => {
                ids.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self, server: ServerId) -> usize {
        self.pending.get(&server).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Queries dropped because their server went away.
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}

impl ForwardingStateTracker for InFlightForwards {
    fn on_server_removed(&self, server: ServerId) {
        if let Some((_, ids)) = self.pending.remove(&server) {
            self.abandoned.fetch_add(ids.len() as u64, Ordering::Relaxed);
            debug!(server = %server, dropped = ids.len(), "Dropped in-flight forwards");
        }
    }
}
