use ferrous_netd_domain::ServerId;

/// Port for whatever keeps per-query forwarding state keyed by upstream server.
pub trait ForwardingStateTracker: Send + Sync {
    /// Called before the server is dropped from the upstream list. Anything
    /// still pointing at it must be forgotten or rerouted.
    fn on_server_removed(&self, server: ServerId);
}
