mod forwarding_state_tracker;
mod interface_enumerator;
mod upstream_source;

pub use forwarding_state_tracker::ForwardingStateTracker;
pub use interface_enumerator::InterfaceEnumerator;
pub use upstream_source::UpstreamSource;
