pub mod interfaces;
pub mod upstreams;

pub use interfaces::{DiscoverInterfacesUseCase, DiscoveredInterfaces};
pub use upstreams::LoadUpstreamsUseCase;
