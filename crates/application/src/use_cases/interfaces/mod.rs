pub mod discover_interfaces;

pub use discover_interfaces::{DiscoverInterfacesUseCase, DiscoveredInterfaces};
