//! Ferrous Netd Domain Layer
pub mod address;
pub mod config;
pub mod errors;
pub mod interface;
pub mod interface_filter;
pub mod upstream;

pub use address::{AddressFamily, AddressKey, SocketOptions};
pub use config::{CliOverrides, Config, ConfigError};
pub use errors::{BindFailure, NetworkError};
pub use interface::{Interface, InterfaceArena, InterfaceId};
pub use interface_filter::{InterfaceNameFilter, InterfaceScope};
pub use upstream::{
    DomainRouting, ServerDefaults, ServerId, ServerOrigin, UpstreamServerSpec, DEFAULT_DNS_PORT,
};
