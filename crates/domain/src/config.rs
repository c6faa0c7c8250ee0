pub mod errors;
pub mod logging;
pub mod network;
pub mod root;
pub mod upstream;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use network::NetworkConfig;
pub use root::{CliOverrides, Config};
pub use upstream::UpstreamConfig;
