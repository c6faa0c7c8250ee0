mod network;

pub use network::NetworkServices;
