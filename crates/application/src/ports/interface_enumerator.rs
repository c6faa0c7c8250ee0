use ferrous_netd_domain::{Interface, NetworkError};

/// Lists every address currently configured on the host, one entry per
/// (interface, address) pair.
///
/// Synchronous: enumeration is a handful of syscalls and runs on the
/// reconfiguration path, which is allowed to block.
pub trait InterfaceEnumerator: Send + Sync {
    fn enumerate(&self) -> Result<Vec<Interface>, NetworkError>;
}
