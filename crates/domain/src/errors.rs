use std::fmt;
use thiserror::Error;

/// Why a bind failed, reduced to the cases callers act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindFailure {
    AddressInUse,
    PermissionDenied,
    /// The address is not (yet) usable; for IPv6 this is usually DAD.
    AddressNotAvailable,
    FamilyUnsupported,
    Other(String),
}

impl fmt::Display for BindFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressInUse => f.write_str("address already in use"),
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::AddressNotAvailable => f.write_str("address not available"),
            Self::FamilyUnsupported => f.write_str("address family not supported"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Failed to bind {address}: {kind}")]
    Bind { address: String, kind: BindFailure },

    #[error("Failed to bind socket to device {interface}: {reason}")]
    DeviceBind { interface: String, reason: String },

    #[error("Binding to device {interface} is not supported on this platform")]
    DeviceBindUnsupported { interface: String },

    #[error("Failed to set {option}: {reason}")]
    SocketOption { option: String, reason: String },

    #[error("Interface enumeration failed: {0}")]
    Enumeration(String),

    #[error("Cannot allocate upstream socket for {source_address}: {reason}")]
    PoolAllocation {
        source_address: String,
        reason: String,
    },

    #[error("Invalid upstream server: {0}")]
    InvalidServer(String),

    #[error("Failed to read upstream source {path}: {reason}")]
    UpstreamSource { path: String, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl NetworkError {
    pub fn bind(address: impl fmt::Display, kind: BindFailure) -> Self {
        Self::Bind {
            address: address.to_string(),
            kind,
        }
    }

    /// Failures worth retrying while an IPv6 address finishes DAD.
    pub fn is_address_not_available(&self) -> bool {
        matches!(
            self,
            Self::Bind {
                kind: BindFailure::AddressNotAvailable,
                ..
            }
        )
    }

    pub fn is_family_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Bind {
                kind: BindFailure::FamilyUnsupported,
                ..
            }
        )
    }
}
