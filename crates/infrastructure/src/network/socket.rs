use ferrous_netd_domain::{AddressFamily, AddressKey, BindFailure, NetworkError, SocketOptions};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::os::unix::io::AsRawFd;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    Udp,
    Tcp,
}

impl SocketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

/// Creates a socket, applies `options` and binds it to `key`.
///
/// The socket comes back non-blocking. TCP sockets are not put into the
/// listening state here.
pub fn open_socket(
    key: &AddressKey,
    kind: SocketKind,
    options: &SocketOptions,
) -> Result<Socket, NetworkError> {
    let domain = match key.family() {
        AddressFamily::Ipv4 => Domain::IPV4,
        AddressFamily::Ipv6 => Domain::IPV6,
    };
    let (ty, protocol) = match kind {
        SocketKind::Udp => (Type::DGRAM, Protocol::UDP),
        SocketKind::Tcp => (Type::STREAM, Protocol::TCP),
    };

    let socket = Socket::new(domain, ty, Some(protocol))
        .map_err(|e| NetworkError::bind(key, bind_failure(&e)))?;

    apply_options(&socket, key, kind, options)?;

    socket
        .bind(&key.socket_addr().into())
        .map_err(|e| NetworkError::bind(key, bind_failure(&e)))?;

    socket
        .set_nonblocking(true)
        .map_err(|e| socket_option_error("O_NONBLOCK", &e))?;

    debug!(address = %key, kind = kind.as_str(), "Socket bound");
    Ok(socket)
}

/// Binds an outbound socket to its source address. TCP connections always
/// get an ephemeral port; only UDP keeps the configured query port.
pub fn local_bind(
    source: &AddressKey,
    interface: &str,
    mark: Option<u32>,
    is_tcp: bool,
) -> Result<Socket, NetworkError> {
    let (key, kind) = if is_tcp {
        (source.with_port(0), SocketKind::Tcp)
    } else {
        (*source, SocketKind::Udp)
    };
    open_socket(&key, kind, &SocketOptions::upstream(interface, mark))
}

fn apply_options(
    socket: &Socket,
    key: &AddressKey,
    kind: SocketKind,
    options: &SocketOptions,
) -> Result<(), NetworkError> {
    if options.reuse_address {
        socket
            .set_reuse_address(true)
            .map_err(|e| socket_option_error("SO_REUSEADDR", &e))?;
    }

    if options.ipv6_only && key.family() == AddressFamily::Ipv6 {
        socket
            .set_only_v6(true)
            .map_err(|e| socket_option_error("IPV6_V6ONLY", &e))?;
    }

    if options.packet_info && kind == SocketKind::Udp {
        enable_pktinfo(socket, key.family())?;
    }

    if let Some(mark) = options.mark {
        set_routing_mark(socket, mark)?;
    }

    if let Some(device) = &options.bound_device {
        match set_bind_device(socket, device) {
            Ok(()) => {}
            Err(NetworkError::DeviceBindUnsupported { interface }) => {
                warn!(interface = %interface, "Device binding unsupported, ignoring");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Asks the kernel to report the destination address of every datagram,
/// which wildcard sockets need to answer from the right address.
pub fn enable_pktinfo(socket: &Socket, family: AddressFamily) -> Result<(), NetworkError> {
    let (level, option, name) = match family {
        AddressFamily::Ipv4 => (libc::IPPROTO_IP, libc::IP_PKTINFO, "IP_PKTINFO"),
        AddressFamily::Ipv6 => (
            libc::IPPROTO_IPV6,
            libc::IPV6_RECVPKTINFO,
            "IPV6_RECVPKTINFO",
        ),
    };
    setsockopt_int(socket, level, option, 1).map_err(|e| socket_option_error(name, &e))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_bind_device(socket: &Socket, interface: &str) -> Result<(), NetworkError> {
    // IFNAMSIZ includes the terminating NUL.
    if interface.len() > 15 {
        return Err(NetworkError::DeviceBind {
            interface: interface.to_string(),
            reason: "interface name too long (max 15 chars)".to_string(),
        });
    }

    let mut ifname = [0u8; 16];
    ifname[..interface.len()].copy_from_slice(interface.as_bytes());

    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            ifname.as_ptr().cast::<libc::c_void>(),
            ifname.len() as libc::socklen_t,
        )
    };

    if ret != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENOPROTOOPT) {
            return Err(NetworkError::DeviceBindUnsupported {
                interface: interface.to_string(),
            });
        }
        return Err(NetworkError::DeviceBind {
            interface: interface.to_string(),
            reason: err.to_string(),
        });
    }

    debug!(interface = %interface, "Bound socket to device");
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn set_bind_device(_socket: &Socket, interface: &str) -> Result<(), NetworkError> {
    Err(NetworkError::DeviceBindUnsupported {
        interface: interface.to_string(),
    })
}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn set_routing_mark(socket: &Socket, mark: u32) -> Result<(), NetworkError> {
    setsockopt_int(socket, libc::SOL_SOCKET, libc::SO_MARK, mark as libc::c_int)
        .map_err(|e| socket_option_error("SO_MARK", &e))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn set_routing_mark(_socket: &Socket, _mark: u32) -> Result<(), NetworkError> {
    Err(NetworkError::SocketOption {
        option: "SO_MARK".to_string(),
        reason: "not supported on this platform".to_string(),
    })
}

fn setsockopt_int(
    socket: &Socket,
    level: libc::c_int,
    option: libc::c_int,
    value: libc::c_int,
) -> io::Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            option,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn socket_option_error(option: &str, err: &io::Error) -> NetworkError {
    NetworkError::SocketOption {
        option: option.to_string(),
        reason: err.to_string(),
    }
}

/// ENODEV shows up instead of EADDRNOTAVAIL on some kernels while an IPv6
/// address is still tentative.
pub fn bind_failure(err: &io::Error) -> BindFailure {
    match err.raw_os_error() {
        Some(libc::EADDRNOTAVAIL) | Some(libc::ENODEV) => BindFailure::AddressNotAvailable,
        Some(libc::EAFNOSUPPORT) => BindFailure::FamilyUnsupported,
        Some(libc::EADDRINUSE) => BindFailure::AddressInUse,
        Some(libc::EACCES) | Some(libc::EPERM) => BindFailure::PermissionDenied,
        _ => BindFailure::Other(err.to_string()),
    }
}
