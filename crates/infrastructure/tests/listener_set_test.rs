mod helpers;

use ferrous_netd_domain::{AddressFamily, AddressKey, InterfaceArena, NetworkError};
use ferrous_netd_infrastructure::network::{ListenerOptions, ListenerSet};
use helpers::{free_port, loopback};
use socket2::{Domain, Socket, Type};
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_add_bound_udp_only_on_port_zero() {
    let mut arena = InterfaceArena::new();
    let iface = loopback("lo", "127.0.0.2");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions::default());

    assert!(set.add_bound(id, &iface, 0).unwrap());

    let listener = set.find(&iface.address).unwrap();
    assert!(listener.udp().is_some());
    assert!(listener.tcp().is_none());
    assert_eq!(listener.interface(), Some(id));
    assert_eq!(listener.mtu(), 65536);
}

#[test]
fn test_add_bound_opens_tcp_when_port_set() {
    let port = free_port("127.0.0.3");
    let mut arena = InterfaceArena::new();
    let iface = loopback("lo", "127.0.0.3");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions::default());

    assert!(set.add_bound(id, &iface, port).unwrap());

    let listener = set.find(&iface.address.with_port(port)).unwrap();
    assert!(listener.tcp().is_some());
    let bound = listener.udp().unwrap().local_addr().unwrap().as_socket().unwrap();
    assert_eq!(bound.port(), port);
}

#[test]
fn test_add_bound_twice_is_noop() {
    let mut arena = InterfaceArena::new();
    let iface = loopback("lo", "127.0.0.4");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions::default());

    assert!(set.add_bound(id, &iface, 0).unwrap());
    assert!(!set.add_bound(id, &iface, 0).unwrap());
    assert_eq!(set.len(), 1);
}

#[test]
fn test_remove_closes_and_releases_sockets() {
    let mut arena = InterfaceArena::new();
    let iface = loopback("lo", "127.0.0.5");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions::default());
    let reader = set.reader();
    set.add_bound(id, &iface, 0).unwrap();

    let snapshot = reader.snapshot();
    let weak = Arc::downgrade(&snapshot[0]);

    assert_eq!(set.remove(|l| l.interface() == Some(id)), 1);
    assert!(set.is_empty());
    assert!(reader.snapshot().is_empty());

    // Still referenced by the old snapshot, but already closed.
    let listener = weak.upgrade().unwrap();
    assert!(listener.is_closed());
    assert!(listener.udp().is_none());
    assert!(!listener.close());
    drop(listener);

    drop(snapshot);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_wildcard_one_per_family() {
    let mut set = ListenerSet::new(ListenerOptions::default());

    let created = set.add_wildcard(0).unwrap();
    assert!(created >= 1);
    assert!(set.wildcard(AddressFamily::Ipv4).is_some());
    assert!(set.has_wildcard());

    assert_eq!(set.add_wildcard(0).unwrap(), 0);
    assert_eq!(set.len(), created);

    assert_eq!(set.remove_wildcards(), created);
    assert!(!set.has_wildcard());
}

#[test]
fn test_retarget_keeps_socket() {
    let mut arena = InterfaceArena::new();
    let old_iface = loopback("lo", "127.0.0.6");
    let new_iface = loopback("lo", "127.0.0.6").with_mtu(1280).with_dhcp(false);
    let old = arena.insert(old_iface.clone());
    let new = arena.insert(new_iface.clone());
    let mut set = ListenerSet::new(ListenerOptions::default());
    set.add_bound(old, &old_iface, 0).unwrap();
    let before = Arc::clone(set.find(&old_iface.address).unwrap());

    assert_eq!(set.retarget(old, new, &new_iface), 1);

    let after = set.find(&new_iface.address).unwrap();
    assert!(Arc::ptr_eq(&before, after));
    assert_eq!(after.interface(), Some(new));
    assert_eq!(after.mtu(), 1280);
    assert!(!after.dhcp_allowed());
}

#[test]
fn test_ipv6_bind_retries_while_address_unavailable() {
    let mut arena = InterfaceArena::new();
    let iface = loopback("eth0", "2001:db8::dead");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions {
        dad_retry_attempts: 3,
        dad_retry_interval: Duration::from_millis(20),
        tcp_backlog: 32,
    });

    let started = Instant::now();
    let err = set.add_bound(id, &iface, 0).unwrap_err();

    if err.is_family_unsupported() {
        return;
    }
    assert!(err.is_address_not_available(), "unexpected error: {err}");
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert!(set.is_empty());
}

#[test]
fn test_ipv4_unavailable_address_fails_without_retry() {
    let mut arena = InterfaceArena::new();
    let iface = loopback("eth0", "192.0.2.77");
    let id = arena.insert(iface.clone());
    let mut set = ListenerSet::new(ListenerOptions {
        dad_retry_attempts: 5,
        dad_retry_interval: Duration::from_secs(1),
        tcp_backlog: 32,
    });

    let started = Instant::now();
    let err = set.add_bound(id, &iface, 0).unwrap_err();

    assert!(matches!(err, NetworkError::Bind { .. }));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_close_all() {
    let mut arena = InterfaceArena::new();
    let mut set = ListenerSet::new(ListenerOptions::default());
    for addr in ["127.0.0.7", "127.0.0.8"] {
        let iface = loopback("lo", addr);
        let id = arena.insert(iface.clone());
        set.add_bound(id, &iface, 0).unwrap();
    }

    assert_eq!(set.close_all(), 2);
    assert!(set.find(&AddressKey::new("127.0.0.7".parse().unwrap(), 0)).is_none());
}

#[test]
fn test_wildcard_failure_publishes_opened_listeners() {
    let port = free_port("127.0.0.1");
    let Ok(blocker) = Socket::new(Domain::IPV6, Type::DGRAM, None) else {
        return;
    };
    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    if blocker.set_only_v6(true).is_err() || blocker.bind(&addr.into()).is_err() {
        return;
    }
    let mut set = ListenerSet::new(ListenerOptions::default());
    let reader = set.reader();

    let result = set.add_wildcard(port);

    assert!(result.is_err());
    assert_eq!(set.len(), 1);
    assert!(set.wildcard(AddressFamily::Ipv4).is_some());
    assert_eq!(reader.snapshot().len(), 1);
}
