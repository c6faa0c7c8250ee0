mod helpers;

use ferrous_netd_application::use_cases::DiscoverInterfacesUseCase;
use ferrous_netd_domain::{InterfaceNameFilter, NetworkError};
use helpers::{make_interface, MockInterfaceEnumerator};
use std::sync::Arc;

fn enumerator() -> Arc<MockInterfaceEnumerator> {
    Arc::new(MockInterfaceEnumerator::new(vec![
        make_interface("lo", "127.0.0.1"),
        make_interface("eth0", "192.168.1.1"),
        make_interface("eth0", "2001:db8::1"),
        make_interface("wlan0", "192.168.2.1"),
        make_interface("tap0", "10.9.0.1"),
    ]))
}

#[test]
fn test_unrestricted_accepts_all_with_service_port() {
    let use_case = DiscoverInterfacesUseCase::new(enumerator());
    let mut filter = InterfaceNameFilter::new();

    let found = use_case.execute(&mut filter, 53).unwrap();

    assert_eq!(found.accepted.len(), 5);
    assert_eq!(found.rejected, 0);
    assert!(found.accepted.iter().all(|i| i.address.port() == 53));
}

#[test]
fn test_restricted_to_eth0() {
    let use_case = DiscoverInterfacesUseCase::new(enumerator());
    let mut filter = InterfaceNameFilter::new().allow_name("eth0");

    let found = use_case.execute(&mut filter, 53).unwrap();

    assert_eq!(found.accepted.len(), 2);
    assert!(found.accepted.iter().all(|i| &*i.name == "eth0"));
    assert_eq!(found.rejected, 3);
    assert_eq!(found.local.len(), 5);
}

#[test]
fn test_bridge_alias_not_listened_on() {
    let use_case = DiscoverInterfacesUseCase::new(enumerator());
    let mut filter = InterfaceNameFilter::new().bridge_alias("tap0", "eth0");

    let found = use_case.execute(&mut filter, 53).unwrap();

    assert_eq!(found.accepted.len(), 4);
    assert_eq!(
        found.aliases,
        vec![("tap0".to_string(), "eth0".to_string())]
    );
    assert!(filter.unused_aliases().is_empty());
}

#[test]
fn test_no_dhcp_marking() {
    let use_case =
        DiscoverInterfacesUseCase::new(enumerator()).with_no_dhcp(vec!["wlan0".to_string()]);
    let mut filter = InterfaceNameFilter::new();

    let found = use_case.execute(&mut filter, 53).unwrap();

    for interface in &found.accepted {
        assert_eq!(interface.dhcp_ok, &*interface.name != "wlan0");
    }
}

#[test]
fn test_unused_names_left_unmarked() {
    let use_case = DiscoverInterfacesUseCase::new(enumerator());
    let mut filter = InterfaceNameFilter::new()
        .allow_name("eth0")
        .allow_name("eht0");

    use_case.execute(&mut filter, 53).unwrap();
    DiscoverInterfacesUseCase::warn_unused(&filter);

    assert_eq!(filter.unused_names(), vec!["eht0"]);
}

#[test]
fn test_enumeration_failure_propagates() {
    let mock = enumerator();
    mock.set_error(NetworkError::Enumeration("netlink down".to_string()));
    let use_case = DiscoverInterfacesUseCase::new(mock);

    let result = use_case.execute(&mut InterfaceNameFilter::new(), 53);

    assert!(matches!(result, Err(NetworkError::Enumeration(_))));
}
