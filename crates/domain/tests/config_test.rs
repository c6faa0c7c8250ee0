use ferrous_netd_domain::config::{CliOverrides, Config};
use ferrous_netd_domain::{DomainRouting, InterfaceScope};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.network.port, 53);
    assert!(config.network.interfaces.is_empty());
    assert!(!config.network.bind_interfaces);
    assert_eq!(config.network.dad_retry_attempts, 20);
    assert_eq!(config.network.dad_retry_interval_ms, 1000);
    assert_eq!(config.network.query_port, 0);
    assert!(config.network.wants_wildcard());
    assert_eq!(config.upstream.resolv_file, "/etc/resolv.conf");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_config_parses_sections() {
    let config = Config::from_toml(
        r#"
        [network]
        port = 5353
        interfaces = ["eth0", "wlan*"]
        except_interfaces = ["wlan9"]
        no_dhcp_interfaces = ["wlan0"]
        query_port = 5300
        routing_mark = 7

        [network.bridge_interfaces]
        br0 = ["tap0", "tap1"]

        [upstream]
        servers = ["1.1.1.1", "/lan/192.168.1.1"]
        addresses = ["/router.lan/192.168.1.1"]
        no_resolv = true

        [logging]
        level = "debug"
        json = true
    "#,
    )
    .unwrap();

    assert_eq!(config.network.port, 5353);
    assert!(!config.network.wants_wildcard());
    assert_eq!(config.network.no_dhcp_interfaces, vec!["wlan0".to_string()]);
    assert!(config.logging.json);
    config.validate().unwrap();

    let defaults = config.server_defaults();
    assert_eq!(defaults.query_port, 5300);
    assert_eq!(defaults.routing_mark, Some(7));

    let specs = config.upstream.static_servers(&defaults).unwrap();
    assert_eq!(specs.len(), 3);
    assert_eq!(
        specs[2].routing,
        DomainRouting::LiteralAddress("router.lan".into())
    );
}

#[test]
fn test_interface_filter_from_config() {
    let config = Config::from_toml(
        r#"
        [network]
        interfaces = ["eth*"]
        except_interfaces = ["eth9"]

        [network.bridge_interfaces]
        br0 = ["tap0"]
    "#,
    )
    .unwrap();

    let mut filter = config.network.interface_filter();
    let addr = "10.0.0.1".parse().unwrap();
    assert_eq!(filter.classify("eth0", addr), InterfaceScope::InScope);
    assert_eq!(filter.classify("eth9", addr), InterfaceScope::OutOfScope);
    assert_eq!(
        filter.classify("tap0", addr),
        InterfaceScope::AliasOf("br0".to_string())
    );
}

#[test]
fn test_validate_rejects_bad_server() {
    let config = Config::from_toml(
        r#"
        [upstream]
        servers = ["not a server"]
    "#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_long_interface_name() {
    let config = Config::from_toml(
        r#"
        [network]
        interfaces = ["an-interface-name-too-long"]
    "#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_requires_some_upstream() {
    let config = Config::from_toml(
        r#"
        [upstream]
        no_resolv = true
    "#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_file_with_overrides() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[network]\nport = 5353\ninterfaces = [\"eth0\"]").unwrap();

    let overrides = CliOverrides {
        port: Some(1053),
        interfaces: vec!["wlan0".to_string()],
        log_level: Some("trace".to_string()),
        ..CliOverrides::default()
    };
    let config = Config::load(file.path().to_str(), overrides).unwrap();

    assert_eq!(config.network.port, 1053);
    assert_eq!(config.network.interfaces, vec!["wlan0".to_string()]);
    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_load_missing_file_fails() {
    assert!(Config::load(Some("/nonexistent/ferrous-netd.toml"), CliOverrides::default()).is_err());
}
