//! Config Tests

use neti::{Config, NetError};

#[test]
fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.address(), "127.0.0.1:10000");
    assert_eq!(config.udp_buffer_size, 1024);
    assert_eq!(config.delivery_capacity, 0);
}

#[test]
fn test_builder_overrides() {
    let config = Config::builder()
        .listen_addr("0.0.0.0:7000")
        .udp_buffer_size(4096)
        .delivery_capacity(16)
        .build();

    assert_eq!(config.ip(), "0.0.0.0");
    assert_eq!(config.port().unwrap(), 7000);
    assert_eq!(config.udp_buffer_size, 4096);
    assert_eq!(config.delivery_capacity, 16);
}

#[test]
fn test_with_port_keeps_host() {
    let config = Config::builder().listen_addr("10.0.0.5:7000").build();

    assert_eq!(config.with_port(7001), "10.0.0.5:7001");
}

#[test]
fn test_invalid_port() {
    let missing = Config::builder().listen_addr("localhost").build();
    assert!(matches!(missing.port(), Err(NetError::Config(_))));

    let garbage = Config::builder().listen_addr("localhost:http").build();
    assert!(matches!(garbage.port(), Err(NetError::Config(_))));
}

#[test]
fn test_socket_addr() {
    let config = Config::builder().listen_addr("127.0.0.1:20000").build();

    assert_eq!(config.socket_addr().unwrap().port(), 20000);
}

#[test]
fn test_display() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:9000")
        .udp_buffer_size(512)
        .build();

    assert_eq!(config.to_string(), "{ip: 127.0.0.1, port: 9000, buffsize: 512}");
}
