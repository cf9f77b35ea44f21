// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    bare = { "example.com", "example.com", None, None },
    with_user = { "deploy@example.com", "example.com", Some("deploy"), None },
    with_port = { "example.com:2222", "example.com", None, Some(2222) },
    full = { "deploy@10.0.0.5:22", "10.0.0.5", Some("deploy"), Some(22) },
    ipv6_bracketed = { "[::1]:2200", "::1", None, Some(2200) },
    ipv6_bare = { "fe80::1", "fe80::1", None, None },
    surrounding_space = { "  web1  ", "web1", None, None },
)]
fn parses_descriptor(input: &str, address: &str, user: Option<&str>, port: Option<u16>) {
    let host: HostDescriptor = input.parse().unwrap();
    assert_eq!(host.address, address);
    assert_eq!(host.user.as_deref(), user);
    assert_eq!(host.port, port);
}

#[parameterized(
    empty = { "" },
    empty_user = { "@example.com" },
    empty_address = { "deploy@:22" },
    bad_port = { "example.com:ssh" },
    port_overflow = { "example.com:70000" },
    unterminated = { "[::1:22" },
)]
fn rejects_invalid_descriptor(input: &str) {
    assert!(input.parse::<HostDescriptor>().is_err(), "{input} should not parse");
}

#[test]
fn display_round_trips_through_parse() {
    let host = HostDescriptor::new("::1").with_user("ops").with_port(2222);
    assert_eq!(host.to_string(), "ops@[::1]:2222");
    assert_eq!(host.to_string().parse::<HostDescriptor>().unwrap(), host);
}

#[test]
fn destination_omits_port() {
    let host = HostDescriptor::new("example.com").with_user("deploy").with_port(22);
    assert_eq!(host.destination(), "deploy@example.com");
}

#[test]
fn descriptors_differing_in_port_are_distinct_keys() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(HostDescriptor::new("a").with_port(22));
    set.insert(HostDescriptor::new("a").with_port(2222));
    set.insert(HostDescriptor::new("a").with_port(22));
    assert_eq!(set.len(), 2);
}
