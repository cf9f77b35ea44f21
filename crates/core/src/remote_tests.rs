// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    first = { 1, 500 },
    second = { 2, 1000 },
    third = { 3, 2000 },
)]
fn backoff_doubles(attempt: u32, expected_ms: u64) {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay_after(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn huge_attempt_counts_do_not_overflow() {
    let policy = RetryPolicy {
        attempts: u32::MAX,
        backoff: Duration::from_secs(u64::MAX / 2),
    };
    assert_eq!(policy.delay_after(40), Duration::MAX);
}

#[test]
fn none_disables_retry() {
    assert_eq!(RetryPolicy::none().attempts, 1);
}

#[test]
fn ssh_options_default_to_strict_host_checking() {
    let options = SshOptions::default();
    assert_eq!(options.known_hosts, KnownHostsPolicy::Strict);
    assert!(options.connect_timeout.is_none());
}
