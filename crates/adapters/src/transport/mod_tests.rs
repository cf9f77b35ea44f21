// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn output(exit_code: i32, stderr: &str) -> RemoteOutput {
    RemoteOutput {
        exit_code,
        stdout: vec![],
        stderr: stderr.as_bytes().to_vec(),
    }
}

#[parameterized(
    refused = { 255, "ssh: connect to host web1 port 22: Connection refused", true },
    dns = { 255, "ssh: Could not resolve hostname web1: Name or service not known", true },
    reset = { 255, "Connection reset by peer", true },
    remote_program_255 = { 255, "custom failure", false },
    pattern_without_ssh_code = { 7, "curl: (7) Connection refused", false },
    success = { 0, "", false },
)]
fn classifies_output(exit_code: i32, stderr: &str, transient: bool) {
    assert_eq!(is_transient_output(&output(exit_code, stderr)), transient);
}

#[test]
fn only_connection_errors_are_transient() {
    let host = HostDescriptor::new("web1");
    assert!(TransportError::connection(&host, "reset").is_transient());
    assert!(!TransportError::other(&host, "io").is_transient());
}
