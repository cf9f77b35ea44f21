// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn finished(exit_code: i32) -> CommandResult {
    CommandResult::new("make build", exit_code, vec![], b"boom".to_vec(), Duration::ZERO)
}

#[test]
fn zero_exit_passes() {
    let result = check_exit(finished(0), &RunOptions::default()).unwrap();
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn non_zero_exit_fails_with_result() {
    let err = check_exit(finished(2), &RunOptions::default()).unwrap_err();
    match err {
        ExecError::CommandFailed { command, result } => {
            assert_eq!(command, "make build");
            assert_eq!(result.exit_code(), 2);
            assert_eq!(result.stderr(), b"boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn allow_failure_returns_result() {
    let opts = RunOptions::default().allow_failure();
    let result = check_exit(finished(2), &opts).unwrap();
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn timeout_fails_even_with_allow_failure() {
    let opts = RunOptions::default().allow_failure();
    let result = CommandResult::timeout("sleep 5", vec![], vec![], Duration::from_millis(10));
    assert!(matches!(
        check_exit(result, &opts),
        Err(ExecError::Timeout { .. })
    ));
}
