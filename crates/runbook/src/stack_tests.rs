// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::parse_runbook;

#[test]
fn no_stacks_selects_nothing() {
    assert_eq!(select_stack(&Runbook::default(), None).unwrap(), None);
}

#[test]
fn single_stack_is_selected_implicitly() {
    let runbook = parse_runbook("[stack.api]\nbasedir = \"services/api\"\n").unwrap();
    let stack = select_stack(&runbook, None).unwrap().unwrap();
    assert_eq!(stack.name, "api");
    assert_eq!(stack.basedir.as_deref(), Some("services/api"));
}

#[test]
fn several_stacks_have_no_default() {
    let runbook = parse_runbook("[stack.api]\n[stack.worker]\n").unwrap();
    assert_eq!(select_stack(&runbook, None).unwrap(), None);
    assert_eq!(
        select_stack(&runbook, Some("worker")).unwrap().unwrap().name,
        "worker"
    );
}

#[test]
fn unknown_stack_lists_available() {
    let runbook = parse_runbook("[stack.api]\n[stack.worker]\n").unwrap();
    let err = select_stack(&runbook, Some("web")).unwrap_err();
    assert_eq!(
        err,
        StageError::UnknownStack {
            name: "web".into(),
            available: vec!["api".into(), "worker".into()],
        }
    );
    assert!(err.to_string().contains("api, worker"));
}
