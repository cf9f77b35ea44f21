// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::parse_runbook;

fn errors_for(content: &str) -> Vec<ValidationError> {
    let runbook = parse_runbook(content).unwrap();
    match validate_runbook(&runbook) {
        Ok(()) => Vec::new(),
        Err(e) => e.errors,
    }
}

#[test]
fn valid_runbook_passes() {
    let errors = errors_for(
        r#"
[stage.prod]
host = "web1"
default = true

[stage.dev]
type = "local"

[task.build]
run = "make build"

[task.deploy]
stages = ["prod"]
[[task.deploy.step]]
task = "build"
[[task.deploy.step]]
run = "make push"
"#,
    );
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn undefined_task_reference() {
    let errors = errors_for("[[task.deploy.step]]\ntask = \"build\"\n");
    assert_eq!(
        errors,
        vec![ValidationError::UndefinedReference {
            kind: "task",
            name: "build".into(),
            referenced_in: "task.deploy.step 'build'".into(),
        }]
    );
}

#[test]
fn undefined_stage_in_filter() {
    let errors = errors_for("[task.t]\nstages = [\"qa\"]\nrun = \"true\"\n");
    assert!(matches!(
        &errors[..],
        [ValidationError::UndefinedReference { kind: "stage", name, .. }] if name == "qa"
    ));
}

#[test]
fn undefined_stack_in_filter() {
    let errors = errors_for("[stack.api]\n[task.t]\nstacks = [\"api\", \"web\"]\nrun = \"true\"\n");
    assert!(matches!(
        &errors[..],
        [ValidationError::UndefinedReference { kind: "stack", name, .. }] if name == "web"
    ));
}

#[test]
fn detects_task_cycle() {
    let errors = errors_for(
        r#"
[[task.a.step]]
task = "b"
[[task.b.step]]
task = "c"
[[task.c.step]]
task = "a"
"#,
    );
    assert_eq!(
        errors,
        vec![ValidationError::TaskCycle {
            tasks: vec!["a".into(), "b".into(), "c".into(), "a".into()],
        }]
    );
}

#[test]
fn detects_self_reference() {
    let errors = errors_for("[[task.a.step]]\ntask = \"a\"\n");
    assert_eq!(
        errors,
        vec![ValidationError::TaskCycle {
            tasks: vec!["a".into(), "a".into()],
        }]
    );
}

#[test]
fn diamond_references_are_not_cycles() {
    let errors = errors_for(
        r#"
[[task.top.step]]
task = "left"
[[task.top.step]]
task = "right"
[task.left]
run = "true"
[[task.right.step]]
task = "left"
"#,
    );
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn duplicate_step_names() {
    let errors = errors_for(
        r#"
[[task.t.step]]
name = "build"
run = "make"
[[task.t.step]]
name = "build"
run = "make again"
"#,
    );
    assert_eq!(
        errors,
        vec![ValidationError::DuplicateStep {
            task: "t".into(),
            step: "build".into(),
        }]
    );
}

#[test]
fn remote_stage_needs_host() {
    let errors = errors_for("[stage.prod]\ntype = \"remote\"\n");
    assert_eq!(
        errors,
        vec![ValidationError::RemoteStageWithoutHost {
            stage: "prod".into()
        }]
    );
}

#[test]
fn at_most_one_default_stage() {
    let errors = errors_for(
        "[stage.a]\ndefault = true\n[stage.b]\ndefault = true\n",
    );
    assert_eq!(
        errors,
        vec![ValidationError::MultipleDefaultStages {
            stages: vec!["a".into(), "b".into()],
        }]
    );
}

#[test]
fn empty_parallel_group() {
    let errors = errors_for("[[task.t.step]]\nname = \"checks\"\nparallel = []\n");
    assert_eq!(
        errors,
        vec![ValidationError::EmptyParallel {
            task: "t".into(),
            step: "checks".into(),
        }]
    );
}

#[test]
fn display_lists_every_error() {
    let runbook = parse_runbook(
        "[stage.prod]\ntype = \"remote\"\n[[task.t.step]]\ntask = \"missing\"\n",
    )
    .unwrap();
    let message = validate_runbook(&runbook).unwrap_err().to_string();
    assert!(message.contains("2 error(s)"));
    assert!(message.contains("Remote stage 'prod' has no host"));
    assert!(message.contains("Undefined task 'missing'"));
}
