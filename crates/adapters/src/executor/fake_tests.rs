// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn records_calls_with_context() {
    let exec = FakeExecutor::new();
    let ctx = Context::new("/srv").with_env("A", "1");
    exec.run("make build", &ctx, &RunOptions::default())
        .await
        .unwrap();

    let calls = exec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "make build");
    assert_eq!(calls[0].working_dir, PathBuf::from("/srv"));
    assert_eq!(calls[0].env.get("A").map(String::as_str), Some("1"));
    assert!(!calls[0].dry_run);
}

#[tokio::test]
async fn scripted_failure_respects_allow_failure() {
    let exec = FakeExecutor::new();
    exec.fail_with("make build", 1, "compile error");
    let ctx = Context::new("/");

    let err = exec
        .run("make build", &ctx, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::CommandFailed { .. }));

    let result = exec
        .run("make build", &ctx, &RunOptions::default().allow_failure())
        .await
        .unwrap();
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.stderr_lossy(), "compile error");
}

#[tokio::test]
async fn dry_run_ignores_scripted_failures() {
    let exec = FakeExecutor::new();
    exec.fail_on("make", 2);
    let result = exec
        .run("make", &Context::new("/").with_dry_run(true), &RunOptions::default())
        .await
        .unwrap();
    assert!(result.is_dry_run());
    assert!(exec.calls()[0].dry_run);
}

#[tokio::test]
async fn first_matching_rule_wins() {
    let exec = FakeExecutor::new();
    exec.respond("echo", "first");
    exec.respond("echo hi", "second");
    let result = exec
        .run("echo hi", &Context::new("/"), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(result.stdout_lossy(), "first");
}

#[tokio::test]
async fn cancel_trigger_sets_flag() {
    let exec = FakeExecutor::new();
    let flag = CancelFlag::new();
    exec.cancel_on("deploy", flag.clone());
    exec.run("deploy now", &Context::new("/"), &RunOptions::default())
        .await
        .unwrap();
    assert!(flag.is_cancelled());
}

#[tokio::test]
async fn copies_are_recorded_by_label() {
    let fake = FakeExecutor::new();
    fake.fail_on("copy broken.tar", 1);
    let ctx = Context::new("/srv");
    let opts = RunOptions::default();

    fake.copy(Path::new("app.tar"), "/tmp", &ctx, &opts, &kit_core::NoProgress)
        .await
        .unwrap();
    let err = fake
        .copy(Path::new("broken.tar"), "/tmp", &ctx, &opts, &kit_core::NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::CommandFailed { .. }));
    assert_eq!(
        fake.commands(),
        vec!["copy app.tar -> /tmp", "copy broken.tar -> /tmp"]
    );
}

#[tokio::test]
async fn path_checks_and_temp_dirs_follow_rules() {
    let fake = FakeExecutor::new();
    fake.fail_on("test -e 'missing'", 1);
    fake.respond("mktemp", "/tmp/kit-abc123\n");
    let ctx = Context::new("/srv");

    assert!(fake.path_exists("present", &ctx).await.unwrap());
    assert!(!fake.path_exists("missing", &ctx).await.unwrap());
    assert_eq!(fake.mkdtemp("kit-", &ctx).await.unwrap(), "/tmp/kit-abc123");
}
