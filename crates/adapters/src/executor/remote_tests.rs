// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::transport::{FakeTransport, RemoteOutput, TransportCall, TransportError};
use kit_core::HostDescriptor;
use std::time::Duration;

fn executor() -> RemoteExecutor<FakeTransport> {
    RemoteExecutor::new(FakeTransport::new()).with_retry(RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(1),
    })
}

fn remote_ctx() -> Context {
    Context::new("/srv/app").with_host(HostDescriptor::new("web1").with_user("deploy"))
}

#[tokio::test]
async fn missing_host_is_configuration_error_before_any_transport_call() {
    let executor = executor();
    let err = executor
        .run("uptime", &Context::new("/"), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_configuration(), "got {err:?}");
    assert!(executor.transport().calls().is_empty());
}

#[tokio::test]
async fn missing_host_fails_even_in_dry_run() {
    let executor = executor();
    let ctx = Context::new("/").with_dry_run(true);
    let err = executor
        .run("uptime", &ctx, &RunOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn runs_command_line_on_host() {
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 0,
        stdout: b"up 3 days\n".to_vec(),
        stderr: vec![],
    });
    let ctx = remote_ctx().with_env("APP_ENV", "prod");

    let result = executor
        .run("uptime", &ctx, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.stdout_lossy(), "up 3 days\n");
    assert_eq!(result.command(), "uptime");
    let calls = executor.transport().calls();
    assert_eq!(
        calls.last(),
        Some(&TransportCall::Exec {
            host: HostDescriptor::new("web1").with_user("deploy"),
            command_line: "cd '/srv/app' && env 'APP_ENV=prod' sh -c 'uptime'".to_string(),
        })
    );
}

#[test]
fn command_line_quotes_command_and_keeps_tilde() {
    let ctx = Context::new("~/releases").with_host(HostDescriptor::new("web1"));
    assert_eq!(
        remote_command_line("echo 'hi' && ls", &ctx),
        "cd ~/'releases' && sh -c 'echo '\\''hi'\\'' && ls'"
    );
}

#[tokio::test]
async fn dry_run_records_without_transport() {
    let executor = executor();
    let result = executor
        .run("make push", &remote_ctx().with_dry_run(true), &RunOptions::default())
        .await
        .unwrap();

    assert!(result.is_dry_run());
    assert_eq!(result.stdout_lossy(), "[dry-run] deploy@web1: make push\n");
    assert!(executor.transport().calls().is_empty());
}

#[tokio::test]
async fn non_zero_remote_exit_is_command_failed() {
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 2,
        stdout: vec![],
        stderr: b"no such file\n".to_vec(),
    });
    let err = executor
        .run("cat missing", &remote_ctx(), &RunOptions::default())
        .await
        .unwrap_err();

    let ExecError::CommandFailed { result, .. } = err else {
        panic!("expected CommandFailed");
    };
    assert_eq!(result.exit_code(), 2);
    assert_eq!(result.stderr_lossy(), "no such file\n");
}

#[tokio::test]
async fn transient_failure_is_retried_on_a_fresh_connection() {
    let executor = executor();
    executor.transport().fail_connection("connection reset");

    let result = executor
        .run("uptime", &remote_ctx(), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.exit_code(), 0);
    assert_eq!(executor.transport().connects(), 2);
}

#[tokio::test]
async fn exhausted_retries_report_command_failed_255() {
    let executor = executor();
    for _ in 0..3 {
        executor.transport().fail_connection("connection refused");
    }

    let err = executor
        .run("uptime", &remote_ctx(), &RunOptions::default().allow_failure())
        .await
        .unwrap_err();

    let ExecError::CommandFailed { result, .. } = err else {
        panic!("expected CommandFailed");
    };
    assert_eq!(result.exit_code(), 255);
    assert!(result.stderr_lossy().contains("connection refused"));
    let execs = executor
        .transport()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, TransportCall::Exec { .. }))
        .count();
    assert_eq!(execs, 3);
}

#[tokio::test]
async fn non_transient_failure_is_not_retried() {
    let executor = executor();
    let host = HostDescriptor::new("web1");
    executor
        .transport()
        .push_failure(TransportError::other(&host, "child io failed"));

    let err = executor
        .run("uptime", &remote_ctx(), &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::CommandFailed { .. }));
    assert_eq!(executor.transport().calls().len(), 2); // connect + one exec
}

#[tokio::test]
async fn ssh_level_255_output_is_retried() {
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 255,
        stdout: vec![],
        stderr: b"ssh: connect to host web1 port 22: Connection refused\n".to_vec(),
    });

    let result = executor
        .run("uptime", &remote_ctx(), &RunOptions::default())
        .await
        .unwrap();
    assert_eq!(result.exit_code(), 0);
}

#[tokio::test]
async fn connection_is_reused_per_host() {
    let executor = executor();
    let ctx = remote_ctx();
    let other = ctx.with_host(HostDescriptor::new("web2"));

    for _ in 0..3 {
        executor.run("true", &ctx, &RunOptions::default()).await.unwrap();
    }
    executor.run("true", &other, &RunOptions::default()).await.unwrap();

    assert_eq!(executor.transport().connects(), 2);
    executor.close().await;
    assert_eq!(executor.transport().calls().last(), Some(&TransportCall::Close));
}

#[tokio::test]
async fn timeout_abandons_remote_command() {
    let executor = executor();
    executor.transport().set_delay(Duration::from_secs(5));
    let opts = RunOptions::default().with_timeout(Duration::from_millis(20));

    let err = executor
        .run("sleep 60", &remote_ctx(), &opts)
        .await
        .unwrap_err();

    let ExecError::Timeout { result, .. } = err else {
        panic!("expected Timeout");
    };
    assert!(result.timed_out());
}

fn refused() -> RemoteOutput {
    RemoteOutput {
        exit_code: 255,
        stdout: vec![],
        stderr: b"ssh: connect to host web1 port 22: Connection refused".to_vec(),
    }
}

#[tokio::test]
async fn exhausted_ssh_level_output_fails_despite_allow_failure() {
    let executor = executor();
    for _ in 0..3 {
        executor.transport().push_output(refused());
    }

    let err = executor
        .run("uptime", &remote_ctx(), &RunOptions::default().allow_failure())
        .await
        .unwrap_err();

    let ExecError::CommandFailed { result, .. } = err else {
        panic!("expected CommandFailed");
    };
    assert_eq!(result.exit_code(), 255);
    assert!(result.stderr_lossy().contains("Connection refused"));
    let execs = executor
        .transport()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, TransportCall::Exec { .. }))
        .count();
    assert_eq!(execs, 3);
}

#[tokio::test]
async fn ssh_level_output_drops_the_cached_connection() {
    let executor = executor();
    executor.transport().push_output(refused());

    executor
        .run("uptime", &remote_ctx(), &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(executor.transport().connects(), 2);
}

#[tokio::test]
async fn remote_program_exiting_255_keeps_connection() {
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 255,
        stdout: vec![],
        stderr: b"custom failure".to_vec(),
    });

    let result = executor
        .run("./check", &remote_ctx(), &RunOptions::default().allow_failure())
        .await
        .unwrap();
    executor.run("true", &remote_ctx(), &RunOptions::default()).await.unwrap();

    assert_eq!(result.exit_code(), 255);
    assert_eq!(executor.transport().connects(), 1);
}

#[test]
fn upload_line_handles_directory_targets() {
    let ctx = Context::new("/srv/app").with_host(HostDescriptor::new("web1"));
    assert_eq!(
        upload_command_line("releases", "app.tar", &ctx),
        "cd '/srv/app' && if [ -d 'releases' ]; then cat > 'releases'/'app.tar'; \
         else cat > 'releases'; fi"
    );
}

#[derive(Default)]
struct Recorder(std::sync::Mutex<Vec<TransferProgress>>);

impl TransferObserver for Recorder {
    fn notify(&self, progress: TransferProgress) {
        self.0.lock().unwrap().push(progress);
    }
}

fn source_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("app.tar");
    std::fs::write(&path, b"0123456789").unwrap();
    path
}

#[tokio::test]
async fn copy_uploads_and_reports_progress() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = source_file(&dir);
    let executor = executor();
    let progress = Recorder::default();

    let result = executor
        .copy(&source, "releases/", &remote_ctx(), &RunOptions::default(), &progress)
        .await
        .unwrap();

    let label = copy_label(&source, "releases/");
    assert_eq!(result.command(), label);
    assert!(matches!(
        executor.transport().calls().last(),
        Some(TransportCall::Upload { source: s, .. }) if *s == source
    ));
    assert_eq!(
        progress.0.into_inner().unwrap(),
        vec![
            TransferProgress::Started {
                label: label.clone(),
                size: 10
            },
            TransferProgress::Update {
                current: 10,
                total: 10
            },
            TransferProgress::Finished { label },
        ]
    );
}

#[tokio::test]
async fn copy_retries_connection_failures() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = source_file(&dir);
    let executor = executor();
    executor.transport().fail_connection("connection reset");

    executor
        .copy(&source, "/tmp", &remote_ctx(), &RunOptions::default(), &kit_core::NoProgress)
        .await
        .unwrap();

    let uploads = executor
        .transport()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, TransportCall::Upload { .. }))
        .count();
    assert_eq!(uploads, 2);
}

#[tokio::test]
async fn failed_remote_write_still_finishes_progress() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = source_file(&dir);
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 1,
        stdout: vec![],
        stderr: b"cat: /etc/app.tar: Permission denied".to_vec(),
    });
    let progress = Recorder::default();

    let err = executor
        .copy(&source, "/etc", &remote_ctx(), &RunOptions::default(), &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::CommandFailed { .. }));
    assert!(matches!(
        progress.0.into_inner().unwrap().last(),
        Some(TransferProgress::Finished { .. })
    ));
}

#[tokio::test]
async fn copy_of_missing_source_never_connects() {
    let executor = executor();
    let err = executor
        .copy(
            std::path::Path::new("/nonexistent/app.tar"),
            "/tmp",
            &remote_ctx(),
            &RunOptions::default(),
            &kit_core::NoProgress,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Transfer { .. }), "got {err:?}");
    assert!(executor.transport().calls().is_empty());
}

#[tokio::test]
async fn dry_run_copy_skips_transport() {
    let executor = executor();
    let result = executor
        .copy(
            std::path::Path::new("dist/app.tar"),
            "/tmp",
            &remote_ctx().with_dry_run(true),
            &RunOptions::default(),
            &kit_core::NoProgress,
        )
        .await
        .unwrap();

    assert_eq!(
        result.stdout_lossy(),
        "[dry-run] deploy@web1: copy dist/app.tar -> /tmp\n"
    );
    assert!(executor.transport().calls().is_empty());
}

#[tokio::test]
async fn path_exists_runs_test_remotely() {
    let executor = executor();
    executor.transport().push_output(RemoteOutput {
        exit_code: 1,
        ..RemoteOutput::default()
    });

    let exists = executor
        .path_exists("~/releases/current", &remote_ctx())
        .await
        .unwrap();

    assert!(!exists);
    assert!(matches!(
        executor.transport().calls().last(),
        Some(TransportCall::Exec { command_line, .. })
            if command_line.ends_with("sh -c 'test -e ~/'\\''releases/current'\\'''")
    ));
}
