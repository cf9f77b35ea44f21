// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess executor

use super::{check_exit, exit_code_of, CommandExecutor};
use async_trait::async_trait;
use kit_core::{
    copy_label, CommandResult, Context, ExecError, RunOptions, TransferObserver,
    TransferProgress,
};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// How long to wait for output pipes to drain after killing a timed-out group
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runs commands through `sh -c` on this machine.
///
/// Each command gets its own process group so a timeout can kill everything
/// it started, not just the shell.
#[derive(Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        if ctx.dry_run() {
            return Ok(CommandResult::dry_run(
                command,
                format!("[dry-run] {}", command),
            ));
        }

        let start = Instant::now();
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(ctx.working_dir())
            .envs(ctx.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match opts.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => None,
            },
            None => Some(child.wait().await?),
        };

        let Some(status) = status else {
            if let Some(pid) = child.id() {
                // Group id equals the shell's pid because of process_group(0)
                let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
            let _ = child.kill().await;
            let stdout = collect(stdout, true).await;
            let stderr = collect(stderr, true).await;
            tracing::warn!(command, "command timed out, process group killed");
            return check_exit(
                CommandResult::timeout(command, stdout, stderr, start.elapsed()),
                opts,
            );
        };

        let stdout = collect(stdout, false).await;
        let stderr = collect(stderr, false).await;
        let result = CommandResult::new(
            command,
            exit_code_of(status),
            stdout,
            stderr,
            start.elapsed(),
        );
        check_exit(result, opts)
    }

    async fn copy(
        &self,
        source: &Path,
        destination: &str,
        ctx: &Context,
        opts: &RunOptions,
        progress: &dyn TransferObserver,
    ) -> Result<CommandResult, ExecError> {
        let label = copy_label(source, destination);
        if ctx.dry_run() {
            return Ok(CommandResult::dry_run(&label, format!("[dry-run] {}", label)));
        }

        let start = Instant::now();
        let source = ctx.working_dir().join(source);
        let size = tokio::fs::metadata(&source)
            .await
            .map_err(|e| ExecError::transfer(&label, e))?
            .len();
        let target = copy_target(&source, ctx.working_dir().join(destination)).await;

        progress.notify(TransferProgress::Started {
            label: label.clone(),
            size,
        });
        let copied = match opts.timeout {
            Some(limit) => tokio::time::timeout(limit, tokio::fs::copy(&source, &target))
                .await
                .ok(),
            None => Some(tokio::fs::copy(&source, &target).await),
        };
        if let Some(Ok(bytes)) = &copied {
            progress.notify(TransferProgress::Update {
                current: *bytes,
                total: size,
            });
        }
        progress.notify(TransferProgress::Finished {
            label: label.clone(),
        });

        match copied {
            Some(Ok(_)) => Ok(CommandResult::new(&label, 0, vec![], vec![], start.elapsed())),
            Some(Err(e)) => Err(ExecError::transfer(&label, e)),
            None => check_exit(
                CommandResult::timeout(&label, vec![], vec![], start.elapsed()),
                opts,
            ),
        }
    }

    async fn path_exists(&self, path: &str, ctx: &Context) -> Result<bool, ExecError> {
        if ctx.dry_run() {
            return Ok(false);
        }
        Ok(tokio::fs::try_exists(ctx.working_dir().join(path)).await?)
    }
}

/// An existing directory receives the file under its own name
async fn copy_target(source: &Path, destination: PathBuf) -> PathBuf {
    let is_dir = tokio::fs::metadata(&destination)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    match source.file_name() {
        Some(name) if is_dir => destination.join(name),
        _ => destination,
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        buf
    })
}

async fn collect(handle: JoinHandle<Vec<u8>>, killed: bool) -> Vec<u8> {
    if killed {
        // A detached grandchild may still hold the pipe open
        match tokio::time::timeout(DRAIN_GRACE, handle).await {
            Ok(Ok(buf)) => buf,
            _ => Vec::new(),
        }
    } else {
        handle.await.unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
