// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command executors

mod local;
mod remote;
mod routing;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use local::LocalExecutor;
pub use remote::{remote_command_line, upload_command_line, RemoteExecutor};
pub use routing::RoutingExecutor;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeExecutor};

use crate::shell::{quote_arg, quote_path};
use async_trait::async_trait;
use kit_core::{CommandResult, Context, ExecError, RunOptions, TransferObserver};
use std::path::Path;
use std::process::ExitStatus;

/// Runs one shell command under a [`Context`].
///
/// Implementations honour `ctx.dry_run()` by returning a synthetic result
/// without executing anything, and fail with [`ExecError::CommandFailed`] on a
/// non-zero exit unless `opts.allow_failure` is set. Timeouts always fail.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError>;

    /// Copy a local file to `destination` on the context's target.
    ///
    /// A relative `destination` is taken from `ctx.working_dir()`; an existing
    /// directory receives the file under its own name. Progress goes to
    /// `progress`, which always sees a `Finished` once `Started` was sent.
    async fn copy(
        &self,
        source: &Path,
        destination: &str,
        ctx: &Context,
        opts: &RunOptions,
        progress: &dyn TransferObserver,
    ) -> Result<CommandResult, ExecError>;

    /// Whether `path` exists on the context's target. Dry runs report `false`.
    async fn path_exists(&self, path: &str, ctx: &Context) -> Result<bool, ExecError> {
        if ctx.dry_run() {
            return Ok(false);
        }
        let command = format!("test -e {}", quote_path(path));
        let result = self
            .run(&command, ctx, &RunOptions::default().allow_failure())
            .await?;
        Ok(result.exit_code() == 0)
    }

    /// Create a fresh temporary directory and return its path.
    ///
    /// The caller removes it. Dry runs return the `mktemp` template unchanged.
    async fn mkdtemp(&self, prefix: &str, ctx: &Context) -> Result<String, ExecError> {
        let template = format!("{}XXXXXXXX", prefix);
        if ctx.dry_run() {
            return Ok(format!("/tmp/{}", template));
        }
        let command = format!("mktemp -d \"${{TMPDIR:-/tmp}}\"/{}", quote_arg(&template));
        let result = self.run(&command, ctx, &RunOptions::default()).await?;
        Ok(result.stdout_lossy().trim_end().to_string())
    }
}

#[async_trait]
impl<E: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<E> {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        (**self).run(command, ctx, opts).await
    }

    async fn copy(
        &self,
        source: &Path,
        destination: &str,
        ctx: &Context,
        opts: &RunOptions,
        progress: &dyn TransferObserver,
    ) -> Result<CommandResult, ExecError> {
        (**self).copy(source, destination, ctx, opts, progress).await
    }

    async fn path_exists(&self, path: &str, ctx: &Context) -> Result<bool, ExecError> {
        (**self).path_exists(path, ctx).await
    }

    async fn mkdtemp(&self, prefix: &str, ctx: &Context) -> Result<String, ExecError> {
        (**self).mkdtemp(prefix, ctx).await
    }
}

/// Apply the non-zero exit rule to a completed command
pub(crate) fn check_exit(
    result: CommandResult,
    opts: &RunOptions,
) -> Result<CommandResult, ExecError> {
    if result.timed_out() {
        return Err(ExecError::Timeout {
            command: result.command().to_string(),
            result,
        });
    }
    if result.exit_code() != 0 && !opts.allow_failure {
        return Err(ExecError::CommandFailed {
            command: result.command().to_string(),
            result,
        });
    }
    Ok(result)
}

/// Exit code of a finished process; signals map to `128 + signo`
pub(crate) fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
