// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote executor: prepares a shell line and hands it to a transport

use super::{check_exit, CommandExecutor};
use crate::shell::{quote_always, quote_arg, quote_path};
use crate::transport::{
    is_transient_output, RemoteOutput, RemoteTransport, TransportError, SSH_ERROR_EXIT_CODE,
};
use async_trait::async_trait;
use kit_core::{
    copy_label, CommandResult, Context, ExecError, HostDescriptor, RetryPolicy, RunOptions,
    TransferObserver, TransferProgress,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs commands on `ctx.host()` through a [`RemoteTransport`].
///
/// Transient connection failures are retried per the [`RetryPolicy`]. Once
/// retries run out the failure is reported as [`ExecError::CommandFailed`]
/// with exit code 255 and the connection message as stderr.
///
/// A timeout abandons the local side of the session; the remote process is
/// not guaranteed to stop.
pub struct RemoteExecutor<T> {
    transport: Arc<T>,
    retry: RetryPolicy,
}

impl<T> Clone for RemoteExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            retry: self.retry,
        }
    }
}

impl<T: RemoteTransport> RemoteExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Close the transport's cached connections
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

/// Build `cd <dir> && env K=V … sh -c <command>` for the remote shell
pub fn remote_command_line(command: &str, ctx: &Context) -> String {
    let mut line = format!(
        "cd {} && ",
        quote_path(&ctx.working_dir().to_string_lossy())
    );
    if !ctx.env().is_empty() {
        line.push_str("env ");
        for (key, value) in ctx.env() {
            line.push_str(&quote_arg(&format!("{}={}", key, value)));
            line.push(' ');
        }
    }
    line.push_str("sh -c ");
    line.push_str(&quote_always(command));
    line
}

/// Build the shell line that writes stdin to `destination`, or into it when it
/// is a directory
pub fn upload_command_line(destination: &str, file_name: &str, ctx: &Context) -> String {
    let target = quote_path(destination);
    format!(
        "cd {} && if [ -d {target} ]; then cat > {target}/{}; else cat > {target}; fi",
        quote_path(&ctx.working_dir().to_string_lossy()),
        quote_always(file_name),
    )
}

impl<T: RemoteTransport> RemoteExecutor<T> {
    /// Drive one transport call through the retry policy.
    ///
    /// Returns `None` when `timeout` expired, otherwise the last outcome and
    /// whether it was a connection-level failure.
    async fn attempt<F, Fut>(
        &self,
        host: &HostDescriptor,
        timeout: Option<Duration>,
        mut call: F,
    ) -> Option<(Result<RemoteOutput, TransportError>, bool)>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<RemoteOutput, TransportError>> + Send,
    {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, call()).await.ok()?,
                None => call().await,
            };

            let retryable = match &outcome {
                Ok(output) => is_transient_output(output),
                Err(e) => e.is_transient(),
            };
            if retryable && attempt < attempts {
                let delay = self.retry.delay_after(attempt);
                tracing::warn!(
                    %host,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            return Some((outcome, retryable));
        }
    }
}

/// Turn the final transport outcome into a command result.
///
/// A connection-level failure is always an error; `allow_failure` only covers
/// the remote command's own exit code.
fn settle(
    command: &str,
    outcome: Result<RemoteOutput, TransportError>,
    retryable: bool,
    opts: &RunOptions,
    start: Instant,
) -> Result<CommandResult, ExecError> {
    match outcome {
        Ok(output) if retryable => Err(ExecError::CommandFailed {
            command: command.to_string(),
            result: CommandResult::new(
                command,
                SSH_ERROR_EXIT_CODE,
                output.stdout,
                output.stderr,
                start.elapsed(),
            ),
        }),
        Ok(output) => check_exit(
            CommandResult::new(
                command,
                output.exit_code,
                output.stdout,
                output.stderr,
                start.elapsed(),
            ),
            opts,
        ),
        Err(e) => Err(ExecError::CommandFailed {
            command: command.to_string(),
            result: CommandResult::new(
                command,
                SSH_ERROR_EXIT_CODE,
                vec![],
                e.to_string().into_bytes(),
                start.elapsed(),
            ),
        }),
    }
}

fn require_host<'a>(ctx: &'a Context, what: &str) -> Result<&'a HostDescriptor, ExecError> {
    ctx.host().ok_or_else(|| {
        ExecError::configuration(format!("remote execution of '{}' requires a host", what))
    })
}

#[async_trait]
impl<T: RemoteTransport> CommandExecutor for RemoteExecutor<T> {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        let host = require_host(ctx, command)?;
        if ctx.dry_run() {
            return Ok(CommandResult::dry_run(
                command,
                format!("[dry-run] {}: {}", host, command),
            ));
        }

        let line = remote_command_line(command, ctx);
        let start = Instant::now();
        let transport = &self.transport;
        match self
            .attempt(host, opts.timeout, || transport.exec(host, &line))
            .await
        {
            Some((outcome, retryable)) => settle(command, outcome, retryable, opts, start),
            None => {
                tracing::warn!(%host, command, "remote command timed out");
                check_exit(
                    CommandResult::timeout(command, vec![], vec![], start.elapsed()),
                    opts,
                )
            }
        }
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
        let host = require_host(ctx, &label)?;
        if ctx.dry_run() {
            return Ok(CommandResult::dry_run(
                &label,
                format!("[dry-run] {}: {}", host, label),
            ));
        }

        // Relative sources are read from the invoking directory
        let size = tokio::fs::metadata(source)
            .await
            .map_err(|e| ExecError::transfer(&label, e))?
            .len();
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ExecError::transfer(&label, "source has no file name"))?;
        let line = upload_command_line(destination, &file_name, ctx);

        progress.notify(TransferProgress::Started {
            label: label.clone(),
            size,
        });
        let start = Instant::now();
        let transport = &self.transport;
        let outcome = self
            .attempt(host, opts.timeout, || {
                transport.upload(host, &line, source, progress)
            })
            .await;
        progress.notify(TransferProgress::Finished {
            label: label.clone(),
        });

        match outcome {
            Some((outcome, retryable)) => settle(&label, outcome, retryable, opts, start),
            None => {
                tracing::warn!(%host, %label, "upload timed out");
                check_exit(
                    CommandResult::timeout(&label, vec![], vec![], start.elapsed()),
                    opts,
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
