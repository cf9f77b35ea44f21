// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced executor wrapper for consistent observability

use crate::executor::CommandExecutor;
use async_trait::async_trait;
use kit_core::{CommandResult, Context, ExecError, RunOptions, TransferObserver};
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any CommandExecutor
#[derive(Clone)]
pub struct TracedExecutor<E> {
    inner: E,
}

impl<E> TracedExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: CommandExecutor> CommandExecutor for TracedExecutor<E> {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        let local = opts.local || ctx.host().is_none();
        let host = ctx.host().filter(|_| !local).map(|h| h.to_string());
        let span = tracing::info_span!(
            "exec.run",
            command,
            host = host.as_deref().unwrap_or("local"),
            dry_run = ctx.dry_run(),
        );

        async move {
            tracing::debug!(
                cwd = %ctx.working_dir().display(),
                env_count = ctx.env().len(),
                timeout_ms = opts.timeout.map(|t| t.as_millis() as u64),
                "starting"
            );

            // Precondition: local cwd must exist
            if local && !ctx.dry_run() && !ctx.working_dir().is_dir() {
                tracing::error!("working directory does not exist");
                return Err(ExecError::configuration(format!(
                    "working directory does not exist: {}",
                    ctx.working_dir().display()
                )));
            }

            let start = std::time::Instant::now();
            let result = self.inner.run(command, ctx, opts).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(r) => tracing::info!(elapsed_ms, exit_code = r.exit_code(), "finished"),
                Err(ExecError::Configuration(message)) => {
                    tracing::error!(elapsed_ms, error = %message, "configuration error")
                }
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn copy(
        &self,
        source: &Path,
        destination: &str,
        ctx: &Context,
        opts: &RunOptions,
        progress: &dyn TransferObserver,
    ) -> Result<CommandResult, ExecError> {
        let local = opts.local || ctx.host().is_none();
        let host = ctx.host().filter(|_| !local).map(|h| h.to_string());
        let span = tracing::info_span!(
            "exec.copy",
            source = %source.display(),
            destination,
            host = host.as_deref().unwrap_or("local"),
            dry_run = ctx.dry_run(),
        );

        async move {
            let start = std::time::Instant::now();
            let result = self
                .inner
                .copy(source, destination, ctx, opts, progress)
                .await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "copied"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "copy failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn path_exists(&self, path: &str, ctx: &Context) -> Result<bool, ExecError> {
        let exists = self.inner.path_exists(path, ctx).await;
        tracing::debug!(path, exists = ?exists.as_ref().ok(), "checked path");
        exists
    }

    async fn mkdtemp(&self, prefix: &str, ctx: &Context) -> Result<String, ExecError> {
        let dir = self.inner.mkdtemp(prefix, ctx).await?;
        tracing::debug!(dir, "created temporary directory");
        Ok(dir)
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
