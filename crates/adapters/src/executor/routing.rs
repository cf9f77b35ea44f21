// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor that picks local or remote per call

use super::CommandExecutor;
use async_trait::async_trait;
use kit_core::{CommandResult, Context, ExecError, RunOptions, TransferObserver};
use std::path::Path;

/// Sends a command to `remote` when the context has a host, else to `local`.
///
/// `RunOptions::local` forces the local executor; the host is cleared from the
/// context handed to it.
#[derive(Clone)]
pub struct RoutingExecutor<L, R> {
    local: L,
    remote: R,
}

impl<L, R> RoutingExecutor<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }
}

#[async_trait]
impl<L: CommandExecutor, R: CommandExecutor> CommandExecutor for RoutingExecutor<L, R> {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        if ctx.host().is_none() {
            return self.local.run(command, ctx, opts).await;
        }
        if opts.local {
            return self.local.run(command, &ctx.without_host(), opts).await;
        }
        self.remote.run(command, ctx, opts).await
    }

    async fn copy(
        &self,
        source: &Path,
        destination: &str,
        ctx: &Context,
        opts: &RunOptions,
        progress: &dyn TransferObserver,
    ) -> Result<CommandResult, ExecError> {
        if ctx.host().is_none() {
            return self.local.copy(source, destination, ctx, opts, progress).await;
        }
        if opts.local {
            let ctx = ctx.without_host();
            return self.local.copy(source, destination, &ctx, opts, progress).await;
        }
        self.remote.copy(source, destination, ctx, opts, progress).await
    }

    async fn path_exists(&self, path: &str, ctx: &Context) -> Result<bool, ExecError> {
        match ctx.host() {
            Some(_) => self.remote.path_exists(path, ctx).await,
            None => self.local.path_exists(path, ctx).await,
        }
    }

    async fn mkdtemp(&self, prefix: &str, ctx: &Context) -> Result<String, ExecError> {
        match ctx.host() {
            Some(_) => self.remote.mkdtemp(prefix, ctx).await,
            None => self.local.mkdtemp(prefix, ctx).await,
        }
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
