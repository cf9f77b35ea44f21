// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Steps: the leaves of a pipeline

use crate::outcome::{FailureKind, StepFailure, StepOutcome};
use async_trait::async_trait;
use kit_adapters::CommandExecutor;
use kit_core::{
    copy_label, CommandResult, Context, NoProgress, RunOptions, Target, TransferObserver,
};
use kit_runbook::{interpolate, missing_vars, DEFAULT_MAX_CHECKS, DEFAULT_WAIT_INTERVAL};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// User-defined step body.
///
/// Receives the context and the run's executor. Cloud SDK clients are
/// reached through [`Context::capability`].
#[async_trait]
pub trait CustomAction: Send + Sync {
    /// One-line description shown by `show` and in dry-run reports
    fn describe(&self) -> String;

    async fn run(&self, ctx: &Context, executor: &dyn CommandExecutor) -> StepOutcome;
}

/// What a step (or its rollback hook) does
#[derive(Clone)]
pub enum Action {
    Shell {
        command: String,
        options: RunOptions,
    },
    /// Poll `command` until it exits 0
    WaitFor {
        command: String,
        interval: Duration,
        max_checks: u32,
        options: RunOptions,
    },
    /// Copy a local file to the target. Both ends accept `{var}` placeholders.
    Copy {
        source: String,
        destination: String,
        options: RunOptions,
    },
    Custom(Arc<dyn CustomAction>),
}

impl Action {
    pub fn shell(command: impl Into<String>) -> Self {
        Action::Shell {
            command: command.into(),
            options: RunOptions::default(),
        }
    }

    /// Human-readable form of the action
    pub fn describe(&self) -> String {
        match self {
            Action::Shell { command, .. } => command.clone(),
            Action::WaitFor {
                command,
                interval,
                max_checks,
                ..
            } => format!(
                "wait for `{}` (every {}, {} checks)",
                command,
                humantime::format_duration(*interval),
                max_checks
            ),
            Action::Copy {
                source,
                destination,
                ..
            } => copy_label(Path::new(source), destination),
            Action::Custom(action) => action.describe(),
        }
    }

    fn options(&self) -> Option<&RunOptions> {
        match self {
            Action::Shell { options, .. }
            | Action::WaitFor { options, .. }
            | Action::Copy { options, .. } => Some(options),
            Action::Custom(_) => None,
        }
    }

    fn options_mut(&mut self) -> Option<&mut RunOptions> {
        match self {
            Action::Shell { options, .. }
            | Action::WaitFor { options, .. }
            | Action::Copy { options, .. } => Some(options),
            Action::Custom(_) => None,
        }
    }

    pub async fn run(&self, ctx: &Context, executor: &dyn CommandExecutor) -> StepOutcome {
        self.run_observed(ctx, executor, &NoProgress).await
    }

    /// Like [`run`](Self::run), reporting copy progress to `progress`
    pub async fn run_observed(
        &self,
        ctx: &Context,
        executor: &dyn CommandExecutor,
        progress: &dyn TransferObserver,
    ) -> StepOutcome {
        match self {
            Action::Shell { command, options } => {
                let command = render(command, ctx);
                match executor.run(&command, ctx, options).await {
                    Ok(result) => StepOutcome::Success(Some(result)),
                    Err(e) => StepOutcome::Failed(StepFailure::from_exec(e, &command)),
                }
            }
            Action::WaitFor {
                command,
                interval,
                max_checks,
                options,
            } => wait_for(&render(command, ctx), *interval, *max_checks, options, ctx, executor).await,
            Action::Copy {
                source,
                destination,
                options,
            } => {
                let source = render(source, ctx);
                let destination = render(destination, ctx);
                let source = Path::new(&source);
                match executor
                    .copy(source, &destination, ctx, options, progress)
                    .await
                {
                    Ok(result) => StepOutcome::Success(Some(result)),
                    Err(e) => StepOutcome::Failed(StepFailure::from_exec(
                        e,
                        &copy_label(source, &destination),
                    )),
                }
            }
            Action::Custom(action) => action.run(ctx, executor).await,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shell { command, options } => f
                .debug_struct("Shell")
                .field("command", command)
                .field("options", options)
                .finish(),
            Action::WaitFor {
                command,
                interval,
                max_checks,
                options,
            } => f
                .debug_struct("WaitFor")
                .field("command", command)
                .field("interval", interval)
                .field("max_checks", max_checks)
                .field("options", options)
                .finish(),
            Action::Copy {
                source,
                destination,
                options,
            } => f
                .debug_struct("Copy")
                .field("source", source)
                .field("destination", destination)
                .field("options", options)
                .finish(),
            Action::Custom(action) => f.debug_tuple("Custom").field(&action.describe()).finish(),
        }
    }
}

fn render(template: &str, ctx: &Context) -> String {
    let vars = ctx.template_vars();
    let missing = missing_vars(template, &vars);
    if !missing.is_empty() {
        tracing::warn!(command = template, missing = ?missing, "undefined template variables");
    }
    interpolate(template, &vars)
}

async fn wait_for(
    command: &str,
    interval: Duration,
    max_checks: u32,
    options: &RunOptions,
    ctx: &Context,
    executor: &dyn CommandExecutor,
) -> StepOutcome {
    let checks = max_checks.max(1);
    let check_opts = options.clone().allow_failure();
    let mut last: Option<CommandResult> = None;

    for check in 1..=checks {
        match executor.run(command, ctx, &check_opts).await {
            Ok(result) if result.success() => return StepOutcome::Success(Some(result)),
            Ok(result) => last = Some(result),
            Err(e) if e.is_configuration() => {
                return StepOutcome::Failed(StepFailure::from_exec(e, command))
            }
            Err(e) => last = e.result().cloned(),
        }
        tracing::debug!(command, check, checks, "condition not met yet");
        if check < checks {
            tokio::time::sleep(interval).await;
        }
    }

    StepOutcome::Failed(StepFailure {
        kind: FailureKind::ConditionNotMet,
        message: format!("condition not met after {} checks: {}", checks, command),
        command: Some(command.to_string()),
        result: last,
    })
}

/// A named action with an optional rollback hook
#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    action: Action,
    rollback: Option<Action>,
    only: Option<Target>,
    creates: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            action,
            rollback: None,
            only: None,
            creates: None,
        }
    }

    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, Action::shell(command))
    }

    pub fn wait_for(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(
            name,
            Action::WaitFor {
                command: command.into(),
                interval: DEFAULT_WAIT_INTERVAL,
                max_checks: DEFAULT_MAX_CHECKS,
                options: RunOptions::default(),
            },
        )
    }

    pub fn copy(
        name: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            Action::Copy {
                source: source.into(),
                destination: destination.into(),
                options: RunOptions::default(),
            },
        )
    }

    pub fn custom(name: impl Into<String>, action: impl CustomAction + 'static) -> Self {
        Self::new(name, Action::Custom(Arc::new(action)))
    }

    /// Shell rollback hook. Inherits the step's `local` option.
    pub fn with_rollback(mut self, command: impl Into<String>) -> Self {
        let local = self.action.options_mut().is_some_and(|o| o.local);
        let options = RunOptions {
            local,
            ..RunOptions::default()
        };
        self.rollback = Some(Action::Shell {
            command: command.into(),
            options,
        });
        self
    }

    pub fn with_rollback_action(mut self, action: Action) -> Self {
        self.rollback = Some(action);
        self
    }

    /// Set the polling schedule of a `wait_for` step
    pub fn checks(mut self, every: Duration, max: u32) -> Self {
        if let Action::WaitFor {
            interval,
            max_checks,
            ..
        } = &mut self.action
        {
            *interval = every;
            *max_checks = max;
        }
        self
    }

    pub fn allow_failure(mut self) -> Self {
        if let Some(options) = self.action.options_mut() {
            options.allow_failure = true;
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        if let Some(options) = self.action.options_mut() {
            options.timeout = Some(timeout);
        }
        self
    }

    /// Run on the local machine even when the context targets a host
    pub fn local(mut self) -> Self {
        if let Some(options) = self.action.options_mut() {
            options.local = true;
        }
        if let Some(options) = self.rollback.as_mut().and_then(Action::options_mut) {
            options.local = true;
        }
        self
    }

    /// Restrict the step to local or remote contexts
    pub fn only(mut self, target: Target) -> Self {
        self.only = Some(target);
        self
    }

    /// Skip the step when `path` already exists where it would run
    pub fn creates(mut self, path: impl Into<String>) -> Self {
        self.creates = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn rollback(&self) -> Option<&Action> {
        self.rollback.as_ref()
    }

    pub fn target(&self) -> Option<Target> {
        self.only
    }

    pub fn created_path(&self) -> Option<&str> {
        self.creates.as_deref()
    }

    pub async fn execute(&self, ctx: &Context, executor: &dyn CommandExecutor) -> StepOutcome {
        self.execute_observed(ctx, executor, &NoProgress).await
    }

    /// Run the step, reporting copy progress to `progress`
    pub async fn execute_observed(
        &self,
        ctx: &Context,
        executor: &dyn CommandExecutor,
        progress: &dyn TransferObserver,
    ) -> StepOutcome {
        if let Some(target) = self.only {
            if !target.matches(ctx.is_remote()) {
                return StepOutcome::Skipped(format!("only runs on {} targets", target));
            }
        }
        if let Some(creates) = &self.creates {
            let path = render(creates, ctx);
            let local = self.action.options().is_some_and(|o| o.local);
            let exists = if local {
                executor.path_exists(&path, &ctx.without_host()).await
            } else {
                executor.path_exists(&path, ctx).await
            };
            match exists {
                Ok(true) => return StepOutcome::Skipped(format!("{} already exists", path)),
                Ok(false) => {}
                Err(e) => {
                    return StepOutcome::Failed(StepFailure::from_exec(
                        e,
                        &format!("test -e {}", path),
                    ))
                }
            }
        }
        self.action.run_observed(ctx, executor, progress).await
    }

    /// Run the rollback hook, if any
    pub async fn execute_rollback(
        &self,
        ctx: &Context,
        executor: &dyn CommandExecutor,
    ) -> Option<StepOutcome> {
        match &self.rollback {
            Some(action) => Some(action.run(ctx, executor).await),
            None => None,
        }
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
