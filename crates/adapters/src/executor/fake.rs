// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake executor for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{check_exit, CommandExecutor};
use async_trait::async_trait;
use kit_core::{
    copy_label, CancelFlag, CommandResult, Context, ExecError, HostDescriptor, RunOptions,
    TransferObserver, TransferProgress,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded executor call
#[derive(Debug, Clone)]
pub struct ExecCall {
    pub command: String,
    pub working_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub host: Option<HostDescriptor>,
    pub dry_run: bool,
    pub opts: RunOptions,
}

#[derive(Clone)]
enum Response {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Timeout,
    Configuration(String),
}

#[derive(Clone)]
struct Rule {
    pattern: String,
    response: Response,
}

#[derive(Default)]
struct FakeExecutorState {
    calls: Vec<ExecCall>,
    rules: Vec<Rule>,
    cancel_triggers: Vec<(String, CancelFlag)>,
    delay: Option<Duration>,
    running: usize,
    max_running: usize,
}

/// Executor that records every call and answers from scripted rules.
///
/// Rules match when the command contains the pattern; the first match wins.
/// Unmatched commands succeed with empty output. Dry-run contexts and
/// `allow_failure` behave like the real executors.
///
/// Copies are recorded as a call whose command is the copy label
/// (`copy <source> -> <destination>`) and answer from the same rules.
/// `path_exists` and `mkdtemp` go through `run` as `test -e …` and `mktemp …`.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    inner: Arc<Mutex<FakeExecutorState>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ExecCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Commands in the order they were attempted
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Highest number of commands observed running at once
    pub fn max_concurrency(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).max_running
    }

    fn add_rule(&self, pattern: &str, response: Response) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rules
            .push(Rule {
                pattern: pattern.to_string(),
                response,
            });
    }

    /// Exit with `code` for commands containing `pattern`
    pub fn fail_on(&self, pattern: &str, code: i32) {
        self.fail_with(pattern, code, "");
    }

    pub fn fail_with(&self, pattern: &str, code: i32, stderr: &str) {
        self.add_rule(
            pattern,
            Response::Exit {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        );
    }

    /// Succeed with `stdout` for commands containing `pattern`
    pub fn respond(&self, pattern: &str, stdout: &str) {
        self.add_rule(
            pattern,
            Response::Exit {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    pub fn timeout_on(&self, pattern: &str) {
        self.add_rule(pattern, Response::Timeout);
    }

    pub fn configuration_error_on(&self, pattern: &str, message: &str) {
        self.add_rule(pattern, Response::Configuration(message.to_string()));
    }

    /// Trip `flag` when a command containing `pattern` runs
    pub fn cancel_on(&self, pattern: &str, flag: CancelFlag) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel_triggers
            .push((pattern.to_string(), flag));
    }

    /// Make every command take `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).delay = Some(delay);
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn run(
        &self,
        command: &str,
        ctx: &Context,
        opts: &RunOptions,
    ) -> Result<CommandResult, ExecError> {
        let (response, delay) = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            state.calls.push(ExecCall {
                command: command.to_string(),
                working_dir: ctx.working_dir().to_path_buf(),
                env: ctx.env().clone(),
                host: ctx.host().cloned(),
                dry_run: ctx.dry_run(),
                opts: opts.clone(),
            });
            for (pattern, flag) in &state.cancel_triggers {
                if command.contains(pattern.as_str()) {
                    flag.cancel();
                }
            }
            let response = state
                .rules
                .iter()
                .find(|r| command.contains(r.pattern.as_str()))
                .map(|r| r.response.clone());
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            (response, state.delay)
        };

        if let Some(delay) = delay {
            if !ctx.dry_run() {
                tokio::time::sleep(delay).await;
            }
        }
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).running -= 1;

        if ctx.dry_run() {
            return Ok(CommandResult::dry_run(
                command,
                format!("[dry-run] {}", command),
            ));
        }

        let result = match response {
            None => CommandResult::new(command, 0, vec![], vec![], Duration::ZERO),
            Some(Response::Exit {
                code,
                stdout,
                stderr,
            }) => CommandResult::new(
                command,
                code,
                stdout.into_bytes(),
                stderr.into_bytes(),
                Duration::ZERO,
            ),
            Some(Response::Timeout) => {
                CommandResult::timeout(command, vec![], vec![], opts.timeout.unwrap_or_default())
            }
            Some(Response::Configuration(message)) => {
                return Err(ExecError::Configuration(message))
            }
        };
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
            return self.run(&label, ctx, opts).await;
        }
        progress.notify(TransferProgress::Started {
            label: label.clone(),
            size: 0,
        });
        let result = self.run(&label, ctx, opts).await;
        progress.notify(TransferProgress::Finished {
            label: label.clone(),
        });
        result
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
