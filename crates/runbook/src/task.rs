// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and step definitions

use kit_core::{FailurePolicy, Target};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default pause between `wait_for` checks
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);
/// Default number of `wait_for` checks
pub const DEFAULT_MAX_CHECKS: u32 = 10;

/// A task definition from the runbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDef {
    pub name: String,
    pub description: Option<String>,
    pub on_failure: FailurePolicy,
    /// Working directory, relative to the stage's base directory
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub vars: BTreeMap<String, Value>,
    /// Only offer this task on local or remote stages
    pub only: Option<Target>,
    /// Only offer this task on the named stages (empty means all)
    pub stages: Vec<String>,
    /// Only offer this task when one of these stacks is selected (empty means any)
    pub stacks: Vec<String>,
    pub pre: Option<String>,
    pub post: Option<String>,
    pub steps: Vec<StepDef>,
}

impl TaskDef {
    /// Names of other tasks this task references, in declaration order
    pub fn task_refs(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match &s.action {
                StepAction::Task(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// One entry of a task's `step` array
#[derive(Debug, Clone, PartialEq)]
pub struct StepDef {
    pub name: String,
    pub action: StepAction,
    /// Command that undoes this step under the rollback policy
    pub rollback: Option<String>,
    pub allow_failure: bool,
    pub timeout: Option<Duration>,
    /// Run on this machine even on a remote stage
    pub local: bool,
    pub only: Option<Target>,
    /// Skip the step when this path already exists on the target
    pub creates: Option<String>,
}

impl StepDef {
    pub fn run(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: StepAction::Run(command.into()),
            rollback: None,
            allow_failure: false,
            timeout: None,
            local: false,
            only: None,
            creates: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Shell command
    Run(String),
    /// Nested pipeline: another task by name
    Task(String),
    /// Unordered group run on a bounded worker pool
    Parallel {
        steps: Vec<StepDef>,
        max_workers: Option<usize>,
    },
    /// Poll a check command until it exits 0
    WaitFor {
        command: String,
        interval: Duration,
        max_checks: u32,
    },
    /// Copy a local file to the target (an upload on remote stages)
    Copy { source: String, destination: String },
}

impl StepAction {
    pub fn kind(&self) -> &'static str {
        match self {
            StepAction::Run(_) => "run",
            StepAction::Task(_) => "task",
            StepAction::Parallel { .. } => "parallel",
            StepAction::WaitFor { .. } => "wait_for",
            StepAction::Copy { .. } => "copy",
        }
    }
}
