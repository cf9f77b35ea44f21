// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step outcomes

use kit_core::{CommandResult, ExecError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CommandFailed,
    Timeout,
    /// Missing host, bad working directory, shell not startable. Aborts the whole run.
    Configuration,
    /// A `wait_for` check never succeeded
    ConditionNotMet,
    /// A custom action reported failure
    Action,
    /// A copy could not read or write a local file
    Transfer,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            command: None,
            result: None,
        }
    }

    /// Classify an executor error for `command`
    pub fn from_exec(err: ExecError, command: &str) -> Self {
        let message = err.to_string();
        let (kind, result) = match err {
            ExecError::Configuration(_) => (FailureKind::Configuration, None),
            ExecError::Spawn(_) => (FailureKind::Configuration, None),
            ExecError::CommandFailed { result, .. } => (FailureKind::CommandFailed, Some(result)),
            ExecError::Timeout { result, .. } => (FailureKind::Timeout, Some(result)),
            ExecError::Transfer { .. } => (FailureKind::Transfer, None),
        };
        Self {
            kind,
            message,
            command: Some(command.to_string()),
            result,
        }
    }

    /// Configuration failures stop the invocation regardless of policy
    pub fn is_fatal(&self) -> bool {
        self.kind == FailureKind::Configuration
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result of running one step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Completed; carries the command result when the step ran a command
    Success(Option<CommandResult>),
    Skipped(String),
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        StepOutcome::Failed(StepFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Failed(f) if f.is_fatal())
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            StepOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }

    /// The command result, whether the step succeeded or failed
    pub fn result(&self) -> Option<&CommandResult> {
        match self {
            StepOutcome::Success(result) => result.as_ref(),
            StepOutcome::Failed(f) => f.result.as_ref(),
            StepOutcome::Skipped(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Success(_) => "success",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::Failed(_) => "failed",
        }
    }
}

impl Serialize for StepOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", self.label())?;
        match self {
            StepOutcome::Success(Some(result)) => map.serialize_entry("result", result)?,
            StepOutcome::Success(None) => {}
            StepOutcome::Skipped(reason) => map.serialize_entry("reason", reason)?,
            StepOutcome::Failed(failure) => map.serialize_entry("failure", failure)?,
        }
        map.end()
    }
}
