// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution errors

use crate::command::CommandResult;
use thiserror::Error;

/// Errors returned by command executors
#[derive(Debug, Error)]
pub enum ExecError {
    /// Missing or malformed configuration, such as a remote run without a host.
    /// Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The command exited non-zero and failure was not suppressed
    #[error("command failed with exit code {}: {command}", result.exit_code())]
    CommandFailed {
        command: String,
        result: CommandResult,
    },

    #[error("command timed out: {command}")]
    Timeout {
        command: String,
        result: CommandResult,
    },

    /// A local file could not be read or written while copying
    #[error("{label} failed: {message}")]
    Transfer { label: String, message: String },

    #[error("failed to spawn shell: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ExecError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transfer(label: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transfer {
            label: label.into(),
            message: message.to_string(),
        }
    }

    /// The captured result, when the command actually ran
    pub fn result(&self) -> Option<&CommandResult> {
        match self {
            ExecError::CommandFailed { result, .. } | ExecError::Timeout { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ExecError::Configuration(_))
    }
}
