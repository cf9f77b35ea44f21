// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! This module provides enhanced error types that include:
//! - What went wrong (message)
//! - Why it might have happened (context)
//! - How to fix it (suggestions)
//! - Which exit code the process should end with

use kit_engine::{RegistryError, RunError};
use kit_runbook::{LoadError, StageError};
use std::fmt;
use std::process::ExitCode;

/// Process exit statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success = 0,
    Generic = 1,
    UnknownTask = 2,
    /// A command failed, timed out, or the pipeline failed
    Failed = 3,
    /// Parse, validation or setup problem, including missing hosts
    Configuration = 4,
    Cancelled = 130,
}

impl Exit {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct KitError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    pub exit: Exit,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl KitError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>, exit: Exit) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            exit,
            source: None,
        }
    }

    /// Add context about why this error might have happened.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    /// Add a suggestion for how to fix this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Set the source error that caused this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for KitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for KitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<LoadError> for KitError {
    fn from(err: LoadError) -> Self {
        let mut lines = err.to_string().lines().map(str::to_string).collect::<Vec<_>>();
        let message = if lines.is_empty() {
            "failed to load configuration".to_string()
        } else {
            lines.remove(0)
        };
        let mut error = KitError::new(message, Exit::Configuration);
        for line in lines {
            error = error.with_context(line.trim().to_string());
        }
        match err {
            LoadError::NotFound(_) => error
                .with_suggestion("Create a kit.toml in the project root")
                .with_suggestion("Point at a file explicitly: kit --config path/to/kit.toml"),
            _ => error.with_suggestion("Validate the configuration: kit check"),
        }
    }
}

impl From<StageError> for KitError {
    fn from(err: StageError) -> Self {
        let error = KitError::new(err.to_string(), Exit::Configuration);
        match err {
            StageError::Unknown { available, .. } if !available.is_empty() => error
                .with_suggestion(format!("Use one of: {}", available.join(", "))),
            StageError::NoDefault(_) => error
                .with_suggestion("Pick a stage with --stage NAME")
                .with_suggestion("Mark one stage with `default = true`"),
            StageError::UnknownStack { available, .. } if available.is_empty() => {
                error.with_context("the runbook defines no [stack.NAME] tables")
            }
            StageError::UnknownStack { available, .. } => {
                error.with_suggestion(format!("Use one of: {}", available.join(", ")))
            }
            _ => error,
        }
    }
}

impl From<RegistryError> for KitError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownTask { name, suggestions } => {
                let mut error = KitError::new(format!("unknown task '{}'", name), Exit::UnknownTask);
                for suggestion in suggestions {
                    error = error.with_suggestion(format!("Did you mean: kit run {}", suggestion));
                }
                error.with_suggestion("List available tasks: kit list --all")
            }
            other => KitError::new(other.to_string(), Exit::Configuration),
        }
    }
}

impl From<RunError> for KitError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::Registry(e) => e.into(),
            RunError::Stage(e) => e.into(),
            RunError::Load(e) => e.into(),
            RunError::TaskFiltered {
                task,
                stage,
                reason,
            } => KitError::new(
                format!("task '{}' cannot run on stage '{}'", task, stage),
                Exit::Configuration,
            )
            .with_context(reason)
            .with_suggestion(format!("Show where it runs: kit show {}", task)),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
