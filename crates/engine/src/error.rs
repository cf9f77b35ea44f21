// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for task lookup and run preparation

use kit_runbook::{LoadError, StageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task already registered: {0}")]
    DuplicateTask(String),
    #[error("unknown task: {name}")]
    UnknownTask {
        name: String,
        suggestions: Vec<String>,
    },
    #[error("task references form a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Errors raised before any step of a run executes
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("task '{task}' is not enabled for stage '{stage}': {reason}")]
    TaskFiltered {
        task: String,
        stage: String,
        reason: String,
    },
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Load(#[from] LoadError),
}
