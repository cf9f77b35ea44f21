// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod check;
pub mod list;
pub mod run;
pub mod show;

use crate::error::{Exit, KitError};
use crate::output::OutputFormat;
use kit_engine::TaskRegistry;
use kit_runbook::{load_project, Project};
use std::path::PathBuf;

/// Options shared by every subcommand
#[derive(Debug, Clone)]
pub struct Globals {
    pub config: Option<PathBuf>,
    pub stage: Option<String>,
    pub stack: Option<String>,
    pub output: OutputFormat,
}

/// Load and validate the project configuration
pub fn load(globals: &Globals) -> Result<Project, KitError> {
    let cwd = std::env::current_dir().map_err(|e| {
        KitError::new("cannot determine the current directory", Exit::Generic).with_source(e)
    })?;
    let project = load_project(globals.config.as_deref(), &cwd)?;
    tracing::debug!(root = %project.root.display(), files = project.files.len(), "loaded project");
    Ok(project)
}

pub fn registry(project: &Project) -> Result<TaskRegistry, KitError> {
    Ok(TaskRegistry::from_runbook(&project.runbook)?)
}
