// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kit check` - Parse and validate the configuration

use super::Globals;
use crate::output;
use anyhow::Result;
use kit_runbook::Project;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct CheckSummary {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub tasks: usize,
    pub stages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stacks: Vec<String>,
}

impl fmt::Display for CheckSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ok: {} task(s) in {} file(s)", self.tasks, self.files.len())?;
        for file in &self.files {
            writeln!(f, "  {}", file.display())?;
        }
        if self.stages.is_empty() {
            write!(f, "stages: (implicit local)")?;
        } else {
            write!(f, "stages: {}", self.stages.join(", "))?;
        }
        if !self.stacks.is_empty() {
            write!(f, "\nstacks: {}", self.stacks.join(", "))?;
        }
        Ok(())
    }
}

/// Loading already validated the runbook; building the registry also
/// resolves every nested task reference.
pub fn handle(project: &Project, globals: &Globals) -> Result<()> {
    let registry = super::registry(project)?;
    let summary = CheckSummary {
        root: project.root.clone(),
        files: project.files.clone(),
        tasks: registry.len(),
        stages: project.runbook.stages.keys().cloned().collect(),
        stacks: project.runbook.stacks.keys().cloned().collect(),
    };
    output::print(&summary, globals.output);
    Ok(())
}
