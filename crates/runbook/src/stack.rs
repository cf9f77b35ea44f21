// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stacks: named service directories within a stage

use crate::parser::Runbook;
use crate::stage::StageError;
use serde_json::Value;
use std::collections::BTreeMap;

/// A deployable unit of the project, such as one compose stack.
///
/// Selecting a stack moves the run into its `basedir` and layers its
/// environment and variables over the stage's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackDef {
    pub name: String,
    /// Relative to the stage's working directory, or absolute
    pub basedir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub vars: BTreeMap<String, Value>,
}

impl StackDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Pick the stack for this invocation, if any.
///
/// An explicit name must exist. Otherwise a single declared stack is used;
/// with none or several, no stack is selected.
pub fn select_stack(
    runbook: &Runbook,
    requested: Option<&str>,
) -> Result<Option<StackDef>, StageError> {
    match requested {
        Some(name) => runbook
            .stacks
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| StageError::UnknownStack {
                name: name.to_string(),
                available: runbook.stacks.keys().cloned().collect(),
            }),
        None if runbook.stacks.len() == 1 => Ok(runbook.stacks.values().next().cloned()),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "stack_tests.rs"]
mod tests;
