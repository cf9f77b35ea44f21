// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root context and run preparation

use crate::error::RunError;
use crate::registry::{Task, TaskRegistry};
use kit_core::{Context, ContextOverrides, HostDescriptor};
use kit_runbook::{select_stack, select_stage, Project, Runbook, StackDef, StageDef, DEFAULT_BASEDIR};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Command-line inputs for one run
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub stage: Option<String>,
    pub stack: Option<String>,
    /// Overrides the stage's host
    pub host: Option<HostDescriptor>,
    pub dry_run: bool,
    /// `--var` values, exposed as `{name}` template variables
    pub vars: BTreeMap<String, String>,
    /// `--env` values, exported to every command
    pub env: BTreeMap<String, String>,
}

/// Everything needed to start a run
#[derive(Debug, Clone)]
pub struct Plan {
    pub task: Task,
    pub stage: StageDef,
    pub stack: Option<StackDef>,
    pub context: Context,
}

/// Build the root context.
///
/// Later sources win: runbook defaults, then the stage, then the stack, then
/// the invocation. A stack `basedir` is taken relative to the stage's working
/// directory. The `stage` and `root` template variables always name the
/// selected stage and the project root; `stack` is set when a stack is selected.
pub fn root_context(
    root: &Path,
    runbook: &Runbook,
    stage: &StageDef,
    stack: Option<&StackDef>,
    invocation: &Invocation,
) -> Context {
    let host = invocation.host.clone().or_else(|| stage.host.clone());
    let mut working_dir = match &host {
        Some(_) => PathBuf::from(stage.basedir.as_deref().unwrap_or(DEFAULT_BASEDIR)),
        None => match &runbook.defaults.working_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        },
    };
    if let Some(basedir) = stack.and_then(|s| s.basedir.as_deref()) {
        working_dir.push(basedir);
    }

    let mut env = runbook.defaults.env.clone();
    env.extend(stage.env.clone());
    if let Some(stack) = stack {
        env.extend(stack.env.clone());
    }
    env.extend(invocation.env.clone());

    let mut extra = runbook.defaults.vars.clone();
    extra.extend(stage.vars.clone());
    if let Some(stack) = stack {
        extra.extend(stack.vars.clone());
        extra.insert("stack".to_string(), Value::String(stack.name.clone()));
    }
    extra.extend(
        invocation
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone()))),
    );
    extra.insert("stage".to_string(), Value::String(stage.name.clone()));
    extra.insert(
        "root".to_string(),
        Value::String(root.to_string_lossy().into_owned()),
    );

    Context::new(working_dir).derive(&ContextOverrides {
        working_dir: None,
        env,
        dry_run: Some(invocation.dry_run),
        host: Some(host),
        extra,
    })
}

/// Resolve the task, stage and stack and build the root context.
///
/// Fails before any step runs: unknown task, unknown stage or stack, or a
/// task the stage or stack filters out.
pub fn prepare(
    project: &Project,
    registry: &TaskRegistry,
    task: &str,
    invocation: &Invocation,
) -> Result<Plan, RunError> {
    let task = registry.resolve(task)?.clone();
    let stage = select_stage(&project.runbook, invocation.stage.as_deref())?;
    let stack = select_stack(&project.runbook, invocation.stack.as_deref())?;
    let context = root_context(
        &project.root,
        &project.runbook,
        &stage,
        stack.as_ref(),
        invocation,
    );
    let stack_name = stack.as_ref().map(|s| s.name.as_str());
    if let Some(reason) = task.filter.rejection(&stage.name, stack_name, &context) {
        return Err(RunError::TaskFiltered {
            task: task.name,
            stage: stage.name,
            reason,
        });
    }
    tracing::debug!(task = %task.name, stage = %stage.name, context = ?context, "prepared run");
    Ok(Plan {
        task,
        stage,
        stack,
        context,
    })
}

#[cfg(test)]
#[path = "setup_tests.rs"]
mod tests;
