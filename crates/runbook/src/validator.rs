// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic validation for runbooks.
//!
//! Checks what the parser cannot see in a single table:
//! - Reference integrity (task steps and stage/stack filters name things that exist)
//! - Task reference cycles
//! - Step name uniqueness within a task
//! - Stage consistency (remote stages have hosts, at most one default)

use crate::parser::Runbook;
use crate::task::{StepAction, StepDef};
use kit_core::Target;
use std::collections::{BTreeSet, HashSet};

/// Collection of validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Runbook validation failed with {} error(s):",
            self.errors.len()
        )?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "  {}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A single validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Reference to undefined item
    UndefinedReference {
        kind: &'static str,
        name: String,
        referenced_in: String,
    },
    /// Tasks that reference each other in a loop
    TaskCycle { tasks: Vec<String> },
    DuplicateStep { task: String, step: String },
    RemoteStageWithoutHost { stage: String },
    MultipleDefaultStages { stages: Vec<String> },
    /// A parallel group with no members
    EmptyParallel { task: String, step: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UndefinedReference {
                kind,
                name,
                referenced_in,
            } => write!(
                f,
                "Undefined {} '{}' referenced in {}",
                kind, name, referenced_in
            ),
            ValidationError::TaskCycle { tasks } => {
                write!(f, "Task reference cycle: {}", tasks.join(" -> "))
            }
            ValidationError::DuplicateStep { task, step } => {
                write!(f, "Step name '{}' appears more than once in task '{}'", step, task)
            }
            ValidationError::RemoteStageWithoutHost { stage } => {
                write!(f, "Remote stage '{}' has no host", stage)
            }
            ValidationError::MultipleDefaultStages { stages } => {
                write!(f, "Several stages are marked default: {}", stages.join(", "))
            }
            ValidationError::EmptyParallel { task, step } => {
                write!(f, "Parallel group '{}' in task '{}' has no steps", step, task)
            }
        }
    }
}

/// Validate a parsed runbook
pub fn validate_runbook(runbook: &Runbook) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    validate_stages(runbook, &mut errors);

    for (name, task) in &runbook.tasks {
        let mut seen = HashSet::new();
        for step in &task.steps {
            if !seen.insert(step.name.as_str()) {
                errors.push(ValidationError::DuplicateStep {
                    task: name.clone(),
                    step: step.name.clone(),
                });
            }
            validate_step(runbook, name, step, &mut errors);
        }

        for stage in &task.stages {
            if !runbook.stages.contains_key(stage) {
                errors.push(ValidationError::UndefinedReference {
                    kind: "stage",
                    name: stage.clone(),
                    referenced_in: format!("task.{}.stages", name),
                });
            }
        }

        for stack in &task.stacks {
            if !runbook.stacks.contains_key(stack) {
                errors.push(ValidationError::UndefinedReference {
                    kind: "stack",
                    name: stack.clone(),
                    referenced_in: format!("task.{}.stacks", name),
                });
            }
        }
    }

    if let Some(cycle) = find_task_cycle(runbook) {
        errors.push(ValidationError::TaskCycle { tasks: cycle });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

fn validate_stages(runbook: &Runbook, errors: &mut Vec<ValidationError>) {
    for (name, stage) in &runbook.stages {
        if stage.kind == Target::Remote && stage.host.is_none() {
            errors.push(ValidationError::RemoteStageWithoutHost {
                stage: name.clone(),
            });
        }
    }

    let defaults: Vec<String> = runbook
        .stages
        .values()
        .filter(|s| s.default)
        .map(|s| s.name.clone())
        .collect();
    if defaults.len() > 1 {
        errors.push(ValidationError::MultipleDefaultStages { stages: defaults });
    }
}

fn validate_step(runbook: &Runbook, task: &str, step: &StepDef, errors: &mut Vec<ValidationError>) {
    match &step.action {
        StepAction::Task(target) if !runbook.tasks.contains_key(target) => {
            errors.push(ValidationError::UndefinedReference {
                kind: "task",
                name: target.clone(),
                referenced_in: format!("task.{}.step '{}'", task, step.name),
            });
        }
        StepAction::Parallel { steps, .. } => {
            if steps.is_empty() {
                errors.push(ValidationError::EmptyParallel {
                    task: task.to_string(),
                    step: step.name.clone(),
                });
            }
            let mut seen = HashSet::new();
            for member in steps {
                if !seen.insert(member.name.as_str()) {
                    errors.push(ValidationError::DuplicateStep {
                        task: task.to_string(),
                        step: member.name.clone(),
                    });
                }
            }
        }
        _ => {}
    }
}

/// First cycle found by depth-first search over task references, in a
/// deterministic order. The returned path starts and ends with the same task.
fn find_task_cycle(runbook: &Runbook) -> Option<Vec<String>> {
    let mut done = BTreeSet::new();
    for name in runbook.tasks.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = visit(runbook, name, &mut path, &mut done) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    runbook: &'a Runbook,
    name: &'a str,
    path: &mut Vec<&'a str>,
    done: &mut BTreeSet<&'a str>,
) -> Option<Vec<String>> {
    if let Some(pos) = path.iter().position(|p| *p == name) {
        let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
        cycle.push(name.to_string());
        return Some(cycle);
    }
    if done.contains(name) {
        return None;
    }
    let task = runbook.tasks.get(name)?;
    path.push(name);
    for next in task.task_refs() {
        if let Some(cycle) = visit(runbook, next, path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(name);
    None
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
