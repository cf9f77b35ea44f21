// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task registry

use crate::error::RegistryError;
use crate::pipeline::{Node, ParallelGroup, Pipeline};
use crate::step::{Action, Step};
use kit_core::{Context, ContextOverrides, RunOptions, Target};
use kit_runbook::{Runbook, StackDef, StageDef, StepAction, StepDef, TaskDef};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a task may run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub only: Option<Target>,
    /// Empty means every stage
    pub stages: Vec<String>,
    /// Empty means any stack, or none
    pub stacks: Vec<String>,
}

impl TaskFilter {
    /// Why the task may not run in `stage` and `stack` with `ctx`, if it may not
    pub fn rejection(&self, stage: &str, stack: Option<&str>, ctx: &Context) -> Option<String> {
        if !self.stages.is_empty() && !self.stages.iter().any(|s| s == stage) {
            return Some(format!("limited to stages: {}", self.stages.join(", ")));
        }
        if !self.stacks.is_empty() && !stack.is_some_and(|name| self.stacks.iter().any(|s| s == name)) {
            return Some(format!("limited to stacks: {}", self.stacks.join(", ")));
        }
        match self.only {
            Some(target) if !target.matches(ctx.is_remote()) => {
                Some(format!("only runs on {} targets", target))
            }
            _ => None,
        }
    }

    pub fn allows(&self, stage: &str, stack: Option<&str>, ctx: &Context) -> bool {
        self.rejection(stage, stack, ctx).is_none()
    }
}

/// A named, runnable pipeline
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: Option<String>,
    pub pipeline: Pipeline,
    pub filter: TaskFilter,
}

impl Task {
    pub fn new(name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            name: name.into(),
            description: None,
            pipeline,
            filter: TaskFilter::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn is_enabled(&self, stage: &StageDef, stack: Option<&StackDef>, ctx: &Context) -> bool {
        let stack = stack.map(|s| s.name.as_str());
        self.filter.allows(&stage.name, stack, ctx)
    }
}

/// Name-indexed set of tasks. Built once per invocation.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pipeline` as task `name`
    pub fn register(&mut self, name: impl Into<String>, pipeline: Pipeline) -> Result<(), RegistryError> {
        self.register_task(Task::new(name, pipeline))
    }

    pub fn register_task(&mut self, task: Task) -> Result<(), RegistryError> {
        if self.tasks.contains_key(&task.name) {
            return Err(RegistryError::DuplicateTask(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Task, RegistryError> {
        self.tasks.get(name).ok_or_else(|| RegistryError::UnknownTask {
            name: name.to_string(),
            suggestions: self.suggestions(name),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks allowed to run for this stage and stack
    pub fn enabled_for(&self, stage: &StageDef, stack: Option<&StackDef>, ctx: &Context) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| t.is_enabled(stage, stack, ctx))
            .collect()
    }

    /// Registered names close to `name`, closest first
    fn suggestions(&self, name: &str) -> Vec<String> {
        let limit = (name.len() / 3).max(2);
        let mut scored: Vec<(usize, &String)> = self
            .tasks
            .keys()
            .filter_map(|candidate| {
                let distance = edit_distance(name, candidate);
                let related = candidate.starts_with(name) || name.starts_with(candidate.as_str());
                (distance <= limit || related).then_some((distance, candidate))
            })
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, n)| n.clone()).collect()
    }

    /// Build a registry from every task in `runbook`.
    ///
    /// `task = "other"` steps become nested pipelines holding a copy of the
    /// referenced task's pipeline.
    pub fn from_runbook(runbook: &Runbook) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for def in runbook.tasks.values() {
            let pipeline = build_pipeline(runbook, def, &mut Vec::new())?;
            let mut task = Task::new(&def.name, pipeline).with_filter(TaskFilter {
                only: def.only,
                stages: def.stages.clone(),
                stacks: def.stacks.clone(),
            });
            task.description = def.description.clone();
            registry.register_task(task)?;
        }
        Ok(registry)
    }
}

fn build_pipeline(
    runbook: &Runbook,
    def: &TaskDef,
    stack: &mut Vec<String>,
) -> Result<Pipeline, RegistryError> {
    if stack.iter().any(|name| name == &def.name) {
        let mut cycle = stack.clone();
        cycle.push(def.name.clone());
        return Err(RegistryError::Cycle(cycle));
    }
    stack.push(def.name.clone());

    let overrides = ContextOverrides {
        working_dir: def.cwd.as_ref().map(PathBuf::from),
        env: def.env.clone(),
        extra: def.vars.clone(),
        ..ContextOverrides::default()
    };
    let mut pipeline = Pipeline::new(&def.name)
        .on_failure(def.on_failure)
        .with_overrides(overrides);
    if let Some(pre) = &def.pre {
        pipeline = pipeline.pre(Step::shell("pre", pre));
    }
    if let Some(post) = &def.post {
        pipeline = pipeline.post(Step::shell("post", post));
    }

    for step in &def.steps {
        let node = match &step.action {
            StepAction::Task(name) => {
                let target = runbook.get_task(name).ok_or_else(|| RegistryError::UnknownTask {
                    name: name.clone(),
                    suggestions: Vec::new(),
                })?;
                let mut nested = build_pipeline(runbook, target, stack)?;
                nested.set_name(&step.name);
                Node::Pipeline(nested)
            }
            StepAction::Parallel { steps, max_workers } => Node::Parallel(ParallelGroup {
                name: step.name.clone(),
                steps: steps.iter().filter_map(build_step).collect(),
                max_workers: *max_workers,
            }),
            _ => match build_step(step) {
                Some(step) => Node::Step(step),
                None => continue,
            },
        };
        pipeline.push(node);
    }

    stack.pop();
    Ok(pipeline)
}

/// Leaf step for a `run`, `wait_for` or `copy` definition
fn build_step(def: &StepDef) -> Option<Step> {
    let options = RunOptions {
        allow_failure: def.allow_failure,
        timeout: def.timeout,
        local: def.local,
    };
    let action = match &def.action {
        StepAction::Run(command) => Action::Shell {
            command: command.clone(),
            options: options.clone(),
        },
        StepAction::WaitFor {
            command,
            interval,
            max_checks,
        } => Action::WaitFor {
            command: command.clone(),
            interval: *interval,
            max_checks: *max_checks,
            options: options.clone(),
        },
        StepAction::Copy {
            source,
            destination,
        } => Action::Copy {
            source: source.clone(),
            destination: destination.clone(),
            options: options.clone(),
        },
        StepAction::Task(_) | StepAction::Parallel { .. } => return None,
    };
    let mut step = Step::new(&def.name, action);
    if let Some(rollback) = &def.rollback {
        step = step.with_rollback_action(Action::Shell {
            command: rollback.clone(),
            options: RunOptions {
                local: def.local,
                ..RunOptions::default()
            },
        });
    }
    if let Some(target) = def.only {
        step = step.only(target);
    }
    if let Some(path) = &def.creates {
        step = step.creates(path);
    }
    Some(step)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut row = Vec::with_capacity(b.len() + 1);
        row.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != *cb);
            let insert = row[j] + 1;
            let delete = prev[j + 1] + 1;
            row.push(substitute.min(insert).min(delete));
        }
        prev = row;
    }
    prev[b.len()]
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
