// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kit show <task>` - Print a task's pipeline tree

use super::Globals;
use crate::error::KitError;
use crate::output;
use anyhow::Result;
use clap::Args;
use kit_engine::{Node, Pipeline, Step, Task};
use kit_runbook::Project;
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct ShowArgs {
    /// Task to show
    pub task: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeView {
    Step {
        name: String,
        action: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        rollback: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        only: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        creates: Option<String>,
    },
    Pipeline(PipelineView),
    Parallel {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_workers: Option<usize>,
        steps: Vec<NodeView>,
    },
}

#[derive(Debug, Serialize)]
pub struct PipelineView {
    pub name: String,
    pub on_failure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Serialize)]
pub struct TaskView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stacks: Vec<String>,
    pub pipeline: PipelineView,
}

fn step_view(step: &Step) -> NodeView {
    NodeView::Step {
        name: step.name().to_string(),
        action: step.action().describe(),
        rollback: step.rollback().map(|a| a.describe()),
        only: step.target().map(|t| t.to_string()),
        creates: step.created_path().map(str::to_string),
    }
}

fn pipeline_view(pipeline: &Pipeline) -> PipelineView {
    PipelineView {
        name: pipeline.name().to_string(),
        on_failure: pipeline.policy().to_string(),
        pre: pipeline.pre_hook().map(|s| s.action().describe()),
        post: pipeline.post_hook().map(|s| s.action().describe()),
        children: pipeline
            .nodes()
            .iter()
            .map(|node| match node {
                Node::Step(step) => step_view(step),
                Node::Pipeline(nested) => NodeView::Pipeline(pipeline_view(nested)),
                Node::Parallel(group) => NodeView::Parallel {
                    name: group.name.clone(),
                    max_workers: group.max_workers,
                    steps: group.steps.iter().map(step_view).collect(),
                },
            })
            .collect(),
    }
}

impl TaskView {
    pub fn new(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone(),
            only: task.filter.only.map(|t| t.to_string()),
            stages: task.filter.stages.clone(),
            stacks: task.filter.stacks.clone(),
            pipeline: pipeline_view(&task.pipeline),
        }
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &NodeView, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match node {
        NodeView::Step {
            name,
            action,
            rollback,
            only,
            creates,
        } => {
            write!(f, "{}- {}: {}", pad, name, action)?;
            if let Some(only) = only {
                write!(f, " [{} only]", only)?;
            }
            if let Some(path) = creates {
                write!(f, " [unless {} exists]", path)?;
            }
            writeln!(f)?;
            if let Some(rollback) = rollback {
                writeln!(f, "{}    rollback: {}", pad, rollback)?;
            }
            Ok(())
        }
        NodeView::Pipeline(view) => write_pipeline(f, view, indent),
        NodeView::Parallel {
            name,
            max_workers,
            steps,
        } => {
            match max_workers {
                Some(n) => writeln!(f, "{}- {} [parallel, {} workers]", pad, name, n)?,
                None => writeln!(f, "{}- {} [parallel]", pad, name)?,
            }
            for step in steps {
                write_node(f, step, indent + 1)?;
            }
            Ok(())
        }
    }
}

fn write_pipeline(f: &mut fmt::Formatter<'_>, view: &PipelineView, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    writeln!(f, "{}- {} (on failure: {})", pad, view.name, view.on_failure)?;
    if let Some(pre) = &view.pre {
        writeln!(f, "{}    pre: {}", pad, pre)?;
    }
    for child in &view.children {
        write_node(f, child, indent + 1)?;
    }
    if let Some(post) = &view.post {
        writeln!(f, "{}    post: {}", pad, post)?;
    }
    Ok(())
}

impl fmt::Display for TaskView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Task: {}", self.name)?;
        if let Some(description) = &self.description {
            writeln!(f, "  {}", description)?;
        }
        if let Some(only) = &self.only {
            writeln!(f, "  Runs on: {} targets", only)?;
        }
        if !self.stages.is_empty() {
            writeln!(f, "  Stages: {}", self.stages.join(", "))?;
        }
        if !self.stacks.is_empty() {
            writeln!(f, "  Stacks: {}", self.stacks.join(", "))?;
        }
        write_pipeline(f, &self.pipeline, 0)
    }
}

pub fn handle(args: ShowArgs, project: &Project, globals: &Globals) -> Result<()> {
    let registry = super::registry(project)?;
    let task = registry.resolve(&args.task).map_err(KitError::from)?;
    output::print(&TaskView::new(task), globals.output);
    Ok(())
}
