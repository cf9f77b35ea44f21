// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kit list` - List tasks

use super::Globals;
use crate::output;
use anyhow::Result;
use clap::Args;
use kit_engine::{root_context, Invocation};
use kit_runbook::{select_stack, select_stage, Project};
use serde::Serialize;
use std::fmt;

#[derive(Args)]
pub struct ListArgs {
    /// Include tasks that cannot run on the selected stage or stack
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
}

impl fmt::Display for TaskSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<20}", self.name)?;
        if let Some(description) = &self.description {
            write!(f, " {}", description)?;
        }
        if !self.enabled {
            write!(f, " (disabled on this stage or stack)")?;
        }
        Ok(())
    }
}

pub fn handle(args: ListArgs, project: &Project, globals: &Globals) -> Result<()> {
    let registry = super::registry(project)?;
    let stage = select_stage(&project.runbook, globals.stage.as_deref())
        .map_err(crate::error::KitError::from)?;
    let stack = select_stack(&project.runbook, globals.stack.as_deref())
        .map_err(crate::error::KitError::from)?;
    let invocation = Invocation {
        stage: globals.stage.clone(),
        stack: globals.stack.clone(),
        ..Invocation::default()
    };
    let ctx = root_context(&project.root, &project.runbook, &stage, stack.as_ref(), &invocation);

    let summaries: Vec<TaskSummary> = registry
        .tasks()
        .map(|task| TaskSummary {
            name: task.name.clone(),
            description: task.description.clone(),
            enabled: task.is_enabled(&stage, stack.as_ref(), &ctx),
        })
        .filter(|summary| args.all || summary.enabled)
        .collect();

    if summaries.is_empty() && globals.output == output::OutputFormat::Text {
        println!("No tasks");
        return Ok(());
    }
    output::print_list(&summaries, globals.output);
    Ok(())
}
