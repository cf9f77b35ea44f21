// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kit run <task>` - Run a task's pipeline

use super::Globals;
use crate::error::{Exit, KitError};
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use clap::Args;
use kit_adapters::{
    DefaultExecutor, LocalExecutor, RemoteExecutor, RoutingExecutor, SshTransport, TracedExecutor,
};
use kit_core::{CancelFlag, HostDescriptor};
use kit_engine::{prepare, Invocation, PipelineReport, RunEvent, RunStatus, Runner};
use kit_runbook::{Project, Runbook};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Args)]
pub struct RunArgs {
    /// Task to run (e.g., "deploy")
    pub task: String,

    /// Print the commands that would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Run against this host instead of the stage's ([user@]host[:port])
    #[arg(long)]
    pub host: Option<HostDescriptor>,

    /// Template variable (key=value), usable as {key} in commands
    #[arg(long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Environment variable (key=value) exported to every command
    #[arg(long = "env", value_parser = parse_key_val)]
    pub env: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn build_executor(runbook: &Runbook) -> DefaultExecutor {
    let remote = RemoteExecutor::new(SshTransport::new(runbook.ssh.clone()))
        .with_retry(runbook.retry);
    TracedExecutor::new(RoutingExecutor::new(LocalExecutor::new(), remote))
}

pub async fn handle(args: RunArgs, project: &Project, globals: &Globals) -> Result<Exit> {
    let registry = super::registry(project)?;
    let invocation = Invocation {
        stage: globals.stage.clone(),
        stack: globals.stack.clone(),
        host: args.host,
        dry_run: args.dry_run,
        vars: args.vars.into_iter().collect(),
        env: args.env.into_iter().collect(),
    };
    let plan = prepare(project, &registry, &args.task, &invocation).map_err(KitError::from)?;
    tracing::info!(
        task = %plan.task.name,
        stage = %plan.stage.name,
        stack = plan.stack.as_ref().map(|s| s.name.as_str()),
        dry_run = args.dry_run,
        "starting run"
    );

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current step...");
        flag.cancel();
    })
    .context("failed to install interrupt handler")?;

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(print_progress(rx, globals.output));

    let runner = Runner::new(Arc::new(build_executor(&project.runbook)))
        .with_cancel(cancel)
        .with_events(tx);
    let report = runner.run(&plan.task.pipeline, &plan.context).await;
    runner.executor().inner().remote().close().await;
    drop(runner);
    let _ = progress.await;

    if globals.output == OutputFormat::Text && args.dry_run {
        print_dry_run(&report);
    }
    output::print(&report, globals.output);

    Ok(match report.status {
        RunStatus::Success => Exit::Success,
        RunStatus::Cancelled => Exit::Cancelled,
        RunStatus::Failed if report.fatal => Exit::Configuration,
        RunStatus::Failed => Exit::Failed,
    })
}

/// Live progress on stderr, so stdout stays parseable
async fn print_progress(mut rx: mpsc::UnboundedReceiver<RunEvent>, format: OutputFormat) {
    while let Some(event) = rx.recv().await {
        if format == OutputFormat::Json {
            continue;
        }
        match event {
            RunEvent::StepStarted { name, depth } => {
                eprintln!("{}-> {}", "  ".repeat(depth.saturating_sub(1)), name)
            }
            RunEvent::RollbackStarted { pipeline } => eprintln!("rolling back {}", pipeline),
            RunEvent::Cancelled { pipeline } => eprintln!("cancelled {}", pipeline),
            RunEvent::TransferStarted { label, size, .. } => {
                eprintln!("   {} ({})", label, format_size(size))
            }
            RunEvent::TransferFinished { label, .. } => tracing::debug!(%label, "transfer finished"),
            _ => {}
        }
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn print_dry_run(report: &PipelineReport) {
    let records = report
        .executed_steps()
        .into_iter()
        .filter_map(|s| s.outcome.result())
        .chain(report.all_rollbacks().into_iter().filter_map(|r| r.outcome.result()))
        .filter(|r| r.is_dry_run())
        .map(|r| r.stdout_lossy());
    for record in records {
        print!("{}", record);
    }
}
