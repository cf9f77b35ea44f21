// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run reports

use crate::outcome::StepOutcome;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::time::Duration;

/// Aggregated status of a pipeline or parallel group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub status: RunStatus,
    /// In declaration order, regardless of completion order
    pub steps: Vec<StepReport>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// One invoked rollback hook
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub name: String,
    pub outcome: StepOutcome,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeReport {
    Step(StepReport),
    Pipeline(PipelineReport),
    Parallel(GroupReport),
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub name: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<StepReport>,
    pub children: Vec<NodeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<StepReport>,
    /// Rollback hooks invoked by this pipeline, in invocation order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollbacks: Vec<RollbackReport>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// A configuration failure stopped the run
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

impl NodeReport {
    pub fn name(&self) -> &str {
        match self {
            NodeReport::Step(r) => &r.name,
            NodeReport::Pipeline(r) => &r.name,
            NodeReport::Parallel(r) => &r.name,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            NodeReport::Step(r) => r.outcome.is_success(),
            NodeReport::Pipeline(r) => r.status == RunStatus::Success,
            NodeReport::Parallel(r) => r.status == RunStatus::Success,
        }
    }

    pub fn is_failed(&self) -> bool {
        match self {
            NodeReport::Step(r) => r.outcome.is_failed(),
            NodeReport::Pipeline(r) => r.status == RunStatus::Failed,
            NodeReport::Parallel(r) => r.status == RunStatus::Failed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            NodeReport::Pipeline(r) => r.status == RunStatus::Cancelled,
            _ => false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            NodeReport::Step(r) => r.outcome.is_fatal(),
            NodeReport::Pipeline(r) => r.fatal,
            NodeReport::Parallel(r) => r.steps.iter().any(|s| s.outcome.is_fatal()),
        }
    }
}

impl PipelineReport {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RunStatus::Success,
            pre: None,
            children: Vec::new(),
            post: None,
            rollbacks: Vec::new(),
            duration: Duration::ZERO,
            fatal: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Every step that ran or was skipped, depth-first, hooks included
    pub fn steps(&self) -> Vec<&StepReport> {
        let mut out = Vec::new();
        self.collect_steps(&mut out);
        out
    }

    fn collect_steps<'a>(&'a self, out: &mut Vec<&'a StepReport>) {
        out.extend(self.pre.iter());
        for child in &self.children {
            match child {
                NodeReport::Step(r) => out.push(r),
                NodeReport::Pipeline(r) => r.collect_steps(out),
                NodeReport::Parallel(r) => out.extend(r.steps.iter()),
            }
        }
        out.extend(self.post.iter());
    }

    /// Steps that were not skipped
    pub fn executed_steps(&self) -> Vec<&StepReport> {
        self.steps()
            .into_iter()
            .filter(|s| !matches!(s.outcome, StepOutcome::Skipped(_)))
            .collect()
    }

    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps().into_iter().find(|s| s.outcome.is_failed())
    }

    /// Rollback hooks invoked anywhere in the tree
    pub fn all_rollbacks(&self) -> Vec<&RollbackReport> {
        let mut out = Vec::new();
        self.collect_rollbacks(&mut out);
        out
    }

    fn collect_rollbacks<'a>(&'a self, out: &mut Vec<&'a RollbackReport>) {
        for child in &self.children {
            if let NodeReport::Pipeline(r) = child {
                r.collect_rollbacks(out);
            }
        }
        out.extend(self.rollbacks.iter());
    }
}

fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

fn marker(outcome: &StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Success(_) => "ok",
        StepOutcome::Skipped(_) => "--",
        StepOutcome::Failed(_) => "!!",
    }
}

fn write_step(out: &mut String, report: &StepReport, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match &report.outcome {
        StepOutcome::Skipped(reason) => {
            writeln!(out, "{}-- {} (skipped: {})", pad, report.name, reason)
        }
        StepOutcome::Success(_) => writeln!(
            out,
            "{}ok {} ({})",
            pad,
            report.name,
            format_duration(report.duration)
        ),
        StepOutcome::Failed(failure) => {
            writeln!(
                out,
                "{}!! {} ({})",
                pad,
                report.name,
                format_duration(report.duration)
            )?;
            let detail = "  ".repeat(indent + 2);
            match &failure.result {
                Some(result) if !result.is_dry_run() => {
                    writeln!(out, "{}command: {}", detail, result.command())?;
                    if result.timed_out() {
                        writeln!(out, "{}timed out", detail)?;
                    } else {
                        writeln!(out, "{}exit code: {}", detail, result.exit_code())?;
                    }
                    let stderr = result.stderr_lossy();
                    let stderr = stderr.trim_end();
                    if !stderr.is_empty() {
                        writeln!(out, "{}stderr:", detail)?;
                        for line in stderr.lines() {
                            writeln!(out, "{}  {}", detail, line)?;
                        }
                    }
                    Ok(())
                }
                _ => writeln!(out, "{}error: {}", detail, failure.message),
            }
        }
    }
}

fn write_pipeline(out: &mut String, report: &PipelineReport, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    writeln!(
        out,
        "{}{}: {} ({})",
        pad,
        report.name,
        report.status,
        format_duration(report.duration)
    )?;
    if let Some(pre) = &report.pre {
        write_step(out, pre, indent + 1)?;
    }
    for child in &report.children {
        match child {
            NodeReport::Step(r) => write_step(out, r, indent + 1)?,
            NodeReport::Pipeline(r) => write_pipeline(out, r, indent + 1)?,
            NodeReport::Parallel(r) => {
                writeln!(
                    out,
                    "{}  {} [parallel]: {} ({})",
                    pad,
                    r.name,
                    r.status,
                    format_duration(r.duration)
                )?;
                for step in &r.steps {
                    write_step(out, step, indent + 2)?;
                }
            }
        }
    }
    if let Some(post) = &report.post {
        write_step(out, post, indent + 1)?;
    }
    Ok(())
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_pipeline(&mut out, self, 0)?;

        let rollbacks = self.all_rollbacks();
        if !rollbacks.is_empty() {
            writeln!(out, "rollback:")?;
            for rb in rollbacks {
                writeln!(
                    out,
                    "  {} {} ({})",
                    marker(&rb.outcome),
                    rb.name,
                    format_duration(rb.duration)
                )?;
                if let Some(failure) = rb.outcome.failure() {
                    writeln!(out, "      error: {}", failure.message)?;
                }
            }
        }
        f.write_str(out.trim_end())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
