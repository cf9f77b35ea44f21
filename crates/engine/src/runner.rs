// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline runner
//!
//! Walks the pipeline tree depth-first. Children of a pipeline run one at a
//! time in declaration order; only [`ParallelGroup`]s fan out, onto a
//! `JoinSet` bounded by a semaphore. Rollback is an explicit reverse loop
//! over the children that succeeded.

use crate::events::{emit, EventSender, RunEvent, StepTransfers};
use crate::outcome::{FailureKind, StepOutcome};
use crate::pipeline::{Node, ParallelGroup, Pipeline};
use crate::report::{GroupReport, NodeReport, PipelineReport, RollbackReport, RunStatus, StepReport};
use crate::step::Step;
use kit_adapters::CommandExecutor;
use kit_core::{CancelFlag, Context, FailurePolicy};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs pipelines against one executor
#[derive(Clone)]
pub struct Runner<E> {
    executor: E,
    cancel: CancelFlag,
    events: Option<EventSender>,
}

impl<E> Runner<E>
where
    E: CommandExecutor + Clone + 'static,
{
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            cancel: CancelFlag::new(),
            events: None,
        }
    }

    /// Share a cancellation flag, typically set from a signal handler
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Run `pipeline` with `ctx` as the parent context
    pub async fn run(&self, pipeline: &Pipeline, ctx: &Context) -> PipelineReport {
        self.run_pipeline(pipeline, ctx, 0).await
    }

    fn run_pipeline<'a>(
        &'a self,
        pipeline: &'a Pipeline,
        parent: &'a Context,
        depth: usize,
    ) -> BoxFuture<'a, PipelineReport> {
        let span = tracing::info_span!(
            "pipeline",
            name = pipeline.name(),
            policy = %pipeline.policy(),
            depth
        );
        Box::pin(
            async move {
                let start = Instant::now();
                let ctx = parent.derive(pipeline.overrides());
                let mut report = PipelineReport::new(pipeline.name());
                emit(
                    self.events.as_ref(),
                    RunEvent::PipelineStarted {
                        name: pipeline.name().to_string(),
                        depth,
                    },
                );

                if let Some(pre) = pipeline.pre_hook() {
                    let pre_report = self.run_step(pre, &ctx, depth + 1).await;
                    let failed = pre_report.outcome.is_failed();
                    report.fatal = pre_report.outcome.is_fatal();
                    report.pre = Some(pre_report);
                    if failed {
                        tracing::warn!("pre hook failed, skipping pipeline");
                        report.status = RunStatus::Failed;
                        return self.finish(report, start, depth);
                    }
                }

                let policy = pipeline.policy();
                let mut failed = false;
                let mut cancelled = false;
                for node in pipeline.nodes() {
                    if self.cancel.is_cancelled() {
                        cancelled = true;
                        break;
                    }
                    let child = self.run_node(node, &ctx, depth + 1).await;
                    let child_failed = child.is_failed();
                    let child_fatal = child.is_fatal();
                    let child_cancelled = child.is_cancelled();
                    report.children.push(child);

                    if child_fatal {
                        tracing::error!(child = node.name(), "configuration error, stopping run");
                        report.fatal = true;
                        failed = true;
                        break;
                    }
                    if child_cancelled {
                        cancelled = true;
                        break;
                    }
                    if child_failed {
                        failed = true;
                        if policy != FailurePolicy::Continue {
                            break;
                        }
                    }
                }
                if cancelled {
                    tracing::warn!("run cancelled");
                    emit(
                        self.events.as_ref(),
                        RunEvent::Cancelled {
                            pipeline: pipeline.name().to_string(),
                        },
                    );
                }

                if (failed || cancelled) && policy == FailurePolicy::Rollback {
                    emit(
                        self.events.as_ref(),
                        RunEvent::RollbackStarted {
                            pipeline: pipeline.name().to_string(),
                        },
                    );
                    self.rollback(pipeline.nodes(), &report.children, &ctx, &mut report.rollbacks)
                        .await;
                }

                if !cancelled && !report.fatal {
                    if let Some(post) = pipeline.post_hook() {
                        let post_report = self.run_step(post, &ctx, depth + 1).await;
                        failed |= post_report.outcome.is_failed();
                        report.fatal |= post_report.outcome.is_fatal();
                        report.post = Some(post_report);
                    }
                }

                report.status = if cancelled {
                    RunStatus::Cancelled
                } else if failed {
                    RunStatus::Failed
                } else {
                    RunStatus::Success
                };
                self.finish(report, start, depth)
            }
            .instrument(span),
        )
    }

    fn finish(&self, mut report: PipelineReport, start: Instant, depth: usize) -> PipelineReport {
        report.duration = start.elapsed();
        tracing::info!(
            status = %report.status,
            elapsed_ms = report.duration.as_millis() as u64,
            "pipeline finished"
        );
        emit(
            self.events.as_ref(),
            RunEvent::PipelineFinished {
                name: report.name.clone(),
                depth,
                status: report.status,
                duration: report.duration,
            },
        );
        report
    }

    async fn run_node(&self, node: &Node, ctx: &Context, depth: usize) -> NodeReport {
        match node {
            Node::Step(step) => NodeReport::Step(self.run_step(step, ctx, depth).await),
            Node::Pipeline(pipeline) => {
                NodeReport::Pipeline(self.run_pipeline(pipeline, ctx, depth).await)
            }
            Node::Parallel(group) => NodeReport::Parallel(self.run_group(group, ctx, depth).await),
        }
    }

    async fn run_step(&self, step: &Step, ctx: &Context, depth: usize) -> StepReport {
        execute_step(step, ctx, &self.executor, self.events.as_ref(), depth).await
    }

    async fn run_group(&self, group: &ParallelGroup, ctx: &Context, depth: usize) -> GroupReport {
        let start = Instant::now();
        let workers = group.worker_count();
        tracing::info!(group = %group.name, steps = group.steps.len(), workers, "starting parallel group");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut set = JoinSet::new();
        for (index, step) in group.steps.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let executor = self.executor.clone();
            let ctx = ctx.clone();
            let cancel = self.cancel.clone();
            let events = self.events.clone();
            set.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    let report = if cancel.is_cancelled() {
                        StepReport {
                            name: step.name().to_string(),
                            outcome: StepOutcome::Skipped("cancelled".to_string()),
                            duration: Duration::ZERO,
                        }
                    } else {
                        execute_step(&step, &ctx, &executor, events.as_ref(), depth + 1).await
                    };
                    (index, report)
                }
                .in_current_span(),
            );
        }

        let mut slots: Vec<Option<StepReport>> = vec![None; group.steps.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(report);
                    }
                }
                Err(e) => tracing::error!(group = %group.name, error = %e, "parallel step task failed"),
            }
        }

        let steps: Vec<StepReport> = slots
            .into_iter()
            .zip(&group.steps)
            .map(|(slot, step)| {
                slot.unwrap_or_else(|| StepReport {
                    name: step.name().to_string(),
                    outcome: StepOutcome::failed(FailureKind::Action, "step task aborted"),
                    duration: Duration::ZERO,
                })
            })
            .collect();
        let status = if steps.iter().any(|s| s.outcome.is_failed()) {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
        GroupReport {
            name: group.name.clone(),
            status,
            steps,
            duration: start.elapsed(),
        }
    }

    /// Invoke rollback hooks of the successful `children`, last first.
    ///
    /// `nodes` and `children` are index-aligned; `children` may be shorter.
    fn rollback<'a>(
        &'a self,
        nodes: &'a [Node],
        children: &'a [NodeReport],
        ctx: &'a Context,
        out: &'a mut Vec<RollbackReport>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            for (node, child) in nodes.iter().zip(children).rev() {
                if !child.is_success() {
                    continue;
                }
                match (node, child) {
                    (Node::Step(step), _) => self.rollback_step(step, ctx, out).await,
                    (Node::Pipeline(pipeline), NodeReport::Pipeline(report)) => {
                        let nested = ctx.derive(pipeline.overrides());
                        self.rollback(pipeline.nodes(), &report.children, &nested, out)
                            .await;
                    }
                    (Node::Parallel(group), NodeReport::Parallel(report)) => {
                        for (step, step_report) in group.steps.iter().zip(&report.steps).rev() {
                            if step_report.outcome.is_success() {
                                self.rollback_step(step, ctx, out).await;
                            }
                        }
                    }
                    _ => {}
                }
            }
        })
    }

    async fn rollback_step(&self, step: &Step, ctx: &Context, out: &mut Vec<RollbackReport>) {
        let start = Instant::now();
        let outcome = match step
            .execute_rollback(ctx, &self.executor)
            .instrument(tracing::info_span!("rollback", step = step.name()))
            .await
        {
            Some(outcome) => outcome,
            None => return,
        };
        if let Some(failure) = outcome.failure() {
            tracing::error!(step = step.name(), error = %failure, "rollback failed");
        }
        emit(
            self.events.as_ref(),
            RunEvent::RollbackFinished {
                name: step.name().to_string(),
                status: outcome.label().to_string(),
            },
        );
        out.push(RollbackReport {
            name: step.name().to_string(),
            outcome,
            duration: start.elapsed(),
        });
    }
}

async fn execute_step(
    step: &Step,
    ctx: &Context,
    executor: &dyn CommandExecutor,
    events: Option<&EventSender>,
    depth: usize,
) -> StepReport {
    emit(
        events,
        RunEvent::StepStarted {
            name: step.name().to_string(),
            depth,
        },
    );
    let start = Instant::now();
    let transfers = StepTransfers {
        step: step.name(),
        events,
    };
    let outcome = step
        .execute_observed(ctx, executor, &transfers)
        .instrument(tracing::info_span!("step", name = step.name()))
        .await;
    let duration = start.elapsed();

    match &outcome {
        StepOutcome::Success(_) => {
            tracing::info!(step = step.name(), elapsed_ms = duration.as_millis() as u64, "step succeeded")
        }
        StepOutcome::Skipped(reason) => tracing::info!(step = step.name(), reason = %reason, "step skipped"),
        StepOutcome::Failed(failure) => tracing::warn!(
            step = step.name(),
            elapsed_ms = duration.as_millis() as u64,
            error = %failure,
            "step failed"
        ),
    }
    emit(
        events,
        RunEvent::StepFinished {
            name: step.name().to_string(),
            depth,
            status: outcome.label().to_string(),
            duration,
        },
    );
    StepReport {
        name: step.name().to_string(),
        outcome,
        duration,
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
