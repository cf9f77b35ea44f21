// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline tree

use crate::step::Step;
use kit_core::{ContextOverrides, FailurePolicy};

/// An ordered sequence of nodes run under one failure policy
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    nodes: Vec<Node>,
    on_failure: FailurePolicy,
    overrides: ContextOverrides,
    pre: Option<Step>,
    post: Option<Step>,
}

/// A child of a pipeline
#[derive(Debug, Clone)]
pub enum Node {
    Step(Step),
    Pipeline(Pipeline),
    Parallel(ParallelGroup),
}

/// Steps run concurrently on a bounded worker pool
#[derive(Debug, Clone)]
pub struct ParallelGroup {
    pub name: String,
    pub steps: Vec<Step>,
    /// Defaults to one worker per step
    pub max_workers: Option<usize>,
}

impl ParallelGroup {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            max_workers: None,
        }
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or(self.steps.len()).max(1)
    }
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Step(step) => step.name(),
            Node::Pipeline(pipeline) => pipeline.name(),
            Node::Parallel(group) => &group.name,
        }
    }
}

impl From<Step> for Node {
    fn from(step: Step) -> Self {
        Node::Step(step)
    }
}

impl From<Pipeline> for Node {
    fn from(pipeline: Pipeline) -> Self {
        Node::Pipeline(pipeline)
    }
}

impl From<ParallelGroup> for Node {
    fn from(group: ParallelGroup) -> Self {
        Node::Parallel(group)
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            on_failure: FailurePolicy::default(),
            overrides: ContextOverrides::default(),
            pre: None,
            post: None,
        }
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Append a step, nested pipeline or parallel group
    pub fn then(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.nodes.push(node.into());
    }

    /// Context overrides applied when this pipeline starts
    pub fn with_overrides(mut self, overrides: ContextOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn pre(mut self, step: Step) -> Self {
        self.pre = Some(step);
        self
    }

    pub fn post(mut self, step: Step) -> Self {
        self.post = Some(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn policy(&self) -> FailurePolicy {
        self.on_failure
    }

    pub fn overrides(&self) -> &ContextOverrides {
        &self.overrides
    }

    pub fn pre_hook(&self) -> Option<&Step> {
        self.pre.as_ref()
    }

    pub fn post_hook(&self) -> Option<&Step> {
        self.post.as_ref()
    }

    /// Number of steps in the tree, hooks included
    pub fn step_count(&self) -> usize {
        let hooks = usize::from(self.pre.is_some()) + usize::from(self.post.is_some());
        hooks
            + self
                .nodes
                .iter()
                .map(|node| match node {
                    Node::Step(_) => 1,
                    Node::Pipeline(p) => p.step_count(),
                    Node::Parallel(g) => g.steps.len(),
                })
                .sum::<usize>()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
