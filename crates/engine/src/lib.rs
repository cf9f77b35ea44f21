// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kit pipeline engine: steps, pipelines, the runner and the task registry

mod error;
mod events;
mod outcome;
mod pipeline;
mod registry;
mod report;
mod runner;
mod setup;
mod step;

pub use error::{RegistryError, RunError};
pub use events::{EventSender, RunEvent};
pub use outcome::{FailureKind, StepFailure, StepOutcome};
pub use pipeline::{Node, ParallelGroup, Pipeline};
pub use registry::{Task, TaskFilter, TaskRegistry};
pub use report::{GroupReport, NodeReport, PipelineReport, RollbackReport, RunStatus, StepReport};
pub use runner::Runner;
pub use setup::{prepare, root_context, Invocation, Plan};
pub use step::{Action, CustomAction, Step};
