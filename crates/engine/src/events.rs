// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events emitted while a pipeline runs.
//!
//! The runner sends these over an unbounded channel so a front end can
//! render live progress without coupling to the runner's internals.

use crate::report::RunStatus;
use kit_core::{TransferObserver, TransferProgress};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    PipelineStarted {
        name: String,
        depth: usize,
    },
    PipelineFinished {
        name: String,
        depth: usize,
        status: RunStatus,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    StepStarted {
        name: String,
        depth: usize,
    },
    StepFinished {
        name: String,
        depth: usize,
        /// `success`, `skipped` or `failed`
        status: String,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    RollbackStarted {
        pipeline: String,
    },
    RollbackFinished {
        name: String,
        status: String,
    },
    Cancelled {
        pipeline: String,
    },
    TransferStarted {
        step: String,
        label: String,
        size: u64,
    },
    TransferProgress {
        step: String,
        current: u64,
        total: u64,
    },
    TransferFinished {
        step: String,
        label: String,
    },
}

pub type EventSender = mpsc::UnboundedSender<RunEvent>;

/// Send an event if anyone is listening. A closed receiver is not an error.
pub(crate) fn emit(events: Option<&EventSender>, event: RunEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Forwards a step's copy progress as transfer events
pub(crate) struct StepTransfers<'a> {
    pub step: &'a str,
    pub events: Option<&'a EventSender>,
}

impl TransferObserver for StepTransfers<'_> {
    fn notify(&self, progress: TransferProgress) {
        let step = self.step.to_string();
        let event = match progress {
            TransferProgress::Started { label, size } => RunEvent::TransferStarted { step, label, size },
            TransferProgress::Update { current, total } => {
                RunEvent::TransferProgress { step, current, total }
            }
            TransferProgress::Finished { label } => RunEvent::TransferFinished { step, label },
        };
        emit(self.events, event);
    }
}
