// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{is_transient_output, RemoteOutput, RemoteTransport, TransportError};
use async_trait::async_trait;
use kit_core::{HostDescriptor, TransferObserver, TransferProgress};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect { host: HostDescriptor },
    Exec { host: HostDescriptor, command_line: String },
    Upload {
        host: HostDescriptor,
        command_line: String,
        source: PathBuf,
    },
    Close,
}

#[derive(Default)]
struct FakeTransportState {
    calls: Vec<TransportCall>,
    connected: HashSet<HostDescriptor>,
    /// Queued failures consumed one per exec, before any output
    failures: VecDeque<TransportError>,
    outputs: VecDeque<RemoteOutput>,
    delay: Option<Duration>,
}

/// In-memory transport that records calls and replays scripted outcomes.
///
/// A connection is "opened" the first time a host is used and reused until a
/// connection failure or ssh-level output evicts it, mirroring
/// [`SshTransport`](super::SshTransport). Uploads report the source size as a
/// single progress update without reading the file contents.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransportCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Number of connections opened so far
    pub fn connects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Connect { .. }))
            .count()
    }

    /// Fail the next exec with a connection error
    pub fn fail_connection(&self, message: &str) {
        let host = HostDescriptor::new("fake");
        self.push_failure(TransportError::connection(&host, message));
    }

    pub fn push_failure(&self, err: TransportError) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failures
            .push_back(err);
    }

    /// Queue output for the next successful exec; defaults to exit 0 and no output
    pub fn push_output(&self, output: RemoteOutput) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .outputs
            .push_back(output);
    }

    /// Make every exec wait before answering
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).delay = Some(delay);
    }
}

impl FakeTransport {
    async fn answer(
        &self,
        host: &HostDescriptor,
        call: TransportCall,
    ) -> Result<RemoteOutput, TransportError> {
        let (delay, outcome) = {
            let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if state.connected.insert(host.clone()) {
                state.calls.push(TransportCall::Connect { host: host.clone() });
            }
            state.calls.push(call);
            let outcome = match state.failures.pop_front() {
                Some(err) => Err(err),
                None => Ok(state.outputs.pop_front().unwrap_or_default()),
            };
            let broken = match &outcome {
                Ok(output) => is_transient_output(output),
                Err(e) => e.is_transient(),
            };
            if broken {
                state.connected.remove(host);
            }
            (state.delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

#[async_trait]
impl RemoteTransport for FakeTransport {
    async fn exec(
        &self,
        host: &HostDescriptor,
        command_line: &str,
    ) -> Result<RemoteOutput, TransportError> {
        let call = TransportCall::Exec {
            host: host.clone(),
            command_line: command_line.to_string(),
        };
        self.answer(host, call).await
    }

    async fn upload(
        &self,
        host: &HostDescriptor,
        command_line: &str,
        source: &Path,
        progress: &dyn TransferObserver,
    ) -> Result<RemoteOutput, TransportError> {
        let call = TransportCall::Upload {
            host: host.clone(),
            command_line: command_line.to_string(),
            source: source.to_path_buf(),
        };
        let outcome = self.answer(host, call).await;
        if outcome.is_ok() {
            let size = tokio::fs::metadata(source).await.map(|m| m.len()).unwrap_or(0);
            progress.notify(TransferProgress::Update {
                current: size,
                total: size,
            });
        }
        outcome
    }

    async fn close(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.connected.clear();
        state.calls.push(TransportCall::Close);
    }
}
