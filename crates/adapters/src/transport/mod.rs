// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote transports used by [`RemoteExecutor`](crate::RemoteExecutor)

mod ssh;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use ssh::SshTransport;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, TransportCall};

use async_trait::async_trait;
use kit_core::{HostDescriptor, TransferObserver};
use std::path::Path;
use thiserror::Error;

/// Raw output of a command run on a remote host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Errors from remote transports
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Establishing or using the connection failed; worth retrying
    #[error("connection to {host} failed: {message}")]
    Connection { host: String, message: String },
    #[error("remote execution on {host} failed: {message}")]
    Other { host: String, message: String },
}

impl TransportError {
    pub fn connection(host: &HostDescriptor, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.to_string(),
            message: message.into(),
        }
    }

    pub fn other(host: &HostDescriptor, message: impl Into<String>) -> Self {
        Self::Other {
            host: host.to_string(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Connection { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            TransportError::Connection { message, .. } | TransportError::Other { message, .. } => {
                message
            }
        }
    }
}

/// Carries a prepared shell line to a remote host.
///
/// Implementations own their connections. A transport may keep one
/// connection per [`HostDescriptor`] until [`close`](Self::close) is called,
/// and drops it early once a call fails at the connection level.
#[async_trait]
pub trait RemoteTransport: Send + Sync + 'static {
    async fn exec(
        &self,
        host: &HostDescriptor,
        command_line: &str,
    ) -> Result<RemoteOutput, TransportError>;

    /// Run `command_line` with the contents of `source` on its stdin, reporting
    /// `Update` progress as bytes are sent
    async fn upload(
        &self,
        host: &HostDescriptor,
        command_line: &str,
        source: &Path,
        progress: &dyn TransferObserver,
    ) -> Result<RemoteOutput, TransportError>;

    /// Close every cached connection
    async fn close(&self);
}

/// ssh reports its own failures with exit code 255
pub const SSH_ERROR_EXIT_CODE: i32 = 255;

const TRANSIENT_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "no route to host",
    "network is unreachable",
    "temporary failure in name resolution",
    "could not resolve hostname",
    "broken pipe",
    "ssh_exchange_identification",
    "kex_exchange_identification",
    "connection closed by remote host",
    "control socket",
    "mux_client",
];

/// Whether a finished remote command actually failed at the ssh layer.
///
/// Requires both the 255 exit code and a known connection message, so a remote
/// program that merely exits 255 is not retried.
pub fn is_transient_output(output: &RemoteOutput) -> bool {
    if output.exit_code != SSH_ERROR_EXIT_CODE {
        return false;
    }
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| stderr.contains(p))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
