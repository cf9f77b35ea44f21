// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File transfer progress reporting

use serde::Serialize;

/// One progress notification for a file copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TransferProgress {
    Started { label: String, size: u64 },
    Update { current: u64, total: u64 },
    /// Sent once per copy, whether or not it succeeded
    Finished { label: String },
}

/// Receives progress while an executor copies a file
pub trait TransferObserver: Send + Sync {
    fn notify(&self, progress: TransferProgress);
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferObserver for NoProgress {
    fn notify(&self, _progress: TransferProgress) {}
}

impl<F> TransferObserver for F
where
    F: Fn(TransferProgress) + Send + Sync,
{
    fn notify(&self, progress: TransferProgress) {
        self(progress)
    }
}

/// Human label for a copy, also used as the command of its result
pub fn copy_label(source: &std::path::Path, destination: &str) -> String {
    format!("copy {} -> {}", source.display(), destination)
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
