// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command results and per-call options

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of a single executed (or dry-run) command. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    command: String,
    exit_code: i32,
    #[serde(serialize_with = "serialize_lossy")]
    stdout: Vec<u8>,
    #[serde(serialize_with = "serialize_lossy")]
    stderr: Vec<u8>,
    #[serde(with = "humantime_serde")]
    duration: Duration,
    timed_out: bool,
    dry_run: bool,
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(bytes))
}

/// Exit code reported for a command killed by its timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

impl CommandResult {
    pub fn new(
        command: impl Into<String>,
        exit_code: i32,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code,
            stdout,
            stderr,
            duration,
            timed_out: false,
            dry_run: false,
        }
    }

    /// Synthetic result recorded instead of executing `command`.
    ///
    /// `record` is the human-readable line describing what would have run.
    pub fn dry_run(command: impl Into<String>, record: impl Into<String>) -> Self {
        let mut stdout = record.into().into_bytes();
        stdout.push(b'\n');
        Self {
            command: command.into(),
            exit_code: 0,
            stdout,
            stderr: Vec::new(),
            duration: Duration::ZERO,
            timed_out: false,
            dry_run: true,
        }
    }

    /// Result for a command terminated after exceeding its timeout
    pub fn timeout(
        command: impl Into<String>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        duration: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code: TIMEOUT_EXIT_CODE,
            stdout,
            stderr,
            duration,
            timed_out: true,
            dry_run: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Execution target a step or task may be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Local,
    Remote,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local => write!(f, "local"),
            Target::Remote => write!(f, "remote"),
        }
    }
}

/// Per-call options for an executor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Return the result even on a non-zero exit instead of failing
    pub allow_failure: bool,
    pub timeout: Option<Duration>,
    /// Run on the local machine even when the context targets a remote host
    pub local: bool,
}

impl RunOptions {
    pub fn allow_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Target::Local),
            "remote" => Ok(Target::Remote),
            other => Err(format!("unknown target '{}', expected local or remote", other)),
        }
    }
}

impl Target {
    /// Whether a context with (or without) a host matches this target
    pub fn matches(self, remote: bool) -> bool {
        match self {
            Target::Local => !remote,
            Target::Remote => remote,
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
