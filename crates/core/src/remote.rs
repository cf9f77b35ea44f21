// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote connection settings shared by configuration and transports

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded retry for transient connection failures.
///
/// `attempts` counts the first try, so `attempts = 1` disables retrying.
/// The delay before retry `n` is `backoff * 2^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exp)
    }
}

/// How unknown host keys are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownHostsPolicy {
    /// Refuse hosts not already in known_hosts
    #[default]
    Strict,
    /// Add new hosts, refuse changed keys
    Add,
    /// Accept any key
    Accept,
}

impl std::str::FromStr for KnownHostsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(KnownHostsPolicy::Strict),
            "add" => Ok(KnownHostsPolicy::Add),
            "accept" => Ok(KnownHostsPolicy::Accept),
            other => Err(format!(
                "unknown policy '{}', expected strict, add or accept",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    #[serde(default)]
    pub known_hosts: KnownHostsPolicy,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
