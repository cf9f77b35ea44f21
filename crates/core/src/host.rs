// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote execution targets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies a remote host. Absent on a [`Context`](crate::Context) means local execution.
///
/// Equality and hashing cover all three fields, so two descriptors that differ only
/// in user or port are distinct connection targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostDescriptor {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl HostDescriptor {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            user: None,
            port: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The `[user@]address` part, as accepted by `ssh`
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.address),
            None => self.address.clone(),
        }
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if self.address.contains(':') {
            write!(f, "[{}]", self.address)?;
        } else {
            write!(f, "{}", self.address)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Errors from parsing a `[user@]address[:port]` descriptor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostParseError {
    #[error("host descriptor is empty")]
    Empty,
    #[error("empty user in host descriptor '{0}'")]
    EmptyUser(String),
    #[error("empty address in host descriptor '{0}'")]
    EmptyAddress(String),
    #[error("invalid port '{port}' in host descriptor '{input}'")]
    InvalidPort { input: String, port: String },
    #[error("unterminated '[' in host descriptor '{0}'")]
    UnterminatedBracket(String),
}

impl FromStr for HostDescriptor {
    type Err = HostParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() {
            return Err(HostParseError::Empty);
        }

        let (user, rest) = match s.rsplit_once('@') {
            Some(("", _)) => return Err(HostParseError::EmptyUser(input.to_string())),
            Some((user, rest)) => (Some(user.to_string()), rest),
            None => (None, s),
        };

        // Bracketed IPv6: [::1]:2222
        let (address, port) = if let Some(inner) = rest.strip_prefix('[') {
            let (address, tail) = inner
                .split_once(']')
                .ok_or_else(|| HostParseError::UnterminatedBracket(input.to_string()))?;
            let port = match tail {
                "" => None,
                t => Some(t.strip_prefix(':').unwrap_or(t)),
            };
            (address, port)
        } else {
            match rest.rsplit_once(':') {
                // A bare IPv6 address has several colons and no port
                Some((addr, _)) if addr.contains(':') => (rest, None),
                Some((addr, port)) => (addr, Some(port)),
                None => (rest, None),
            }
        };

        if address.is_empty() {
            return Err(HostParseError::EmptyAddress(input.to_string()));
        }

        let port = port
            .map(|p| {
                p.parse::<u16>().map_err(|_| HostParseError::InvalidPort {
                    input: input.to_string(),
                    port: p.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            address: address.to_string(),
            user,
            port,
        })
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
