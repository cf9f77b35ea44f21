// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline failure policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a pipeline does when one of its direct children fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failure
    #[default]
    Abort,
    /// Run every child, fail at the end if any failed
    Continue,
    /// Stop at the first failure and undo executed children in reverse
    Rollback,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::Rollback => write!(f, "rollback"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            "rollback" => Ok(FailurePolicy::Rollback),
            other => Err(format!(
                "unknown failure policy '{}', expected abort, continue or rollback",
                other
            )),
        }
    }
}
