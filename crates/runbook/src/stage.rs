// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stages: named execution targets selected at startup

use crate::parser::Runbook;
use kit_core::{HostDescriptor, Target};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Name of the stage used when the runbook declares none
pub const IMPLICIT_STAGE: &str = "local";

/// Remote stages without a `basedir` run from the login directory
pub const DEFAULT_BASEDIR: &str = "~";

#[derive(Debug, Clone, PartialEq)]
pub struct StageDef {
    pub name: String,
    pub kind: Target,
    pub host: Option<HostDescriptor>,
    pub basedir: Option<String>,
    pub default: bool,
    pub env: BTreeMap<String, String>,
    pub vars: BTreeMap<String, Value>,
}

impl StageDef {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Target::Local,
            host: None,
            basedir: None,
            default: false,
            env: BTreeMap::new(),
            vars: BTreeMap::new(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.kind == Target::Remote
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("unknown stage '{name}' (available: {})", .available.join(", "))]
    Unknown {
        name: String,
        available: Vec<String>,
    },
    #[error("several stages are defined but none is marked default: {}", .0.join(", "))]
    NoDefault(Vec<String>),
    #[error("unknown stack '{name}' (available: {})", .available.join(", "))]
    UnknownStack {
        name: String,
        available: Vec<String>,
    },
}

/// Pick the stage for this invocation.
///
/// An explicit name must exist. Otherwise: no stages yields an implicit local
/// stage, a single stage is used as-is, and with several the one marked
/// `default = true` wins.
pub fn select_stage(runbook: &Runbook, requested: Option<&str>) -> Result<StageDef, StageError> {
    if let Some(name) = requested {
        if runbook.stages.is_empty() && name == IMPLICIT_STAGE {
            return Ok(StageDef::local(IMPLICIT_STAGE));
        }
        return runbook
            .stages
            .get(name)
            .cloned()
            .ok_or_else(|| StageError::Unknown {
                name: name.to_string(),
                available: runbook.stages.keys().cloned().collect(),
            });
    }

    let mut stages = runbook.stages.values();
    match (stages.next(), stages.next()) {
        (None, _) => Ok(StageDef::local(IMPLICIT_STAGE)),
        (Some(only), None) => Ok(only.clone()),
        _ => runbook
            .stages
            .values()
            .find(|s| s.default)
            .cloned()
            .ok_or_else(|| StageError::NoDefault(runbook.stages.keys().cloned().collect())),
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
