// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context threaded through a pipeline run
//!
//! A [`Context`] is never mutated once built. Every `with_*` helper and
//! [`Context::derive`] return a fresh value, leaving the parent untouched,
//! so nested pipelines can override fields without any locking.

use crate::host::HostDescriptor;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type CapabilityMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

#[derive(Clone)]
pub struct Context {
    working_dir: PathBuf,
    env: BTreeMap<String, String>,
    dry_run: bool,
    host: Option<HostDescriptor>,
    extra: BTreeMap<String, Value>,
    capabilities: Arc<CapabilityMap>,
}

/// Field overrides applied by [`Context::derive`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOverrides {
    /// Relative paths resolve against the parent's working directory
    pub working_dir: Option<PathBuf>,
    /// Merged over the parent's environment
    pub env: BTreeMap<String, String>,
    pub dry_run: Option<bool>,
    /// `Some(None)` clears the host, forcing local execution
    pub host: Option<Option<HostDescriptor>>,
    /// Merged over the parent's extra values
    pub extra: BTreeMap<String, Value>,
}

impl ContextOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Context {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
            dry_run: false,
            host: None,
            extra: BTreeMap::new(),
            capabilities: Arc::new(HashMap::new()),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn host(&self) -> Option<&HostDescriptor> {
        self.host.as_ref()
    }

    pub fn is_remote(&self) -> bool {
        self.host.is_some()
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn get_extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Produce a child context with `overrides` applied
    pub fn derive(&self, overrides: &ContextOverrides) -> Self {
        let mut child = self.clone();
        if let Some(dir) = &overrides.working_dir {
            child.working_dir = self.working_dir.join(dir);
        }
        child
            .env
            .extend(overrides.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(dry_run) = overrides.dry_run {
            child.dry_run = dry_run;
        }
        if let Some(host) = &overrides.host {
            child.host = host.clone();
        }
        child
            .extra
            .extend(overrides.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        child
    }

    pub fn with_host(&self, host: HostDescriptor) -> Self {
        let mut child = self.clone();
        child.host = Some(host);
        child
    }

    /// Drop the host so commands run locally
    pub fn without_host(&self) -> Self {
        let mut child = self.clone();
        child.host = None;
        child
    }

    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        let mut child = self.clone();
        child.dry_run = dry_run;
        child
    }

    pub fn with_working_dir(&self, dir: impl AsRef<Path>) -> Self {
        let mut child = self.clone();
        child.working_dir = self.working_dir.join(dir);
        child
    }

    pub fn with_env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.env.insert(key.into(), value.into());
        child
    }

    pub fn with_extra(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut child = self.clone();
        child.extra.insert(key.into(), value.into());
        child
    }

    /// Attach a typed collaborator (e.g. a cloud SDK client) for custom steps.
    /// Replaces any capability of the same type.
    pub fn with_capability<T: Any + Send + Sync>(&self, capability: T) -> Self {
        let mut map: CapabilityMap = (*self.capabilities).clone();
        map.insert(TypeId::of::<T>(), Arc::new(capability));
        let mut child = self.clone();
        child.capabilities = Arc::new(map);
        child
    }

    pub fn capability<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.capabilities
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|c| c.downcast::<T>().ok())
    }

    /// String view of `extra`, used for `{name}` interpolation.
    ///
    /// Strings are used verbatim; other JSON values use their compact encoding.
    pub fn template_vars(&self) -> HashMap<String, String> {
        self.extra
            .iter()
            .map(|(k, v)| {
                let s = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), s)
            })
            .collect()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("dry_run", &self.dry_run)
            .field("host", &self.host)
            .field("extra", &self.extra)
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
