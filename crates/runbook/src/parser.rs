// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook TOML parsing

use crate::stack::StackDef;
use crate::stage::StageDef;
use crate::task::{StepAction, StepDef, TaskDef, DEFAULT_MAX_CHECKS, DEFAULT_WAIT_INTERVAL};
use kit_core::{
    FailurePolicy, HostDescriptor, KnownHostsPolicy, RetryPolicy, SshOptions, Target,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use toml::value::Table;

/// Errors that can occur during runbook parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Values applied to every invocation before stage and command-line overrides
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
    /// Relative to the project root
    pub working_dir: Option<String>,
    pub env: BTreeMap<String, String>,
    pub vars: BTreeMap<String, Value>,
}

/// A parsed runbook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Runbook {
    pub defaults: Defaults,
    pub ssh: SshOptions,
    pub retry: RetryPolicy,
    pub stages: BTreeMap<String, StageDef>,
    pub stacks: BTreeMap<String, StackDef>,
    pub tasks: BTreeMap<String, TaskDef>,
}

impl Runbook {
    /// Get a task definition by name
    pub fn get_task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    /// Get a stage definition by name
    pub fn get_stage(&self, name: &str) -> Option<&StageDef> {
        self.stages.get(name)
    }

    pub fn get_stack(&self, name: &str) -> Option<&StackDef> {
        self.stacks.get(name)
    }
}

/// Parse a runbook from TOML content
pub fn parse_runbook(content: &str) -> Result<Runbook, ParseError> {
    let raw: toml::Value = toml::from_str(content)?;
    let table = raw
        .as_table()
        .ok_or_else(|| ParseError::InvalidFormat("root must be a table".to_string()))?;

    let mut runbook = Runbook::default();

    if let Some(value) = table.get("defaults") {
        runbook.defaults = parse_defaults(value)?;
    }

    if let Some(value) = table.get("ssh") {
        let ssh = as_table(value, "ssh")?;
        runbook.ssh = SshOptions {
            known_hosts: match str_field(ssh, "known_hosts", "ssh")? {
                Some(s) => s
                    .parse::<KnownHostsPolicy>()
                    .map_err(|e| ParseError::InvalidFormat(format!("ssh.known_hosts: {}", e)))?,
                None => Default::default(),
            },
            connect_timeout: duration_field(ssh, "connect_timeout", "ssh")?,
        };
    }

    if let Some(value) = table.get("retry") {
        let retry = as_table(value, "retry")?;
        let defaults = RetryPolicy::default();
        runbook.retry = RetryPolicy {
            attempts: match retry.get("attempts") {
                Some(v) => v
                    .as_integer()
                    .filter(|n| *n >= 1 && *n <= i64::from(u32::MAX))
                    .map(|n| n as u32)
                    .ok_or_else(|| {
                        ParseError::InvalidFormat(
                            "retry.attempts must be a positive integer".to_string(),
                        )
                    })?,
                None => defaults.attempts,
            },
            backoff: duration_field(retry, "backoff", "retry")?.unwrap_or(defaults.backoff),
        };
    }

    if let Some(stages) = table.get("stage") {
        for (name, value) in as_table(stages, "stage")? {
            let stage = parse_stage(name, value)?;
            runbook.stages.insert(name.clone(), stage);
        }
    }

    if let Some(stacks) = table.get("stack") {
        for (name, value) in as_table(stacks, "stack")? {
            let ctx = format!("stack.{}", name);
            let stack = as_table(value, &ctx)?;
            runbook.stacks.insert(
                name.clone(),
                StackDef {
                    name: name.clone(),
                    basedir: str_field(stack, "basedir", &ctx)?,
                    env: string_map(stack, "env", &ctx)?,
                    vars: value_map(stack, "vars", &ctx)?,
                },
            );
        }
    }

    if let Some(tasks) = table.get("task") {
        for (name, value) in as_table(tasks, "task")? {
            let task = parse_task(name, value)?;
            runbook.tasks.insert(name.clone(), task);
        }
    }

    Ok(runbook)
}

fn parse_defaults(value: &toml::Value) -> Result<Defaults, ParseError> {
    let table = as_table(value, "defaults")?;
    Ok(Defaults {
        working_dir: str_field(table, "working_dir", "defaults")?,
        env: string_map(table, "env", "defaults")?,
        vars: value_map(table, "vars", "defaults")?,
    })
}

fn parse_stage(name: &str, value: &toml::Value) -> Result<StageDef, ParseError> {
    let ctx = format!("stage.{}", name);
    let table = as_table(value, &ctx)?;

    let host = str_field(table, "host", &ctx)?
        .map(|h| {
            h.parse::<HostDescriptor>()
                .map_err(|e| ParseError::InvalidFormat(format!("{}.host: {}", ctx, e)))
        })
        .transpose()?;

    // A host implies a remote stage unless stated otherwise
    let kind = match str_field(table, "type", &ctx)? {
        Some(t) => t
            .parse::<Target>()
            .map_err(|e| ParseError::InvalidFormat(format!("{}.type: {}", ctx, e)))?,
        None if host.is_some() => Target::Remote,
        None => Target::Local,
    };

    Ok(StageDef {
        name: name.to_string(),
        kind,
        host,
        basedir: str_field(table, "basedir", &ctx)?,
        default: bool_field(table, "default", &ctx)?.unwrap_or(false),
        env: string_map(table, "env", &ctx)?,
        vars: value_map(table, "vars", &ctx)?,
    })
}

fn parse_task(name: &str, value: &toml::Value) -> Result<TaskDef, ParseError> {
    let ctx = format!("task.{}", name);
    let table = as_table(value, &ctx)?;

    let on_failure = match str_field(table, "on_failure", &ctx)? {
        Some(s) => s
            .parse::<FailurePolicy>()
            .map_err(|e| ParseError::InvalidFormat(format!("{}.on_failure: {}", ctx, e)))?,
        None => FailurePolicy::default(),
    };

    let mut steps = Vec::new();

    // Shorthand: run = "cmd" or run = ["cmd", ...] on the task itself
    match table.get("run") {
        Some(toml::Value::String(cmd)) => steps.push(StepDef::run(cmd.clone(), cmd.clone())),
        Some(toml::Value::Array(cmds)) => {
            for (i, cmd) in cmds.iter().enumerate() {
                let cmd = cmd.as_str().ok_or_else(|| {
                    ParseError::InvalidFormat(format!("{}.run[{}] must be a string", ctx, i))
                })?;
                steps.push(StepDef::run(cmd, cmd));
            }
        }
        Some(_) => {
            return Err(ParseError::InvalidFormat(format!(
                "{}.run must be a string or an array of strings",
                ctx
            )))
        }
        None => {}
    }

    // Support both "step" (from [[task.X.step]]) and "steps" key names
    if let Some(arr) = table.get("step").or_else(|| table.get("steps")) {
        let arr = arr.as_array().ok_or_else(|| {
            ParseError::InvalidFormat(format!("{}.step must be an array of tables", ctx))
        })?;
        for (i, value) in arr.iter().enumerate() {
            steps.push(parse_step(&format!("{}.step[{}]", ctx, i), value, true)?);
        }
    }

    if steps.is_empty() {
        return Err(ParseError::MissingField(format!("{}.step", ctx)));
    }

    Ok(TaskDef {
        name: name.to_string(),
        description: str_field(table, "description", &ctx)?,
        on_failure,
        cwd: str_field(table, "cwd", &ctx)?,
        env: string_map(table, "env", &ctx)?,
        vars: value_map(table, "vars", &ctx)?,
        only: target_field(table, "only", &ctx)?,
        stages: str_array(table, "stages", &ctx)?,
        stacks: str_array(table, "stacks", &ctx)?,
        pre: str_field(table, "pre", &ctx)?,
        post: str_field(table, "post", &ctx)?,
        steps,
    })
}

fn parse_step(ctx: &str, value: &toml::Value, allow_nesting: bool) -> Result<StepDef, ParseError> {
    let table = as_table(value, ctx)?;

    let run = str_field(table, "run", ctx)?;
    let task = str_field(table, "task", ctx)?;
    let wait_for = str_field(table, "wait_for", ctx)?;
    let copy = str_field(table, "copy", ctx)?;
    let parallel = table.get("parallel");

    let set = [
        run.is_some(),
        task.is_some(),
        wait_for.is_some(),
        copy.is_some(),
        parallel.is_some(),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    if set == 0 {
        return Err(ParseError::MissingField(format!(
            "{}: one of run, task, parallel, wait_for, copy",
            ctx
        )));
    }
    if set > 1 {
        return Err(ParseError::InvalidFormat(format!(
            "{}: only one of run, task, parallel, wait_for, copy may be set",
            ctx
        )));
    }

    let (default_name, action) = if let Some(cmd) = run {
        (cmd.clone(), StepAction::Run(cmd))
    } else if let Some(task) = task {
        if !allow_nesting {
            return Err(ParseError::InvalidFormat(format!(
                "{}: task references are not allowed inside a parallel group",
                ctx
            )));
        }
        (task.clone(), StepAction::Task(task))
    } else if let Some(cmd) = wait_for {
        let interval = duration_field(table, "interval", ctx)?.unwrap_or(DEFAULT_WAIT_INTERVAL);
        let max_checks = match table.get("max_checks") {
            Some(v) => v
                .as_integer()
                .filter(|n| *n >= 1 && *n <= i64::from(u32::MAX))
                .map(|n| n as u32)
                .ok_or_else(|| {
                    ParseError::InvalidFormat(format!(
                        "{}.max_checks must be a positive integer",
                        ctx
                    ))
                })?,
            None => DEFAULT_MAX_CHECKS,
        };
        (
            format!("wait for {}", cmd),
            StepAction::WaitFor {
                command: cmd,
                interval,
                max_checks,
            },
        )
    } else if let Some(source) = copy {
        let destination = str_field(table, "to", ctx)?
            .ok_or_else(|| ParseError::MissingField(format!("{}.to", ctx)))?;
        (
            format!("copy {}", source),
            StepAction::Copy {
                source,
                destination,
            },
        )
    } else {
        if !allow_nesting {
            return Err(ParseError::InvalidFormat(format!(
                "{}: parallel groups cannot be nested",
                ctx
            )));
        }
        let members = parallel
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ParseError::InvalidFormat(format!("{}.parallel must be an array of tables", ctx))
            })?
            .iter()
            .enumerate()
            .map(|(i, v)| parse_step(&format!("{}.parallel[{}]", ctx, i), v, false))
            .collect::<Result<Vec<_>, _>>()?;
        let max_workers = match table.get("max_workers") {
            Some(v) => Some(
                v.as_integer()
                    .filter(|n| *n >= 1)
                    .map(|n| n as usize)
                    .ok_or_else(|| {
                        ParseError::InvalidFormat(format!(
                            "{}.max_workers must be a positive integer",
                            ctx
                        ))
                    })?,
            ),
            None => None,
        };
        (
            "parallel".to_string(),
            StepAction::Parallel {
                steps: members,
                max_workers,
            },
        )
    };

    Ok(StepDef {
        name: str_field(table, "name", ctx)?.unwrap_or(default_name),
        action,
        rollback: str_field(table, "rollback", ctx)?,
        allow_failure: bool_field(table, "allow_failure", ctx)?.unwrap_or(false),
        timeout: duration_field(table, "timeout", ctx)?,
        local: bool_field(table, "local", ctx)?.unwrap_or(false),
        only: target_field(table, "only", ctx)?,
        creates: str_field(table, "creates", ctx)?,
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn as_table<'a>(value: &'a toml::Value, ctx: &str) -> Result<&'a Table, ParseError> {
    value
        .as_table()
        .ok_or_else(|| ParseError::InvalidFormat(format!("{} must be a table", ctx)))
}

fn str_field(table: &Table, key: &str, ctx: &str) -> Result<Option<String>, ParseError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::InvalidFormat(format!(
            "{}.{} must be a string",
            ctx, key
        ))),
    }
}

fn bool_field(table: &Table, key: &str, ctx: &str) -> Result<Option<bool>, ParseError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Err(ParseError::InvalidFormat(format!(
            "{}.{} must be a boolean",
            ctx, key
        ))),
    }
}

fn target_field(table: &Table, key: &str, ctx: &str) -> Result<Option<Target>, ParseError> {
    str_field(table, key, ctx)?
        .map(|s| {
            s.parse::<Target>()
                .map_err(|e| ParseError::InvalidFormat(format!("{}.{}: {}", ctx, key, e)))
        })
        .transpose()
}

fn str_array(table: &Table, key: &str, ctx: &str) -> Result<Vec<String>, ParseError> {
    match table.get(key) {
        None => Ok(Vec::new()),
        Some(toml::Value::String(s)) => Ok(vec![s.clone()]),
        Some(toml::Value::Array(arr)) => arr
            .iter()
            .map(|v| {
                v.as_str().map(String::from).ok_or_else(|| {
                    ParseError::InvalidFormat(format!("{}.{} must contain strings", ctx, key))
                })
            })
            .collect(),
        Some(_) => Err(ParseError::InvalidFormat(format!(
            "{}.{} must be an array of strings",
            ctx, key
        ))),
    }
}

/// Durations are humantime strings ("500ms", "5m") or integer seconds
fn duration_field(table: &Table, key: &str, ctx: &str) -> Result<Option<Duration>, ParseError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::String(s)) => humantime::parse_duration(s)
            .map(Some)
            .map_err(|e| ParseError::InvalidFormat(format!("{}.{}: {}", ctx, key, e))),
        Some(toml::Value::Integer(n)) if *n >= 0 => Ok(Some(Duration::from_secs(*n as u64))),
        Some(_) => Err(ParseError::InvalidFormat(format!(
            "{}.{} must be a duration such as \"30s\"",
            ctx, key
        ))),
    }
}

/// Environment tables: scalar values are stringified
fn string_map(table: &Table, key: &str, ctx: &str) -> Result<BTreeMap<String, String>, ParseError> {
    let Some(value) = table.get(key) else {
        return Ok(BTreeMap::new());
    };
    let map = as_table(value, &format!("{}.{}", ctx, key))?;
    map.iter()
        .map(|(k, v)| {
            let s = match v {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(n) => n.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => {
                    return Err(ParseError::InvalidFormat(format!(
                        "{}.{}.{} must be a scalar",
                        ctx, key, k
                    )))
                }
            };
            Ok((k.clone(), s))
        })
        .collect()
}

fn value_map(table: &Table, key: &str, ctx: &str) -> Result<BTreeMap<String, Value>, ParseError> {
    let Some(value) = table.get(key) else {
        return Ok(BTreeMap::new());
    };
    let map = as_table(value, &format!("{}.{}", ctx, key))?;
    map.iter()
        .map(|(k, v)| {
            serde_json::to_value(v)
                .map(|json| (k.clone(), json))
                .map_err(|e| ParseError::InvalidFormat(format!("{}.{}.{}: {}", ctx, key, k, e)))
        })
        .collect()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
