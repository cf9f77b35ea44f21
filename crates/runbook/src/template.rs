// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{name}` placeholders in runbook commands
//!
//! Placeholders are filled from the context's template variables before the
//! command reaches the shell. Anything introduced by `$` (`$NAME`, `${NAME}`,
//! `${NAME:-default}`) is shell syntax and passes through untouched, so the
//! shell expands it against the environment the executor hands it.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

// The optional `$` is captured so shell parameter expansions can be skipped;
// the regex crate has no look-behind.
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// A piece of a command template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let is_shell = caps.get(1).is_some_and(|m| !m.is_empty());
        if is_shell {
            continue;
        }
        if whole.start() > last {
            out.push(Segment::Literal(&template[last..whole.start()]));
        }
        out.push(Segment::Placeholder(name.as_str()));
        last = whole.end();
    }
    if last < template.len() {
        out.push(Segment::Literal(&template[last..]));
    }
    out
}

/// Fill `{name}` placeholders from `vars`.
///
/// Placeholders without a value stay as written.
pub fn interpolate(template: &str, vars: &HashMap<String, String>) -> String {
    let mut rendered = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => rendered.push_str(text),
            Segment::Placeholder(name) => match vars.get(name) {
                Some(value) => rendered.push_str(value),
                None => {
                    rendered.push('{');
                    rendered.push_str(name);
                    rendered.push('}');
                }
            },
        }
    }
    rendered
}

/// Names of every `{name}` placeholder in `template`
pub fn placeholders(template: &str) -> BTreeSet<String> {
    segments(template)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.to_string()),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Placeholders in `template` that `vars` does not define
pub fn missing_vars(template: &str, vars: &HashMap<String, String>) -> BTreeSet<String> {
    placeholders(template)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .collect()
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
