// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runbook discovery and loading.
//!
//! A project is marked by a `kit.toml` file or a `.kit/` directory. Every
//! `*.toml` under `.kit/` is parsed in file name order and merged; a task or
//! stage defined twice is an error. Settings tables (`defaults`, `ssh`,
//! `retry`) are taken from the last file that sets them.

use crate::parser::{parse_runbook, ParseError, Runbook};
use crate::validator::{validate_runbook, ValidationErrors};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides project root discovery
pub const PROJECT_ROOT_ENV: &str = "KIT_PROJECT_ROOT";
pub const RUNBOOK_FILE: &str = "kit.toml";
pub const RUNBOOK_DIR: &str = ".kit";

/// Errors that can occur during runbook loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("{kind} '{name}' is defined in more than one file (second in {})", .path.display())]
    Duplicate {
        kind: &'static str,
        name: String,
        path: PathBuf,
    },

    #[error("no kit.toml or .kit/ found in {} or any parent directory", .0.display())]
    NotFound(PathBuf),
}

/// A loaded project: where it lives and what it defines
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub runbook: Runbook,
}

/// Walk up from `start` to the first directory holding `kit.toml` or `.kit/`.
///
/// `KIT_PROJECT_ROOT` takes precedence when set.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        if !root.is_empty() {
            return Some(PathBuf::from(root));
        }
    }

    let mut current = start.to_path_buf();
    loop {
        if current.join(RUNBOOK_FILE).is_file() || current.join(RUNBOOK_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Runbook files belonging to the project at `root`
pub fn runbook_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    let single = root.join(RUNBOOK_FILE);
    if single.is_file() {
        files.push(single);
    }

    let dir = root.join(RUNBOOK_DIR);
    if dir.is_dir() {
        let entries = std::fs::read_dir(&dir).map_err(|source| LoadError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Parse and merge the given files, then validate the result
pub fn load_files(files: &[PathBuf]) -> Result<Runbook, LoadError> {
    let mut merged = Runbook::default();
    for path in files {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let runbook = parse_runbook(&content).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?;
        merge(&mut merged, runbook, path, &content)?;
        tracing::debug!(path = %path.display(), "loaded runbook file");
    }
    validate_runbook(&merged)?;
    Ok(merged)
}

/// Load from an explicit file, or discover the project from `cwd`
pub fn load_project(config: Option<&Path>, cwd: &Path) -> Result<Project, LoadError> {
    if let Some(path) = config {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        let runbook = load_files(std::slice::from_ref(&path))?;
        return Ok(Project {
            root,
            files: vec![path],
            runbook,
        });
    }

    let root = find_project_root(cwd).ok_or_else(|| LoadError::NotFound(cwd.to_path_buf()))?;
    let files = runbook_files(&root)?;
    if files.is_empty() {
        return Err(LoadError::NotFound(root));
    }
    let runbook = load_files(&files)?;
    Ok(Project {
        root,
        files,
        runbook,
    })
}

fn merge(
    into: &mut Runbook,
    from: Runbook,
    path: &Path,
    content: &str,
) -> Result<(), LoadError> {
    for (name, task) in from.tasks {
        if into.tasks.contains_key(&name) {
            return Err(LoadError::Duplicate {
                kind: "task",
                name,
                path: path.to_path_buf(),
            });
        }
        into.tasks.insert(name, task);
    }
    for (name, stage) in from.stages {
        if into.stages.contains_key(&name) {
            return Err(LoadError::Duplicate {
                kind: "stage",
                name,
                path: path.to_path_buf(),
            });
        }
        into.stages.insert(name, stage);
    }

    // Only override settings a file actually declares
    let declared = toml::from_str::<toml::Table>(content).unwrap_or_default();
    if declared.contains_key("defaults") {
        into.defaults = from.defaults;
    }
    if declared.contains_key("ssh") {
        into.ssh = from.ssh;
    }
    if declared.contains_key("retry") {
        into.retry = from.retry;
    }
    Ok(())
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
