// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Runbook parsing, validation and discovery

mod loader;
mod parser;
mod stack;
mod stage;
mod task;
mod template;
mod validator;

pub use loader::{
    find_project_root, load_files, load_project, runbook_files, LoadError, Project,
    PROJECT_ROOT_ENV, RUNBOOK_DIR, RUNBOOK_FILE,
};
pub use parser::{parse_runbook, Defaults, ParseError, Runbook};
pub use stack::{select_stack, StackDef};
pub use stage::{select_stage, StageDef, StageError, DEFAULT_BASEDIR, IMPLICIT_STAGE};
pub use task::{StepAction, StepDef, TaskDef, DEFAULT_MAX_CHECKS, DEFAULT_WAIT_INTERVAL};
pub use template::{interpolate, missing_vars, placeholders};
pub use validator::{validate_runbook, ValidationError, ValidationErrors};
