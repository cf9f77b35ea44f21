// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kit completions` - shell completion scripts
//!
//! Scripts cover subcommands and flags. Task names live in the project, so
//! `kit completions --tasks` prints them one per line for shell functions
//! that complete `kit run <TAB>`:
//!
//! ```bash
//! kit completions bash > ~/.local/share/bash-completion/completions/kit
//! kit completions zsh > ~/.zfunc/_kit
//! ```

use crate::commands;
use crate::commands::Globals;
use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io::Write;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate a script for
    #[arg(value_enum, required_unless_present = "tasks")]
    pub shell: Option<Shell>,

    /// Print the project's task names instead of a script
    #[arg(long, conflicts_with = "shell")]
    pub tasks: bool,
}

/// Write the completion script for the `C` command tree
pub fn write_script<C: CommandFactory>(shell: Shell, out: &mut dyn Write) {
    let mut command = C::command();
    let bin = command.get_name().to_string();
    generate(shell, &mut command, bin, out);
}

/// Task names of the discovered project, sorted
pub fn write_task_names(globals: &Globals, out: &mut dyn Write) -> Result<()> {
    let project = commands::load(globals)?;
    let registry = commands::registry(&project)?;
    for name in registry.names() {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}
