// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kit - run ops tasks locally or over SSH

mod commands;
mod completions;
mod error;
mod output;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{check, list, run, show, Globals};
use completions::CompletionsArgs;
use error::{Exit, KitError};
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

/// Environment variable holding the log filter
const LOG_ENV: &str = "KIT_LOG";

#[derive(Parser)]
#[command(
    name = "kit",
    version,
    about = "kit - run ops tasks locally or over SSH"
)]
struct Cli {
    /// Configuration file (default: discover kit.toml or .kit/ upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stage to run against
    #[arg(long, global = true)]
    stage: Option<String>,

    /// Stack (application) to target, when the runbook defines several
    #[arg(long, global = true)]
    stack: Option<String>,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task
    Run(run::RunArgs),
    /// List tasks available on the selected stage
    List(list::ListArgs),
    /// Show a task's pipeline
    Show(show::ShowArgs),
    /// Parse and validate the configuration
    Check,
    /// Generate shell completions, or list task names for them
    Completions(CompletionsArgs),
}

fn setup_logging(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(exit) => exit.into(),
        Err(err) => match err.downcast::<KitError>() {
            Ok(err) => {
                eprint!("{}", err);
                err.exit.into()
            }
            Err(err) => {
                eprintln!("error: {:#}", err);
                Exit::Generic.into()
            }
        },
    }
}

async fn dispatch(cli: Cli) -> Result<Exit> {
    let globals = Globals {
        config: cli.config,
        stage: cli.stage,
        stack: cli.stack,
        output: cli.output,
    };

    if let Commands::Completions(args) = cli.command {
        let mut stdout = std::io::stdout();
        match args.shell {
            Some(shell) => completions::write_script::<Cli>(shell, &mut stdout),
            None => completions::write_task_names(&globals, &mut stdout)?,
        }
        return Ok(Exit::Success);
    }

    let project = commands::load(&globals)?;
    match cli.command {
        Commands::Run(args) => run::handle(args, &project, &globals).await,
        Commands::List(args) => list::handle(args, &project, &globals).map(|()| Exit::Success),
        Commands::Show(args) => show::handle(args, &project, &globals).map(|()| Exit::Success),
        Commands::Check => check::handle(&project, &globals).map(|()| Exit::Success),
        Commands::Completions(_) => Ok(Exit::Success),
    }
}
