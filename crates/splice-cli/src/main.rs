#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "splice")]
#[command(author, version, about = "Workspace dependency linker for npm monorepos", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Rebuild every workspace project's dependency folder from the store
    Link {
        /// Rebuild even if links look current (advisory: linking always
        /// purges and rebuilds)
        #[arg(long)]
        force: bool,

        /// Only link the named projects (repeatable)
        #[arg(long = "project", value_name = "NAME")]
        projects: Vec<String>,
    },

    /// Remove every project's dependency folder and the link manifest
    Unlink,

    /// List workspace projects
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(cli.json),
        Some(Commands::Link { force, projects }) => {
            commands::link::run(&cwd, force, &projects, cli.json)
        }
        Some(Commands::Unlink) => commands::unlink::run(&cwd, cli.json),
        Some(Commands::List) => commands::list::run(&cwd, cli.json),
    }
}
