mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, fmt, watch, CheckArgs, FmtArgs, WatchArgs};
use tracing_subscriber::EnvFilter;

/// scened - tools for scene editor content
#[derive(Parser, Debug)]
#[command(name = "scened")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter, e.g. `debug` or `scened_editor=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every document under a content root
    Check(CheckArgs),

    /// Rewrite a document in canonical form
    Fmt(FmtArgs),

    /// Keep a document open and reload it as files change
    Watch(WatchArgs),
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let result = match cli.command {
        Command::Check(args) => check(args),
        Command::Fmt(args) => fmt(args),
        Command::Watch(args) => watch(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
