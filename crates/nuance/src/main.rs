//! # nuance
//!
//! Nuance - Editor intelligence for LESS and SCSS stylesheets.
//!
//! ## Name Origin
//!
//! A **nuance** (/nɥɑ̃s/) is a subtle shade of meaning or of color. The tool
//! reads stylesheets after a resolver has expanded them and reports the
//! shades an editor cares about: which rule a line became, which variables are
//! in reach, and which of them is the closest match for a literal.

mod commands;
mod config;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nuance")]
#[command(about = "Editor intelligence for LESS and SCSS stylesheets", long_about = None)]
#[command(version)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze resolved stylesheet dumps
    #[command(visible_alias = "calque")]
    Analyze(commands::analyze::AnalyzeArgs),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}
