pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "kitfinder",
    about = "Kitfinder operator CLI",
    long_about = "Inspect configuration, browse the accessory catalog, and chat with the flow engine from a terminal.",
    after_help = "Examples:\n  kitfinder models\n  kitfinder fetch creta --year 2024\n  kitfinder search \"dash camera\"\n  kitfinder --demo chat"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Use the bundled in-memory catalog instead of the HTTP backend")]
    demo: bool,
    #[arg(long, short, global = true, help = "Log catalog and flow events to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config {
        #[arg(long, help = "Emit the redacted configuration as JSON")]
        json: bool,
    },
    #[command(about = "List configured vehicle models and their catalog years")]
    Models,
    #[command(about = "Fetch one model/year listing with facets, price range and categories")]
    Fetch {
        model: String,
        #[arg(long, help = "Model year (defaults to 2024)")]
        year: Option<u16>,
    },
    #[command(about = "Search accessories by name, type, subtype or description")]
    Search {
        term: String,
        #[arg(long, help = "Restrict the search to one model")]
        model: Option<String>,
        #[arg(long, help = "Model year to search")]
        year: Option<u16>,
    },
    #[command(about = "Chat with the accessory assistant on stdin (/reset, /quit)")]
    Chat,
    #[command(about = "Validate config, catalog connectivity and language-model readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Config { json } => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(json) }
        }
        Command::Models => commands::models::run(),
        Command::Fetch { model, year } => commands::fetch::run(cli.demo, &model, year),
        Command::Search { term, model, year } => {
            commands::search::run(cli.demo, &term, model.as_deref(), year)
        }
        Command::Chat => commands::chat::run(cli.demo),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(cli.demo, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Command output owns stdout, so logs go to stderr.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .compact()
        .try_init();
}
