//! cityq CLI
//!
//! Routes natural-language questions about cities to a SQL table of city
//! statistics or to a semantic index of city descriptions.

mod commands;

use clap::{Parser, Subcommand};
use cityq_core::config::{AppConfig, StrategyKind};
use cityq_core::{logging, AppResult};
use commands::{AskCommand, ChatCommand, IndexCommand, RouteCommand, SeedCommand};
use std::path::PathBuf;

/// Ask questions about US cities
#[derive(Parser, Debug)]
#[command(name = "cityq")]
#[command(about = "Answer city questions from SQL stats or indexed descriptions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "CITYQ_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "CITYQ_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (ollama, openai)
    #[arg(short, long, global = true, env = "CITYQ_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "CITYQ_MODEL")]
    model: Option<String>,

    /// City store: ":memory:" or a file path
    #[arg(long, global = true, env = "CITYQ_DATABASE_URL")]
    database_url: Option<String>,

    /// Tool selection strategy (llm, keyword)
    #[arg(long, global = true, env = "CITYQ_ROUTER", value_parser = parse_strategy)]
    router: Option<StrategyKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question
    Ask(AskCommand),

    /// Interactive conversation
    Chat(ChatCommand),

    /// Show which tool would answer a question
    Route(RouteCommand),

    /// Create and seed the city table
    Seed(SeedCommand),

    /// Build the semantic index
    Index(IndexCommand),
}

fn parse_strategy(value: &str) -> Result<StrategyKind, String> {
    StrategyKind::parse(value)
        .ok_or_else(|| format!("unknown strategy '{}' (expected llm or keyword)", value))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.database_url,
        cli.router,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("cityq starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_cityq_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Route(_) => "route",
        Commands::Seed(_) => "seed",
        Commands::Index(_) => "index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Route(cmd) => cmd.execute(&config).await,
        Commands::Seed(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
