//! ratings-agent entry point
//!
//! `serve` runs the A2A endpoint, `check` runs the ratings pipeline once and
//! `watch` runs it on the configured schedule.

use clap::{Parser, Subcommand};
use ratings_agent::a2a::A2aAdapter;
use ratings_agent::agent::{AgentInvoker, AgentRegistry, LlmAgent, LlmAgentSettings};
use ratings_agent::config::AgentConfig;
use ratings_agent::history::{HistoryStore, JsonlHistoryStore};
use ratings_agent::llm::{LlmProvider, OpenAiConfig, OpenAiProvider};
use ratings_agent::lookup::{PlayStoreClient, PlayStoreClientConfig, RatingLookup};
use ratings_agent::observability::{init_default_logging, init_logging, LogFormat};
use ratings_agent::pipeline::{PipelineInput, PipelineRun, RatingPipeline};
use ratings_agent::scoring::{score_app, ScoreInput};
use ratings_agent::server;
use ratings_agent::tools::{PlayStoreRatingTool, ToolSystem};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};

const DEFAULT_CONFIG_PATHS: &[&str] = &["ratings-agent.toml", "config/ratings-agent.toml"];

/// Play Store rating agent with an A2A endpoint and a scheduled ratings pipeline
#[derive(Parser)]
#[command(name = "ratings-agent")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "RATINGS_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the A2A endpoint
    Serve,
    /// Run the ratings pipeline once and print the report
    Check {
        /// App name to check; repeatable. Defaults to schedule.app_names
        #[arg(long = "app", value_name = "NAME")]
        apps: Vec<String>,
    },
    /// Run the ratings pipeline every schedule.interval_secs
    Watch,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        1 => init_logging(Level::DEBUG, log_format_from_env(), false),
        _ => init_logging(Level::TRACE, log_format_from_env(), true),
    }

    info!("Starting ratings-agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Check { apps } => check(config, apps).await,
        Commands::Watch => watch(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn log_format_from_env() -> LogFormat {
    LogFormat::parse(&std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()))
}

fn load_configuration(config_path: Option<&std::path::Path>) -> CliResult<AgentConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(AgentConfig::load_from_file(path)?);
    }

    for candidate in DEFAULT_CONFIG_PATHS {
        let path = PathBuf::from(candidate);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(AgentConfig::load_from_file(&path)?);
        }
    }

    Err(format!(
        "No configuration file found. Provide one with -c/--config or create {}",
        DEFAULT_CONFIG_PATHS.join(" or ")
    )
    .into())
}

fn build_lookup(config: &AgentConfig) -> CliResult<Arc<dyn RatingLookup>> {
    let client = PlayStoreClient::new(PlayStoreClientConfig::from(&config.lookup))?;
    Ok(Arc::new(client))
}

fn build_history_store(config: &AgentConfig) -> Option<Arc<dyn HistoryStore>> {
    match &config.history.path {
        Some(path) => {
            info!(path = %path.display(), "Using JSONL history store");
            Some(Arc::new(JsonlHistoryStore::new(path)))
        }
        None => {
            warn!("No [history] path configured; ratings will not be persisted");
            None
        }
    }
}

fn build_provider(config: &AgentConfig) -> CliResult<Arc<dyn LlmProvider>> {
    let defaults = OpenAiConfig::default();
    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: config.get_llm_api_key()?,
        base_url: config.llm.base_url.clone().unwrap_or(defaults.base_url),
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })?;
    Ok(Arc::new(provider))
}

async fn build_registry(
    config: &AgentConfig,
    lookup: Arc<dyn RatingLookup>,
) -> CliResult<AgentRegistry> {
    let provider = build_provider(config)?;

    let mut tools = ToolSystem::new();
    tools
        .register(Box::new(PlayStoreRatingTool::new(lookup)), None)
        .await?;
    let tools = Arc::new(tools);

    let settings = LlmAgentSettings::from(&config.llm);
    let registry = config
        .agents
        .ids
        .iter()
        .fold(AgentRegistry::new(), |registry, id| {
            let agent: Arc<dyn AgentInvoker> = Arc::new(LlmAgent::new(
                id.clone(),
                provider.clone(),
                tools.clone(),
                settings.clone(),
            ));
            registry.with_agent(id.clone(), agent)
        });

    info!(agents = ?registry.ids(), model = %settings.model, "Agent registry ready");
    Ok(registry)
}

async fn serve(config: AgentConfig) -> CliResult<()> {
    let lookup = build_lookup(&config)?;
    let registry = build_registry(&config, lookup).await?;
    let adapter = Arc::new(A2aAdapter::new(registry, config.server.environment));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(
        environment = ?config.server.environment,
        "Serving A2A endpoint at http://{addr}/a2a/agent/{{agentId}}"
    );

    server::serve(adapter, addr, shutdown_signal()).await?;
    Ok(())
}

async fn check(config: AgentConfig, apps: Vec<String>) -> CliResult<()> {
    let app_names = if apps.is_empty() {
        config.schedule.app_names.clone()
    } else {
        apps
    };
    if app_names.is_empty() {
        return Err("No apps to check: pass --app NAME or set schedule.app_names".into());
    }

    let pipeline = RatingPipeline::new(build_lookup(&config)?, build_history_store(&config));
    let run = pipeline.run(PipelineInput { app_names }).await?;

    print!("{}", run.report);
    print_scores(&run);
    Ok(())
}

fn print_scores(run: &PipelineRun) {
    if run.fetched.is_empty() {
        return;
    }

    println!("\n🏆 Scores:\n");
    for record in &run.fetched {
        let score = score_app(&ScoreInput::from(record));
        println!(
            "   {}: {}/100 ({:?})",
            record.title, score.score, score.category
        );
        for insight in &score.insights {
            println!("      - {insight}");
        }
    }
}

async fn watch(config: AgentConfig) -> CliResult<()> {
    let app_names = config.schedule.app_names.clone();
    if app_names.is_empty() {
        return Err("schedule.app_names is empty; nothing to watch".into());
    }

    let pipeline = RatingPipeline::new(build_lookup(&config)?, build_history_store(&config));
    let mut interval = tokio::time::interval(Duration::from_secs(config.schedule.interval_secs));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(
        apps = app_names.len(),
        interval_secs = config.schedule.interval_secs,
        "Watching app ratings"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let input = PipelineInput { app_names: app_names.clone() };
                match pipeline.run(input).await {
                    Ok(run) => print!("{}", run.report),
                    Err(e) => error!(error = %e, "Scheduled rating check failed"),
                }
            }
        }
    }

    Ok(())
}

fn handle_config_command(config: &AgentConfig, show: bool) -> CliResult<()> {
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}
