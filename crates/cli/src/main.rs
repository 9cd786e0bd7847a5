//! chorus binary entry point: wires config, store, LLM, Slack, the pipeline
//! scheduler, and the HTTP API together.

use std::sync::Arc;

use {
    clap::{Parser, Subcommand},
    secrecy::ExposeSecret,
    tokio_util::sync::CancellationToken,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    chorus_gateway::{AppState, server::start_server},
    chorus_llm::OpenAiClient,
    chorus_pipeline::{ContentPipeline, SuggestionDelivery},
    chorus_slack::{SlackOutbound, build_client, start_socket_mode},
    chorus_store::{PgStore, Store},
};

#[derive(Parser)]
#[command(
    name = "chorus",
    about = "Chorus — turns founder Slack conversations into post suggestions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind the API to (overrides CHORUS_BIND).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port for the API (overrides CHORUS_PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the service (default when no subcommand is provided).
    Start,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chorus starting");

    match cli.command {
        None | Some(Commands::Start) => start(cli).await,
    }
}

async fn start(cli: Cli) -> anyhow::Result<()> {
    let config = chorus_config::from_env()?;

    let store: Arc<dyn Store> =
        Arc::new(PgStore::new(config.database.url.expose_secret()).await?);
    info!("connected to Postgres");

    let llm = Arc::new(OpenAiClient::new(
        config.openai.api_key.clone(),
        config.openai.model.clone(),
        config.openai.base_url.clone(),
    ));

    let slack_client = build_client()?;
    let outbound = Arc::new(SlackOutbound::new(Arc::clone(&slack_client), &config.slack));

    let pipeline = Arc::new(ContentPipeline::new(
        Arc::clone(&store),
        llm,
        Arc::clone(&outbound) as Arc<dyn SuggestionDelivery>,
        config.pipeline.clone(),
    ));

    let cancel = CancellationToken::new();

    let socket_handle = tokio::spawn(start_socket_mode(
        slack_client,
        config.slack.clone(),
        config.pipeline.clone(),
        Arc::clone(&store),
        Arc::clone(&pipeline),
        Arc::clone(&outbound),
        cancel.clone(),
    ));

    let scheduler_handle = pipeline.spawn_scheduler(cancel.clone());

    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let state = AppState::new(Arc::clone(&store), Arc::clone(&pipeline), config.pipeline.clone());

    tokio::select! {
        result = start_server(state, &bind, port) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    cancel.cancel();
    let _ = scheduler_handle.await;
    let _ = socket_handle.await;
    Ok(())
}
