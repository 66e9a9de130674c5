mod app;
mod auth_commands;
mod upload_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "tubepost", about = "Tubepost: publish WhatsApp media to YouTube", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/tubepost/).
    #[arg(long, global = true, env = "TUBEPOST_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and serve the posting conversation (default).
    Run,
    /// YouTube authorization management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// Upload a single file without going through chat.
    Upload(upload_commands::UploadArgs),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[cfg(feature = "metrics")]
fn init_metrics(config: &tubepost_config::MetricsConfig) -> anyhow::Result<()> {
    let listen = config
        .listen
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid metrics.listen address: {e}"))?;
    tubepost_metrics::init_metrics(tubepost_metrics::MetricsRecorderConfig {
        enabled: config.enabled,
        listen,
        global_labels: vec![("service".into(), "tubepost".into())],
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "tubepost starting");

    if let Some(ref dir) = cli.config_dir {
        tubepost_config::set_config_dir(dir.clone());
    }
    let config = tubepost_config::discover_and_load();

    match cli.command {
        None | Some(Commands::Run) => {
            #[cfg(feature = "metrics")]
            init_metrics(&config.metrics)?;
            app::run(config).await
        },
        Some(Commands::Auth { action }) => auth_commands::handle_auth(action, &config).await,
        Some(Commands::Upload(args)) => upload_commands::handle_upload(args, &config).await,
    }
}
