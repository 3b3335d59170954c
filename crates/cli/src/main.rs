mod app;
mod config_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chanstat", about = "chanstat: hourly YouTube and TikTok channel statistics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of discovering one.
    #[arg(long, global = true, env = "CHANSTAT_CONFIG")]
    config: Option<PathBuf>,
    /// sqlx SQLite URL (overrides config value).
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and HTTP API (default when no subcommand is provided).
    Serve,
    /// Collect every tracked channel once and print the report as JSON.
    Collect,
    /// Check the configuration and report errors and warnings.
    Validate {
        /// Show informational diagnostics too.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a documented default config file.
    Init {
        /// Destination (defaults to the user config directory).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
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

/// Load config, then layer environment and command-line overrides on top.
fn load_config(cli: &Cli) -> anyhow::Result<chanstat_config::ChanstatConfig> {
    let mut config = match cli.config {
        Some(ref path) => chanstat_config::load_config(path)?,
        None => chanstat_config::discover_and_load(),
    };
    chanstat_config::apply_env_overrides(&mut config);

    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref url) = cli.database_url {
        config.database.url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chanstat starting");

    match cli.command {
        None | Some(Commands::Serve) => {
            let config = load_config(&cli)?;
            config_commands::ensure_valid(&config)?;
            app::serve(config).await
        },
        Some(Commands::Collect) => {
            let config = load_config(&cli)?;
            config_commands::ensure_valid(&config)?;
            let report = app::collect_once(config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        },
        Some(Commands::Validate { verbose }) => {
            let config = load_config(&cli)?;
            config_commands::check(&config, verbose)
        },
        Some(Commands::Init { ref path, force }) => config_commands::init(path.clone(), force),
    }
}
