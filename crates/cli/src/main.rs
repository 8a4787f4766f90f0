use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    herald_browser::{CdpEngine, SessionController, detect},
    herald_config::HeraldConfig,
    herald_gateway::AppState,
    herald_whatsapp::{Dispatcher, MessageDriver},
};

#[derive(Parser)]
#[command(name = "herald", about = "Herald — WhatsApp Web messaging gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    // Gateway arguments (used when no subcommand is provided, or with `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Custom config directory (overrides default ~/.config/herald/).
    #[arg(long, global = true, env = "HERALD_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "HERALD_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// Report pairing status, saving the QR image while unpaired.
    Status {
        /// Where to write the QR PNG while pairing is pending.
        #[arg(long, default_value = "herald-qr.png")]
        qr_output: PathBuf,
    },
    /// Send a message and print per-recipient outcomes.
    Send {
        /// Recipient number(s), comma-separated.
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        message: String,
        /// Pause between recipients in seconds (1-60); when omitted the
        /// messages go out back to back.
        #[arg(long)]
        delay_secs: Option<u64>,
    },
    /// Close the session and delete the browser profile (unpairs the account).
    Logout,
    /// Write a default config file.
    Init,
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

/// One browser session and one dispatcher, shared by every command.
fn build_runtime(config: &HeraldConfig) -> (Arc<SessionController>, Arc<Dispatcher>) {
    let profile_dir = herald_config::data_dir().join("profiles").join("whatsapp");
    let session = Arc::new(SessionController::new(
        Box::new(CdpEngine),
        profile_dir,
        config,
    ));
    let driver = MessageDriver::new(session.clone(), &config.whatsapp);
    let dispatcher = Arc::new(Dispatcher::new(driver, config.whatsapp.bulk_delay_secs));
    (session, dispatcher)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "herald starting");

    // Apply directory overrides before any config or profile access.
    if let Some(ref dir) = cli.config_dir {
        herald_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        herald_config::set_data_dir(dir.clone());
    }

    let config = herald_config::discover_and_load();

    match cli.command {
        // Default: start the gateway when no subcommand is provided
        None | Some(Commands::Gateway) => {
            // CLI args override config values
            let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
            let port = cli.port.unwrap_or(config.server.port);
            run_gateway(&bind, port, config).await
        },
        Some(Commands::Status { qr_output }) => run_status(&config, &qr_output).await,
        Some(Commands::Send {
            to,
            message,
            delay_secs,
        }) => run_send(&config, &to, &message, delay_secs).await,
        Some(Commands::Logout) => run_logout(&config).await,
        Some(Commands::Init) => run_init(&config),
    }
}

async fn run_gateway(bind: &str, port: u16, config: HeraldConfig) -> anyhow::Result<()> {
    detect::check_and_warn(config.browser.chrome_path.as_deref());

    let (session, dispatcher) = build_runtime(&config);
    let state = AppState {
        session: session.clone(),
        dispatcher,
    };

    tokio::select! {
        result = herald_gateway::serve(bind, port, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            session.shutdown().await;
            Ok(())
        },
    }
}

/// Print the pairing state; while unpaired, write the QR image to disk so
/// it can be scanned from a phone.
async fn run_status(config: &HeraldConfig, qr_output: &Path) -> anyhow::Result<()> {
    let (session, _dispatcher) = build_runtime(config);

    let status = match session.pairing_status().await {
        Ok(status) => status,
        Err(e) => {
            session.shutdown().await;
            return Err(e.into());
        },
    };
    let identity = if status.ready {
        session.connected_identity().await
    } else {
        None
    };
    session.shutdown().await;

    if status.ready {
        let identity = identity.unwrap_or_else(|| "number not detected".into());
        println!("Session ready, connected as {identity}.");
    } else if let Some(png) = status.qr_image {
        std::fs::write(qr_output, &png)?;
        println!("Session not paired. Scan the QR code: {}", qr_output.display());
    } else {
        println!("Session not paired and no QR code was captured; try again shortly.");
    }
    Ok(())
}

async fn run_send(
    config: &HeraldConfig,
    to: &str,
    message: &str,
    delay_secs: Option<u64>,
) -> anyhow::Result<()> {
    let (session, dispatcher) = build_runtime(config);

    let result = if delay_secs.is_some() {
        let recipients: Vec<String> = to.split(',').map(String::from).collect();
        dispatcher.dispatch_bulk(&recipients, message, delay_secs).await
    } else {
        dispatcher.dispatch_single(to, message).await
    };
    session.shutdown().await;
    let result = result?;

    for row in &result.per_recipient {
        println!("{:<18} {}", row.recipient, row.outcome.describe());
    }
    println!("{} of {} messages sent", result.succeeded, result.total);

    if result.failed > 0 {
        anyhow::bail!("{} recipient(s) failed", result.failed);
    }
    Ok(())
}

/// Tear the session down and delete the profile so the account unpairs.
async fn run_logout(config: &HeraldConfig) -> anyhow::Result<()> {
    let (session, _dispatcher) = build_runtime(config);
    session.teardown().await;
    println!("Session closed and browser profile removed.");
    Ok(())
}

fn run_init(config: &HeraldConfig) -> anyhow::Result<()> {
    let existing = herald_config::find_or_default_config_path();
    if existing.exists() {
        println!("Config already exists: {}", existing.display());
        return Ok(());
    }
    let path = herald_config::save_config(config)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
