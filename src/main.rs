use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use linkwatch::{platform, Capabilities, Monitor, MonitorConfig};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "linkwatch",
    about = "Internet reachability monitor — is the internet actually usable?",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Reachability beacon URL
    #[arg(long, env = "LINKWATCH_PROBE_URL")]
    probe_url: Option<String>,

    /// Probe timeout in milliseconds
    #[arg(long, env = "LINKWATCH_PROBE_TIMEOUT_MS")]
    probe_timeout_ms: Option<u64>,

    /// Poll interval in seconds (platforms without push notifications)
    #[arg(long, env = "LINKWATCH_POLL_INTERVAL")]
    poll_interval_secs: Option<u64>,

    /// Path to a TOML config file
    #[arg(long, env = "LINKWATCH_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LINKWATCH_LOG", default_value = "info")]
    log: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run a monitoring session in the foreground and print transitions.
    ///
    /// This is the default when no subcommand is given.
    Watch,
    /// One-shot reachability check. Exit code 0 when the beacon answered
    /// HTTP 200 within the timeout, 1 otherwise.
    Probe {
        /// Print the result as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
}

fn build_config(args: &Args) -> MonitorConfig {
    // CLI/env over file over defaults.
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load_or_default(path),
        None => MonitorConfig::default(),
    };
    if let Some(url) = &args.probe_url {
        config.probe.url = url.clone();
    }
    if let Some(ms) = args.probe_timeout_ms {
        config.probe.timeout_ms = ms;
    }
    if let Some(secs) = args.poll_interval_secs {
        config.signals.poll_interval_secs = secs;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(args.log.clone())
        .compact()
        .init();

    let config = build_config(&args);

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(config).await,
        Command::Probe { json } => probe_once(config, json).await,
    }
}

async fn watch(config: MonitorConfig) -> Result<()> {
    let monitor = Monitor::new(config, platform::default_link_query(), Capabilities::default())
        .context("building monitor")?;

    let mut session = monitor.session();
    let mut changes = session.subscribe();
    session.start();
    info!(tier = ?session.tier(), "watching connectivity, ctrl-c to stop");

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(change) => {
                    let verdict = if change.is_active {
                        "internet usable"
                    } else {
                        "internet unusable"
                    };
                    println!("{} {verdict} ({})", change.changed_at, change.transport);
                }
                Err(_) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop(true);
    Ok(())
}

async fn probe_once(config: MonitorConfig, json: bool) -> Result<()> {
    let prober = linkwatch::probe::HttpProber::new(&config.probe).context("building probe client")?;
    use linkwatch::probe::Prober as _;

    let timeout = config.probe.timeout();
    let reachable = tokio::select! {
        ok = prober.check(&config.probe.url) => ok,
        _ = tokio::time::sleep(timeout) => false,
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "url": config.probe.url,
                "timeout_ms": timeout.as_millis() as u64,
                "reachable": reachable,
            })
        );
    } else {
        println!(
            "{} is {} (timeout {:?})",
            config.probe.url,
            if reachable { "reachable" } else { "unreachable" },
            timeout,
        );
    }

    std::process::exit(if reachable { 0 } else { 1 });
}
