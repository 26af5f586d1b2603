//! mqproxy command line tool
//!
//! Runs a proxy of the requested mode until interrupted. Addresses are
//! process-local, so this binary is mainly a scaffold for embedding the
//! library: other tasks in the same process reach the proxy through the
//! configured addresses.

use clap::Parser;
use log::info;
use std::str::FromStr;

use mqproxy::{init_logger, Proxy, ProxyConfig, ProxyMode, Result, APP_NAME, VERSION};

const DEFAULT_MODE: ProxyMode = ProxyMode::Streamer;
const DEFAULT_FRONTEND_ADDR: &str = "inproc://proxy-frontend";
const DEFAULT_BACKEND_ADDR: &str = "inproc://proxy-backend";
const DEFAULT_CAPTURE_ADDR: &str = "inproc://proxy-capture";

/// Managed message-forwarding proxy with capture tee
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Proxy mode: queue, forwarder, streamer [default: streamer]
    #[clap(short, long)]
    mode: Option<String>,

    /// Frontend bind address [default: inproc://proxy-frontend]
    #[clap(short, long)]
    frontend: Option<String>,

    /// Backend bind address [default: inproc://proxy-backend]
    #[clap(short, long)]
    backend: Option<String>,

    /// Capture bind address [default: inproc://proxy-capture]
    #[clap(short, long)]
    capture: Option<String>,

    /// Log level
    #[clap(long, default_value = "info")]
    log_level: String,

    /// Load configuration from a JSON file (explicit flags take precedence)
    #[clap(long)]
    config_file: Option<String>,
}

/// Build the effective configuration: defaults, overlaid by the config
/// file, overlaid by flags the user actually supplied.
fn resolve_config(args: &Args) -> Result<ProxyConfig> {
    let mut config = ProxyConfig {
        mode: DEFAULT_MODE,
        ..ProxyConfig::default()
    };

    if let Some(path) = &args.config_file {
        info!("Loading configuration from file: {}", path);
        config = config.merge(ProxyConfig::from_file(path)?);
    }

    if let Some(mode) = &args.mode {
        config.mode = ProxyMode::from_str(mode)?;
    }

    let frontend = effective_addr(&args.frontend, &config.frontend_addr, DEFAULT_FRONTEND_ADDR);
    let backend = effective_addr(&args.backend, &config.backend_addr, DEFAULT_BACKEND_ADDR);
    let capture = effective_addr(&args.capture, &config.capture_addr, DEFAULT_CAPTURE_ADDR);
    config.set_addresses(&frontend, &backend, &capture);

    config.validate()?;
    Ok(config)
}

fn effective_addr(cli: &Option<String>, file: &str, default: &str) -> String {
    if let Some(addr) = cli {
        addr.clone()
    } else if !file.is_empty() {
        file.to_string()
    } else {
        default.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level);

    info!("Starting {} v{}", APP_NAME, VERSION);

    let config = resolve_config(&args)?;

    info!("Mode: {}", config.mode);
    info!("Frontend address: {}", config.frontend_addr);
    info!("Backend address: {}", config.backend_addr);
    info!("Capture address: {}", config.capture_addr);

    let mut proxy = Proxy::new(config.mode);
    proxy
        .start(
            &config.frontend_addr,
            &config.backend_addr,
            &config.capture_addr,
        )
        .await?;

    info!("Proxy running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    proxy.stop().await;

    Ok(())
}
