use clap::Parser;
use ferrous_netd_domain::CliOverrides;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "ferrous-netd")]
#[command(version)]
#[command(about = "Ferrous Netd - listener and upstream socket manager for DNS/DHCP forwarding")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Port to serve clients on (0 disables TCP)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Only listen on this interface (repeatable)
    #[arg(short = 'i', long = "interface", value_name = "NAME")]
    interfaces: Vec<String>,

    /// Bind each interface address instead of using wildcard sockets
    #[arg(long)]
    bind_interfaces: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        port: cli.port,
        interfaces: cli.interfaces.clone(),
        bind_interfaces: cli.bind_interfaces,
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config.logging);

    if cli.check_config {
        info!("Configuration OK");
        return Ok(());
    }

    info!("Starting Ferrous Netd v{}", env!("CARGO_PKG_VERSION"));

    let services = di::NetworkServices::new(&config)?;

    let shutdown = CancellationToken::new();
    server::spawn_shutdown_listener(shutdown.clone())?;

    let control = server::ControlLoop::new(services.state, config.network.rescan_interval());
    if let Err(e) = control.run(shutdown).await {
        error!(error = %e, "Network reconfiguration failed");
        return Err(e);
    }

    info!(
        abandoned_forwards = services.forwards.abandoned(),
        "Shutdown complete"
    );
    Ok(())
}
