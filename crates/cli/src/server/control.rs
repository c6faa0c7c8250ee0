use anyhow::Context;
use ferrous_netd_domain::NetworkError;
use ferrous_netd_infrastructure::network::NetworkState;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Owns the network state and applies every reconfiguration to it, one at a
/// time. Socket work may block (DAD retries), so it runs via `block_in_place`.
pub struct ControlLoop {
    state: NetworkState,
    rescan_interval: Option<Duration>,
}

impl ControlLoop {
    pub fn new(state: NetworkState, rescan_interval: Option<Duration>) -> Self {
        Self {
            state,
            rescan_interval,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to register SIGHUP handler")?;

        let mut rescan = self.rescan_interval.map(|period| {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        info!(
            rescan_secs = self.rescan_interval.map(|d| d.as_secs()),
            "Control loop running"
        );

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading upstream servers");
                    if let Err(e) = self.reload_upstreams() {
                        break Err(e);
                    }
                }
                _ = tick(&mut rescan) => {
                    if let Err(e) = self.rescan() {
                        break Err(e);
                    }
                }
            }
        };

        tokio::task::block_in_place(|| self.state.shutdown());
        result
    }

    fn rescan(&mut self) -> anyhow::Result<()> {
        match tokio::task::block_in_place(|| self.state.rescan()) {
            Ok(Some(report)) if !report.is_noop() => {
                info!(
                    created = report.created,
                    removed = report.removed,
                    "Interfaces changed"
                );
                Ok(())
            }
            Ok(_) => {
                debug!("Interface rescan: no changes");
                Ok(())
            }
            Err(NetworkError::Enumeration(reason)) => {
                warn!(reason = %reason, "Interface enumeration failed, keeping current listeners");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to apply interface changes"),
        }
    }

    fn reload_upstreams(&mut self) -> anyhow::Result<()> {
        match tokio::task::block_in_place(|| self.state.reload_upstreams()) {
            Ok(report) => {
                info!(
                    kept_static = report.kept_static,
                    added = report.added,
                    removed = report.removed,
                    "Upstream servers reloaded"
                );
                Ok(())
            }
            Err(e @ NetworkError::UpstreamSource { .. }) => {
                warn!(error = %e, "Keeping current upstream servers");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to reload upstream servers"),
        }
    }
}

async fn tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
pub fn spawn_shutdown_listener(shutdown: CancellationToken) -> anyhow::Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
        shutdown.cancel();
    });

    Ok(())
}
