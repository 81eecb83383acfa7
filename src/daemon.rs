//! Long-running service mode.
//!
//! Runs the catch-up crawl, the refresh crawl, the enrichment loop and the
//! addon server as independent tasks until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::addon;
use crate::app::{AppContext, ReelError, Result};
use crate::config::interval::format_interval;
use crate::config::EnrichmentConfig;
use crate::crawl::CrawlEngine;
use crate::domain::Language;
use crate::enrich::EnrichmentEngine;

/// Receiving side of the shutdown flag, cheap to clone into every task.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleep for `duration` unless shutdown comes first.
    /// Returns whether the caller should keep running.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.wait() => {}
        }
        !self.is_triggered()
    }
}

/// Create a connected shutdown trigger and listener.
pub fn shutdown_channel() -> (Arc<watch::Sender<bool>>, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (Arc::new(tx), Shutdown { rx })
}

/// Daemon runner
pub struct Daemon {
    ctx: Arc<AppContext>,
    trigger: Arc<watch::Sender<bool>>,
    shutdown: Shutdown,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let (trigger, shutdown) = shutdown_channel();
        Self {
            ctx,
            trigger,
            shutdown,
        }
    }

    /// Run every loop and the server until shutdown.
    pub async fn run(&self) -> Result<()> {
        let config = &self.ctx.config;
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| ReelError::Config(format!("Invalid server address: {}", e)))?;

        spawn_signal_handler(self.trigger.clone());

        info!(
            languages = config.crawl.languages.len(),
            refresh = %format_interval(config.crawl.refresh_interval),
            catch_up = %format_interval(config.crawl.catch_up_interval),
            pid = std::process::id(),
            "Daemon started"
        );

        let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();
        let languages = config.crawl.languages.clone();

        tasks.push((
            "catch-up",
            tokio::spawn(run_catch_up_loop(
                self.ctx.crawl_engine(),
                languages.clone(),
                config.crawl.catch_up_interval,
                self.shutdown.clone(),
            )),
        ));

        tasks.push((
            "refresh",
            tokio::spawn(run_refresh_loop(
                self.ctx.crawl_engine(),
                languages,
                config.crawl.refresh_interval,
                self.shutdown.clone(),
            )),
        ));

        match self.ctx.enrichment_engine()? {
            Some(engine) => tasks.push((
                "enrichment",
                tokio::spawn(run_enrichment_loop(
                    engine,
                    config.enrichment.clone(),
                    self.shutdown.clone(),
                )),
            )),
            None => warn!("No TMDB API key configured, enrichment disabled"),
        }

        let state = self.ctx.addon_state();
        let mut server_shutdown = self.shutdown.clone();
        let trigger = self.trigger.clone();
        tasks.push((
            "server",
            tokio::spawn(async move {
                let stop = async move { server_shutdown.wait().await };
                if let Err(e) = addon::serve(state, addr, stop).await {
                    error!(error = %e, "Addon server failed, shutting down");
                    trigger.send_replace(true);
                }
            }),
        ));

        for (name, handle) in tasks {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Task ended abnormally");
            }
        }

        info!("Daemon shutting down...");
        Ok(())
    }

    /// Stop the daemon (called externally)
    pub fn stop(&self) {
        self.trigger.send_replace(true);
    }
}

fn spawn_signal_handler(trigger: Arc<watch::Sender<bool>>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        trigger.send_replace(true);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Catch up once immediately, then again every `every`.
pub async fn run_catch_up_loop(
    engine: CrawlEngine,
    languages: Vec<Language>,
    every: Duration,
    mut shutdown: Shutdown,
) {
    while !shutdown.is_triggered() {
        info!("Running catch-up crawl...");
        let outcomes = engine.catch_up(&languages).await;
        let records: usize = outcomes.iter().map(|o| o.records_upserted).sum();
        info!(records, next = %format_interval(every), "Catch-up crawl finished");

        if !shutdown.sleep(every).await {
            break;
        }
    }
}

/// Re-crawl the newest pages every `every`.
pub async fn run_refresh_loop(
    engine: CrawlEngine,
    languages: Vec<Language>,
    every: Duration,
    mut shutdown: Shutdown,
) {
    while shutdown.sleep(every).await {
        info!("Running refresh crawl...");
        let outcomes = engine.refresh(&languages).await;
        let records: usize = outcomes.iter().map(|o| o.records_upserted).sum();
        info!(records, "Refresh crawl finished");
    }
}

/// Enrich back-to-back while there is work, then settle into `config.interval`.
pub async fn run_enrichment_loop(
    engine: EnrichmentEngine,
    config: EnrichmentConfig,
    mut shutdown: Shutdown,
) {
    while !shutdown.is_triggered() {
        let pause = match engine.run_full_pass(config.batch_size).await {
            Ok(pass) if pass.had_work() => {
                info!(found = pass.found(), "Enrichment pass complete, more work pending");
                config.catch_up_delay()
            }
            Ok(_) => config.interval,
            Err(e) => {
                error!(error = %e, "Enrichment pass failed");
                config.interval
            }
        };

        if !shutdown.sleep(pause).await {
            break;
        }
    }
}
