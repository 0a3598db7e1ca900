// src/main.rs
mod analytics;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod market;
mod models;
mod ticker;

use crate::config::Config;
use crate::context::AppContext;
use clap::Parser;
use env_logger::Builder;
use log::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::parse();
    Builder::new()
        .filter_level(config.log_level)
        .format_timestamp_secs()
        .init();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return;
    }

    let ctx = match AppContext::from_config(&config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            return;
        }
    };
    if let Err(e) = ctx.seed(!config.no_demo_account).await {
        error!("Failed to seed storage: {}", e);
        return;
    }
    info!("Starting the crypto dashboard ({:?} store)...", config.store);

    let ticker = tokio::spawn(ctx.ticker(config.tick_interval()).run(ctx.shutdown.clone()));

    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested.");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let api = api::routes(ctx.clone(), config.static_dir.clone());
    let stop = ctx.shutdown.clone();
    let server = warp::serve(api).try_bind_with_graceful_shutdown(config.bind, async move {
        stop.cancelled().await;
    });
    match server {
        Ok((addr, serving)) => {
            info!("Server running on http://{}", addr);
            serving.await;
        }
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind, e);
            ctx.shutdown.cancel();
        }
    }

    if let Err(e) = ticker.await {
        error!("Market ticker task failed: {}", e);
    }
    info!("Server stopped.");
}
