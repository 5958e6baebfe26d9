//! ClipSwap Runtime
//!
//! Stands in for a host application: owns a scene graph, ticks ClipSwap once
//! per frame, unloads its level every so often, and plays the configured
//! clip names through the override registry. Configured overrides load in the
//! background while frames keep ticking.
//!
//! Run with: cargo run -p clipswap_runtime -- [config.toml]
//!       or: cargo run --bin clipswap

mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use clipswap_core::{AudioClip, SceneGraph};
use clipswap_services::{ClipSwap, Service};

use crate::config::RuntimeConfig;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let config = match RuntimeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    config.print_summary();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(config));
    // An abandoned decode may still hold a blocking thread
    runtime.shutdown_background();

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

/// Run the host loop until the frame budget is spent or Ctrl+C
async fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);
    }) {
        log::warn!("Failed to set Ctrl+C handler: {}", e);
    }

    let scene = Arc::new(Mutex::new(SceneGraph::new()));
    let mut clipswap = ClipSwap::new(config.clipswap.clone(), scene.clone());
    clipswap.start()?;
    let clipswap = Arc::new(clipswap);

    let applying = {
        let clipswap = Arc::clone(&clipswap);
        tokio::spawn(async move { clipswap.apply_configured_overrides().await })
    };

    // Clips the host plays after every level load
    let playlist: Vec<_> = config
        .clipswap
        .overrides
        .iter()
        .map(|spec| AudioClip::new(spec.name.as_str(), 1, 44100, Vec::new()).into_handle())
        .collect();

    let settings = &config.runtime;
    let mut interval = tokio::time::interval(settings.frame_interval());
    let mut frame: u64 = 0;

    while running.load(Ordering::SeqCst) && settings.should_run(frame) {
        interval.tick().await;

        if settings.is_level_transition(frame) {
            let unloaded = scene.lock().unload_level();
            log::info!("Frame {}: level transition unloaded {} object(s)", frame, unloaded);

            for original in &playlist {
                let playing = clipswap.resolve(original);
                log::debug!("Host played '{}' as '{}'", original.name(), playing.name());
            }
        }

        clipswap.tick();
        frame += 1;
    }

    let grace = if running.load(Ordering::SeqCst) {
        settings.shutdown_grace()
    } else {
        Duration::ZERO
    };
    if let Some(applied) = finish_applying(applying, grace).await {
        log::info!("{} configured override(s) active", applied);
    }

    clipswap.shutdown();
    log::info!("Ran {} frame(s)", frame);

    println!("{}", serde_json::to_string_pretty(&clipswap.health())?);
    Ok(())
}

/// Wait up to `grace` for the configured overrides, then abandon them
async fn finish_applying(mut applying: JoinHandle<usize>, grace: Duration) -> Option<usize> {
    match tokio::time::timeout(grace, &mut applying).await {
        Ok(Ok(applied)) => Some(applied),
        Ok(Err(e)) => {
            log::error!("Override loading task failed: {}", e);
            None
        }
        Err(_) => {
            applying.abort();
            log::warn!("Configured overrides still loading after {:?}, abandoning them", grace);
            None
        }
    }
}
