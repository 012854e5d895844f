//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::BroadcasterBlueprint;
use std::time::Duration;
use tracing::{info, warn};

use super::{endpoint_urls, load_blueprint};
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Broadcaster, BroadcasterConfig};

/// Execute the `run` command
pub async fn run_broadcaster(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(CliError::Config)
        .context("Invalid command-line override")?;

    info!(
        topic = %blueprint.publisher.topic,
        base_port = blueprint.publisher.base_port,
        duplication = blueprint.publisher.duplication,
        drop_nth_frame = blueprint.debug.drop_nth_frame,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let config = BroadcasterConfig {
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        report_interval: Duration::from_secs(args.report_interval.max(1)),
    };

    info!("Starting broadcaster...");
    let stats = Broadcaster::new(config)
        .run(shutdown_signal())
        .await
        .context("Broadcaster failed")?;

    stats.print_summary();

    info!("Frame Broadcaster finished");
    Ok(())
}

/// Apply command-line overrides on top of the loaded file
fn apply_overrides(blueprint: &mut BroadcasterBlueprint, args: &RunArgs) {
    if let Some(ref topic) = args.topic {
        info!(topic = %topic, "Overriding topic from CLI");
        blueprint.publisher.topic = topic.clone();
    }
    if let Some(port) = args.base_port {
        info!(port, "Overriding base port from CLI");
        blueprint.publisher.base_port = port;
    }
    if let Some(duplication) = args.duplication {
        info!(duplication, "Overriding duplication from CLI");
        blueprint.publisher.duplication = duplication;
    }
    if let Some(n) = args.drop_nth_frame {
        info!(drop_nth_frame = n, "Overriding drop divisor from CLI");
        blueprint.debug.drop_nth_frame = n;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BroadcasterBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Publisher:");
    println!("  Topic: {}", blueprint.publisher.topic);
    println!("  Queue capacity: {}", blueprint.publisher.queue_capacity);
    println!("  Endpoints:");
    for url in endpoint_urls(blueprint) {
        println!("    - {}", url);
    }

    let camera = &blueprint.camera;
    println!("\nCamera:");
    println!(
        "  {}x{} @ {} fps, rotation {}",
        camera.frame_width, camera.frame_height, camera.framerate, camera.rotation
    );
    println!("  Annotate metadata: {}", camera.annotate_metadata);

    if blueprint.debug.drop_nth_frame > 0 {
        println!(
            "\nDebug: dropping frames with index % {} == 0",
            blueprint.debug.drop_nth_frame
        );
    }

    println!();
}
