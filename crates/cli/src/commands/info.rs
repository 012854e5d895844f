//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BroadcasterBlueprint;
use serde::Serialize;
use tracing::info;

use super::{endpoint_urls, load_blueprint};
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    publisher: PublisherInfo,
    camera: CameraInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    drop_nth_frame: Option<u64>,
}

#[derive(Serialize)]
struct PublisherInfo {
    topic: String,
    endpoints: Vec<String>,
    queue_capacity: usize,
}

#[derive(Serialize)]
struct CameraInfo {
    resolution: String,
    framerate: f64,
    rotation: u16,
    annotate_metadata: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    vflip_hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hflip_hosts: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &BroadcasterBlueprint) -> ConfigInfo {
    let camera = &blueprint.camera;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        publisher: PublisherInfo {
            topic: blueprint.publisher.topic.clone(),
            endpoints: endpoint_urls(blueprint),
            queue_capacity: blueprint.publisher.queue_capacity,
        },
        camera: CameraInfo {
            resolution: format!("{}x{}", camera.frame_width, camera.frame_height),
            framerate: camera.framerate,
            rotation: camera.rotation,
            annotate_metadata: camera.annotate_metadata,
            vflip_hosts: camera.vflip.clone(),
            hflip_hosts: camera.hflip.clone(),
        },
        drop_nth_frame: (blueprint.debug.drop_nth_frame > 0).then_some(blueprint.debug.drop_nth_frame),
    }
}

fn print_config_info(blueprint: &BroadcasterBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Frame Broadcaster Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let publisher = &blueprint.publisher;
    let endpoints = endpoint_urls(blueprint);
    println!("📤 Publisher");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Topic: {}", publisher.topic);
    println!("   ├─ Queue capacity: {}", publisher.queue_capacity);
    println!("   └─ Endpoints ({})", endpoints.len());
    for (i, url) in endpoints.iter().enumerate() {
        let prefix = if i + 1 == endpoints.len() { "└─" } else { "├─" };
        println!("      {} {}", prefix, url);
    }

    let camera = &blueprint.camera;
    println!("\n📷 Camera");
    println!(
        "   ├─ Resolution: {}x{} @ {} fps",
        camera.frame_width, camera.frame_height, camera.framerate
    );
    println!("   ├─ Rotation: {}", camera.rotation);
    if !camera.vflip.is_empty() {
        println!("   ├─ Vertical flip on: {}", camera.vflip.join(", "));
    }
    if !camera.hflip.is_empty() {
        println!("   ├─ Horizontal flip on: {}", camera.hflip.join(", "));
    }
    println!("   └─ Annotate metadata: {}", camera.annotate_metadata);

    println!("\n⚙️  Debug");
    match blueprint.debug.drop_nth_frame {
        0 => println!("   └─ Frame drop: disabled"),
        n => println!("   └─ Frame drop: index % {} == 0", n),
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_info_json_shape() {
        let bp = ConfigLoader::load_from_str(
            r#"{ "publisher": { "zmq_topic_video": "cam1", "zmq_output_port": 5555,
                 "camera_stream_duplication": 2 },
                 "camera": { "vflip": ["pi-eye-01"] } }"#,
            ConfigFormat::Json,
        )
        .unwrap();

        let json = serde_json::to_value(build_config_info(&bp)).unwrap();

        assert_eq!(json["publisher"]["topic"], "cam1");
        assert_eq!(json["publisher"]["endpoints"][1], "tcp://0.0.0.0:5556");
        assert_eq!(json["camera"]["vflip_hosts"][0], "pi-eye-01");
        assert!(json.get("drop_nth_frame").is_none());
        assert!(json["camera"].get("hflip_hosts").is_none());
    }
}
