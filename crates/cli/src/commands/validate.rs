//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BroadcasterBlueprint;
use serde::Serialize;
use tracing::info;

use super::{endpoint_urls, load_blueprint};
use crate::cli::ValidateArgs;

/// Queue capacities below this make subscribers skip frames on short stalls
const SMALL_QUEUE_CAPACITY: usize = 4;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    topic: String,
    endpoints: Vec<String>,
    drop_nth_frame: u64,
    annotate_metadata: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    topic: blueprint.publisher.topic.clone(),
                    endpoints: endpoint_urls(&blueprint),
                    drop_nth_frame: blueprint.debug.drop_nth_frame,
                    annotate_metadata: blueprint.camera.annotate_metadata,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BroadcasterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    match blueprint.debug.drop_nth_frame {
        0 => {}
        1 => warnings.push("debug.drop_nth_frame = 1 - every frame will be dropped".to_string()),
        n => warnings.push(format!(
            "debug.drop_nth_frame = {} - frames with index % {} == 0 will be dropped",
            n, n
        )),
    }

    if blueprint.publisher.queue_capacity < SMALL_QUEUE_CAPACITY {
        warnings.push(format!(
            "publisher.queue_capacity = {} - slow subscribers will skip frames on short stalls",
            blueprint.publisher.queue_capacity
        ));
    }

    for host in &blueprint.camera.vflip {
        if blueprint.camera.hflip.contains(host) {
            warnings.push(format!(
                "host '{}' is listed in both camera.vflip and camera.hflip",
                host
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Topic: {}", summary.topic);
            println!("  Endpoints: {}", summary.endpoints.join(", "));
            println!("  Drop every n-th frame: {}", summary.drop_nth_frame);
            println!("  Annotate metadata: {}", summary.annotate_metadata);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    fn load(toml: &str) -> BroadcasterBlueprint {
        ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_clean_config_has_no_warnings() {
        let bp = load("[publisher]\ntopic = \"cam1\"\nbase_port = 5555");
        assert!(collect_warnings(&bp).is_empty());
    }

    #[test]
    fn test_drop_filter_warns() {
        let bp = load("[publisher]\ntopic = \"cam1\"\nbase_port = 5555\n[debug]\ndrop_nth_frame = 1");
        let warnings = collect_warnings(&bp);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("every frame"), "got: {warnings:?}");
    }

    #[test]
    fn test_conflicting_flips_warn() {
        let bp = load(
            "[publisher]\ntopic = \"cam1\"\nbase_port = 5555\nqueue_capacity = 2\n\
             [camera]\nvflip = [\"pi-eye-01\"]\nhflip = [\"pi-eye-01\"]",
        );
        let warnings = collect_warnings(&bp);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("pi-eye-01")));
        assert!(warnings.iter().any(|w| w.contains("queue_capacity")));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/broadcaster.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
