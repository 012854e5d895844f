//! # Config Loader
//!
//! Turns a broadcaster config file into a validated `BroadcasterBlueprint`.
//!
//! Files are TOML or JSON, picked by extension. Legacy key names such as
//! `zmq_output_port` are accepted inside their `[publisher]`, `[camera]`
//! and `[debug]` sections; flat top-level legacy maps are not.
//! Every load ends with semantic validation, so a blueprint returned from
//! here can be bound and started as is.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("broadcaster.toml"))?;
//! for port in blueprint.publisher.endpoint_ports() {
//!     println!("{} -> {}", blueprint.publisher.topic, port);
//! }
//! # Ok::<(), contracts::ContractError>(())
//! ```

mod parser;
mod validator;

pub use contracts::BroadcasterBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Entry point for reading and writing broadcaster configs
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate the config at `path`
    ///
    /// # Errors
    /// `ConfigParse` for an unknown extension or bad syntax, `Io` if the file
    /// cannot be read, `ConfigValidation` naming the first bad field.
    pub fn load_from_path(path: &Path) -> Result<BroadcasterBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<BroadcasterBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after CLI overrides were applied to it
    pub fn validate(blueprint: &BroadcasterBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &BroadcasterBlueprint) -> Result<String, ContractError> {
        Self::render(blueprint, ConfigFormat::Toml)
    }

    pub fn to_json(blueprint: &BroadcasterBlueprint) -> Result<String, ContractError> {
        Self::render(blueprint, ConfigFormat::Json)
    }

    /// Serialize `blueprint` in `format`, legacy aliases resolved
    pub fn render(
        blueprint: &BroadcasterBlueprint,
        format: ConfigFormat,
    ) -> Result<String, ContractError> {
        let rendered = match format {
            ConfigFormat::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| ContractError::config_parse(format!("cannot render {format:?}: {e}")))
    }
}
