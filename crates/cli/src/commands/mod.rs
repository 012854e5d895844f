//! Command implementations.

mod info;
mod run;
mod subscribe;
mod validate;

pub use info::run_info;
pub use run::run_broadcaster;
pub use subscribe::run_subscribe;
pub use validate::run_validate;

use std::path::Path;

use contracts::BroadcasterBlueprint;

use crate::error::{CliError, Result};

/// Load and validate a configuration file
fn load_blueprint(path: &Path) -> Result<BroadcasterBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    config_loader::ConfigLoader::load_from_path(path).map_err(CliError::Config)
}

/// `tcp://host:port` for every endpoint of the configuration
fn endpoint_urls(blueprint: &BroadcasterBlueprint) -> Vec<String> {
    let host = blueprint.publisher.bind_host;
    blueprint
        .publisher
        .endpoint_ports()
        .into_iter()
        .map(|port| format!("tcp://{}:{}", host, port))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_missing_file() {
        let err = load_blueprint(Path::new("/nonexistent/broadcaster.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_and_list_endpoints() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[publisher]\ntopic = \"cam1\"\nbase_port = 9000\nduplication = 2\nbind_host = \"127.0.0.1\""
        )
        .unwrap();

        let blueprint = load_blueprint(file.path()).unwrap();
        assert_eq!(
            endpoint_urls(&blueprint),
            vec!["tcp://127.0.0.1:9000", "tcp://127.0.0.1:9001"]
        );
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[publisher]\ntopic = \"\"\nbase_port = 9000").unwrap();

        let err = load_blueprint(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)), "got: {err}");
    }
}
