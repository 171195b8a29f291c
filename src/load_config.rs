use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const REPO_TOKEN_VAR: &str = "COVERALLS_REPO_TOKEN";
pub const TRAVIS_TOKEN_VAR: &str = "TRAVIS_TOKEN";

/// Loads a static YAML config file (no secrets) and injects secrets from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: Config = serde_yaml::from_str(&config_content)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            e
        })
        .context("Failed to parse config YAML")?;

    // Relative paths in the file are relative to the file itself.
    if let Some(base) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        for field in [
            &mut config.coverage_report,
            &mut config.source_root,
            &mut config.output,
        ] {
            if field.is_relative() {
                *field = base.join(&*field);
            }
        }
    }

    apply_env_secrets(&mut config);
    config.trace_loaded();
    Ok(config)
}

/// Environment secrets take precedence over anything already set.
pub fn apply_env_secrets(config: &mut Config) {
    if let Ok(token) = std::env::var(REPO_TOKEN_VAR) {
        info!("{} found in env", REPO_TOKEN_VAR);
        config.repo_token = Some(token);
    }
    if let Some(travis) = config.travis.as_mut() {
        match std::env::var(TRAVIS_TOKEN_VAR) {
            Ok(token) => {
                info!("{} found in env", TRAVIS_TOKEN_VAR);
                travis.token = Some(token);
            }
            Err(_) if travis.token.is_none() => {
                error!(
                    repository = %travis.repository,
                    "{} not set; the Travis job id cannot be resolved", TRAVIS_TOKEN_VAR
                );
            }
            Err(_) => {}
        }
    }
}
