//! Configuration loading for oncomap.
//! Reads oncomap.toml from the path given on the command line, the path in
//! ONCOMAP_CONFIG, or the current directory, then applies UMLS_* overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use oncomap_common::MappingConfig;

pub const DEFAULT_CONFIG_FILE: &str = "oncomap.toml";

/// Where the configuration comes from, and whether it must exist.
#[derive(Debug, PartialEq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Named explicitly (flag or env var): a missing file is an error.
    pub required: bool,
}

pub fn resolve_path<F>(explicit: Option<&Path>, env: F) -> ConfigSource
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return ConfigSource { path: path.to_path_buf(), required: true };
    }
    match env("ONCOMAP_CONFIG").filter(|p| !p.trim().is_empty()) {
        Some(path) => ConfigSource { path: PathBuf::from(path), required: true },
        None => ConfigSource { path: PathBuf::from(DEFAULT_CONFIG_FILE), required: false },
    }
}

/// Load configuration with environment overrides applied. Not validated:
/// only `map` needs credentials, so validation happens there.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<MappingConfig> {
    load_with_env(explicit, |k| std::env::var(k).ok())
}

pub fn load_with_env<F>(explicit: Option<&Path>, env: F) -> anyhow::Result<MappingConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let source = resolve_path(explicit, &env);

    let mut config = if source.path.exists() {
        tracing::debug!("Loading configuration from {}", source.path.display());
        MappingConfig::load_from(&source.path)
            .with_context(|| format!("invalid configuration in {}", source.path.display()))?
    } else if source.required {
        anyhow::bail!(
            "Config file not found: {}\n\
             Copy oncomap.example.toml to oncomap.toml and edit it.",
            source.path.display()
        );
    } else {
        tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
        MappingConfig::default()
    };

    config.apply_env_overrides(&env);
    Ok(config)
}
