use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use shared::{domain::Truck, protocol::decode_truck_snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub seed_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            seed_file: None,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        apply_file_config(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Applies the flat `key = "value"` entries of a `server.toml`. Unknown keys
/// and malformed files are ignored.
pub(crate) fn apply_file_config(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = file_cfg.get("seed_file").and_then(toml::Value::as_str) {
        settings.seed_file = Some(PathBuf::from(v));
    }
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__SEED_FILE") {
        settings.seed_file = Some(PathBuf::from(v));
    }
}

/// Reads the initial trucks: a JSON array in the same shape the feed
/// publishes.
pub fn load_seed(path: &Path) -> anyhow::Result<Vec<Truck>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_truck_snapshot(&raw)
        .with_context(|| format!("seed file '{}' is not a truck list", path.display()))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
