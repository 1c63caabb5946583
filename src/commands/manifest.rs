//! Manifest loading
//!
//! A manifest lists target resource hashes for one type:
//!
//! ```toml
//! [[resources]]
//! id = "BBCB188AD7B3228BCF05BD554C0BE21B5FF054BD"
//! source = "https://example.com/key.gpg"
//! ```
//!
//! JSON manifests are either a bare array of hashes or `{ "resources": [...] }`.

use anyhow::{Context, Result, bail};
use resource_api::ResourceHash;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    Bare(Vec<ResourceHash>),
    Wrapped { resources: Vec<ResourceHash> },
}

#[derive(Debug, Deserialize)]
struct TomlManifest {
    #[serde(default)]
    resources: Vec<toml::Table>,
}

/// Read the target hashes declared in a manifest file
pub fn load(path: &Path) -> Result<Vec<ResourceHash>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;

    let resources = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content),
        Some("toml") => parse_toml(&content),
        _ => bail!(
            "Unsupported manifest format: {} (expected .json or .toml)",
            path.display()
        ),
    }
    .with_context(|| format!("Invalid manifest {}", path.display()))?;

    log::debug!(
        "Loaded {} resources from {}",
        resources.len(),
        path.display()
    );
    Ok(resources)
}

fn parse_json(content: &str) -> Result<Vec<ResourceHash>> {
    let manifest: JsonManifest = serde_json::from_str(content)?;
    Ok(match manifest {
        JsonManifest::Bare(resources) | JsonManifest::Wrapped { resources } => resources,
    })
}

fn parse_toml(content: &str) -> Result<Vec<ResourceHash>> {
    let manifest: TomlManifest = toml::from_str(content)?;
    manifest
        .resources
        .into_iter()
        .map(table_to_hash)
        .collect()
}

fn table_to_hash(table: toml::Table) -> Result<ResourceHash> {
    table
        .into_iter()
        .map(|(k, v)| Ok((k, toml_to_json(v)?)))
        .collect()
}

fn toml_to_json(value: toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .with_context(|| format!("{f} cannot be represented in JSON"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<_>>()?,
        ),
        toml::Value::Table(table) => Value::Object(table_to_hash(table)?),
    })
}
