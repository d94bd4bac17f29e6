//! Subcommand implementations. Each returns the JSON document to print.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use strata_core::resolver::{self, derive_credential_type};
use strata_core::{
    CloudStorageConfig, InMemoryCatalog, JsonLinesEditLog, RegistryConfig, SqliteVolumeDirectory,
    StorageType, StorageVolumeManager,
};
use tracing::info;

pub fn load_config(path: Option<&Path>) -> Result<CloudStorageConfig> {
    match path {
        Some(path) => Ok(CloudStorageConfig::load(path)?),
        None => Ok(CloudStorageConfig::default()),
    }
}

/// Open the registry stored under `state_dir`, rebuilding its bindings from
/// the journal.
fn open_manager(config: &CloudStorageConfig, state_dir: &Path) -> Result<StorageVolumeManager> {
    std::fs::create_dir_all(state_dir)
        .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;

    let directory =
        SqliteVolumeDirectory::open_at(&state_dir.join(RegistryConfig::DIRECTORY_DB_FILENAME))?;
    let journal_path = state_dir.join(RegistryConfig::JOURNAL_FILENAME);
    let records = JsonLinesEditLog::read_all(&journal_path)?;
    let edit_log = JsonLinesEditLog::open(&journal_path)?;

    let manager = StorageVolumeManager::new(
        Arc::new(directory),
        Arc::new(InMemoryCatalog::new()),
        Arc::new(edit_log),
        config.clone(),
    );
    let applied = manager.replay_all(&records)?;
    info!("Replayed {} journal records", applied);
    Ok(manager)
}

pub fn validate(config: &CloudStorageConfig) -> Result<Value> {
    let resolved = resolver::resolve(config)?;
    let credential_type = match resolved.storage_type {
        StorageType::S3 => derive_credential_type(config).map(|t| t.as_str()),
        _ => None,
    };

    Ok(json!({
        "storage_type": resolved.storage_type,
        "locations": resolved.locations,
        "params": resolved.redacted_params(),
        "storage_key": resolved.storage_key,
        "credential_type": credential_type,
    }))
}

pub fn bootstrap(config: &CloudStorageConfig, state_dir: &Path) -> Result<Value> {
    let manager = open_manager(config, state_dir)?;
    let id = manager.create_builtin_volume()?;
    if id.is_empty() {
        info!("Loading the builtin volume from configuration is disabled");
    }
    Ok(json!({ "builtin_volume_id": id }))
}

pub fn list(config: &CloudStorageConfig, state_dir: &Path) -> Result<Value> {
    let manager = open_manager(config, state_dir)?;
    let default_id = manager.get_default_volume()?.map(|v| v.id);

    let volumes: Vec<Value> = manager
        .list_volumes()?
        .into_iter()
        .map(|v| {
            json!({
                "id": v.id,
                "name": v.name,
                "type": v.storage_type,
                "enabled": v.enabled,
                "default": Some(&v.id) == default_id.as_ref(),
            })
        })
        .collect();
    Ok(Value::Array(volumes))
}

pub fn show(config: &CloudStorageConfig, state_dir: &Path, name: &str) -> Result<Value> {
    let manager = open_manager(config, state_dir)?;
    let volume = manager
        .get_volume_by_name(name)?
        .ok_or_else(|| anyhow!("Unknown storage volume \"{}\"", name))?;

    let bindings = manager.bindings();
    let mut value = serde_json::to_value(&volume)?;
    value["params"] = serde_json::to_value(resolver::redact_params(&volume.params))?;
    value["databases"] = json!(bindings.databases_of_volume(&volume.id)?);
    value["tables"] = json!(bindings.tables_of_volume(&volume.id)?);
    Ok(value)
}

pub fn replay(config: &CloudStorageConfig, state_dir: &Path) -> Result<Value> {
    let manager = open_manager(config, state_dir)?;
    Ok(serde_json::to_value(manager.bindings().snapshot()?)?)
}
