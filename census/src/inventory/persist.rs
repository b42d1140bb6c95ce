//! Inventory persistence
//!
//! The inventory is saved as one JSON object mapping identity keys to records.
//! Loading also accepts the legacy shape, a plain list of records whose keys
//! are derived from their `ip` and `port`. Addresses are masked on load so no
//! unmasked record is ever written back.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::Inventory;
use crate::common::identity::{compute_key, mask_address, IdentityKey};
use crate::common::types::InventoryRecord;
use crate::common::CommonError;
use crate::error::{CensusError, CensusResult};

/// Load prior state, treating any failure as an empty inventory
///
/// A missing file is the normal first-run case. An unreadable or corrupt file
/// is logged and the scan starts from scratch.
pub async fn load_inventory(path: &Path) -> Inventory {
    match tokio::fs::try_exists(path).await {
        Ok(false) => {
            info!(path = %path.display(), "No prior inventory, starting empty");
            return Inventory::new();
        }
        Ok(true) => {}
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to stat prior inventory");
            return Inventory::new();
        }
    }

    match read_inventory(path).await {
        Ok(inventory) => {
            info!(
                path = %path.display(),
                records = inventory.len(),
                "Loaded prior inventory"
            );
            inventory
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to load prior inventory");
            Inventory::new()
        }
    }
}

/// Read an inventory file in either persisted shape
pub async fn read_inventory(path: &Path) -> CensusResult<Inventory> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CensusError::io(path, e))?;
    parse_inventory(&content)
}

/// Parse inventory JSON in either persisted shape
///
/// Fields with null or mismatched values read as defaults; only entries with an
/// invalid key or a non-object value are skipped with a warning.
pub fn parse_inventory(content: &str) -> CensusResult<Inventory> {
    match serde_json::from_str::<Value>(content)? {
        Value::Object(entries) => Ok(parse_keyed(entries)),
        Value::Array(entries) => Ok(parse_legacy(entries)),
        other => Err(CommonError::Config(format!(
            "inventory must be a JSON object or array, found {}",
            json_kind(&other)
        ))
        .into()),
    }
}

fn parse_keyed(entries: Map<String, Value>) -> Inventory {
    let mut inventory = Inventory::new();
    for (raw_key, value) in entries {
        let key = match raw_key.parse::<IdentityKey>() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "Skipping inventory entry with invalid key");
                continue;
            }
        };
        match serde_json::from_value::<InventoryRecord>(value) {
            Ok(mut record) => {
                record.address = mask_address(&record.address);
                inventory.insert(key, record);
            }
            Err(e) => warn!(key = %key, error = %e, "Skipping unreadable inventory record"),
        }
    }
    inventory
}

fn parse_legacy(entries: Vec<Value>) -> Inventory {
    let mut inventory = Inventory::new();
    for (index, mut value) in entries.into_iter().enumerate() {
        let Some((address, port)) = legacy_identity(&value) else {
            warn!(index = index, "Skipping legacy record without ip and port");
            continue;
        };
        // the legacy shape sometimes stores the port as a string
        if let Some(obj) = value.as_object_mut() {
            obj.insert("port".to_string(), Value::from(port));
        }
        match serde_json::from_value::<InventoryRecord>(value) {
            Ok(mut record) => {
                let key = compute_key(&address, port);
                record.address = mask_address(&address);
                inventory.insert(key, record);
            }
            Err(e) => warn!(index = index, error = %e, "Skipping unreadable legacy record"),
        }
    }
    info!(records = inventory.len(), "Converted legacy list inventory");
    inventory
}

/// `ip` and `port` of a legacy record
fn legacy_identity(value: &Value) -> Option<(String, u16)> {
    let address = value.get("ip")?.as_str().filter(|s| !s.is_empty())?;
    let port = match value.get("port")? {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    }
    .filter(|p| *p != 0)?;
    Some((address.to_string(), port))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Write the inventory atomically (temporary file in the same directory, then rename)
pub async fn save_inventory(path: &Path, inventory: &Inventory) -> CensusResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CensusError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(inventory)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, json.as_bytes())
        .await
        .map_err(|e| CensusError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CensusError::io(path, e))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
