//! ConfigurationKey store (§3): an ordered sequence of OCPP configuration
//! keys, persisted to a per-station JSON file keyed by the station hash id.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationKey {
    pub key: String,
    pub value: String,
    pub readonly: bool,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub reboot_required: Option<bool>,
}

impl ConfigurationKey {
    pub fn new(key: impl Into<String>, value: impl Into<String>, readonly: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            readonly,
            visible: None,
            reboot_required: None,
        }
    }
}

/// Ordered store of [ConfigurationKey]s; add/set/delete operate on first
/// match. Case-sensitive by default; `case_insensitive` enables relaxed
/// lookups (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationKeyStore {
    keys: Vec<ConfigurationKey>,
    #[serde(skip)]
    pub case_insensitive: bool,
}

impl ConfigurationKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigurationKey> {
        self.keys.iter().find(|k| self.matches(&k.key, key))
    }

    /// Insert a new key, or overwrite the first existing match when
    /// `overwrite` is set (used by the NumberOfConnectors seed, §4.H step 5).
    pub fn add(&mut self, entry: ConfigurationKey, overwrite: bool) {
        if overwrite {
            if let Some(existing) = self.keys.iter_mut().find(|k| self.matches(&k.key, &entry.key)) {
                *existing = entry;
                return;
            }
        }
        self.keys.push(entry);
    }

    /// Sets the value of the first matching (non-readonly) key. Returns
    /// false if the key is unknown or readonly.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.keys.iter_mut().find(|k| self.matches(&k.key, key)) {
            Some(existing) if !existing.readonly => {
                existing.value = value.into();
                true
            }
            _ => false,
        }
    }

    pub fn delete(&mut self, key: &str) -> bool {
        if let Some(pos) = self.keys.iter().position(|k| self.matches(&k.key, key)) {
            self.keys.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn all(&self) -> &[ConfigurationKey] {
        &self.keys
    }
}

/// On-disk envelope for a station's persisted configuration (§4.H step 2,
/// §5): the `hash_id` lets a later run detect that the template identity
/// changed and the persisted keys should be re-derived instead of reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedConfiguration {
    hash_id: String,
    store: ConfigurationKeyStore,
}

/// The default location a station's persisted configuration lives at
/// (§4.H step 2): `assets/configurations/<hashId>.json`, relative to the
/// process's working directory.
pub fn default_config_path(hash_id: &str) -> PathBuf {
    Path::new("assets").join("configurations").join(format!("{hash_id}.json"))
}

/// Reads the persisted configuration at `path` if present and its recorded
/// hash id matches `hash_id`; otherwise derives a fresh store via `derive`
/// and persists it. Mirrors the "read-if-hash-matches-else-derive-and-
/// persist" rule in §4.H step 2.
pub fn load_or_derive(
    path: &Path,
    hash_id: &str,
    derive: impl FnOnce() -> ConfigurationKeyStore,
) -> ConfigurationKeyStore {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str::<PersistedConfiguration>(&text) {
            Ok(persisted) if persisted.hash_id == hash_id => {
                info!(path = %path.display(), "loaded persisted station configuration");
                return persisted.store;
            }
            Ok(_) => info!(path = %path.display(), "persisted configuration hash mismatch, re-deriving"),
            Err(e) => warn!(path = %path.display(), error = %e, "persisted configuration unreadable, re-deriving"),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to read persisted configuration, re-deriving"),
    }

    let store = derive();
    if let Err(e) = persist(path, hash_id, &store) {
        warn!(path = %path.display(), error = %e, "failed to persist derived station configuration");
    }
    store
}

/// Atomically persists `store` to `path`: write to a sibling temp file,
/// then rename over the destination, so a crash mid-write never leaves a
/// truncated configuration file (§5 "Shared resources").
pub fn persist(path: &Path, hash_id: &str, store: &ConfigurationKeyStore) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let envelope = PersistedConfiguration {
        hash_id: hash_id.to_string(),
        store: store.clone(),
    };
    let encoded = serde_json::to_string_pretty(&envelope)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut temp_path = path.to_path_buf();
    temp_path.set_extension("json.tmp");
    std::fs::write(&temp_path, encoded)?;
    std::fs::rename(&temp_path, path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_is_rejected_for_readonly_keys() {
        let mut store = ConfigurationKeyStore::new();
        store.add(ConfigurationKey::new("NumberOfConnectors", "2", true), false);
        assert!(!store.set("NumberOfConnectors", "3"));
        assert_eq!(store.get("NumberOfConnectors").unwrap().value, "2");
    }

    #[test]
    fn add_with_overwrite_replaces_first_match() {
        let mut store = ConfigurationKeyStore::new();
        store.add(ConfigurationKey::new("NumberOfConnectors", "1", true), false);
        store.add(ConfigurationKey::new("NumberOfConnectors", "2", true), true);
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.get("NumberOfConnectors").unwrap().value, "2");
    }

    #[test]
    fn case_insensitive_lookup_when_enabled() {
        let mut store = ConfigurationKeyStore::new();
        store.case_insensitive = true;
        store.add(ConfigurationKey::new("HeartbeatInterval", "60", false), false);
        assert!(store.get("heartbeatinterval").is_some());
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ocpp-station-sim-test-{name}-{:?}.json", std::thread::current().id()))
    }

    #[test]
    fn load_or_derive_persists_on_first_run_then_reloads() {
        let path = scratch_path("load-or-derive");
        let _ = std::fs::remove_file(&path);

        let derived = load_or_derive(&path, "hash-1", || {
            let mut store = ConfigurationKeyStore::new();
            store.add(ConfigurationKey::new("HeartbeatInterval", "60", false), true);
            store
        });
        assert_eq!(derived.get("HeartbeatInterval").unwrap().value, "60");
        assert!(path.exists());

        let reloaded = load_or_derive(&path, "hash-1", || {
            panic!("derive should not run again once the file matches");
        });
        assert_eq!(reloaded.get("HeartbeatInterval").unwrap().value, "60");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_or_derive_rederives_on_hash_mismatch() {
        let path = scratch_path("hash-mismatch");
        let _ = std::fs::remove_file(&path);

        persist(&path, "hash-old", &ConfigurationKeyStore::new()).unwrap();

        let mut called = false;
        let derived = load_or_derive(&path, "hash-new", || {
            called = true;
            let mut store = ConfigurationKeyStore::new();
            store.add(ConfigurationKey::new("HeartbeatInterval", "30", false), true);
            store
        });
        assert!(called);
        assert_eq!(derived.get("HeartbeatInterval").unwrap().value, "30");

        let _ = std::fs::remove_file(&path);
    }
}
