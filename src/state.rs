use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{ResourceAddress, ResourceState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Recorded state of every managed resource
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    pub version: u32,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Resource states keyed by `kind.name`
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, newer than supported version {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, replacing the previous file atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceState> {
        self.resources.get(&address.to_string())
    }

    /// Record the state of `address`; `None` forgets it.
    pub fn set(&mut self, address: &ResourceAddress, state: Option<ResourceState>) {
        let key = address.to_string();
        match state {
            Some(state) => {
                self.resources.insert(key, state);
            }
            None => {
                self.resources.remove(&key);
            }
        }
    }

    /// Addresses of every recorded resource.
    pub fn addresses(&self) -> Result<Vec<ResourceAddress>> {
        self.resources
            .keys()
            .map(|key| {
                key.parse::<ResourceAddress>()
                    .with_context(|| format!("Invalid address in state file: {key}"))
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{AttributeValue, Attributes};
    use tempfile::TempDir;

    fn vault_state() -> ResourceState {
        ResourceState::new(
            "vault_cluster",
            Attributes::from([
                ("name".to_string(), AttributeValue::from("primary")),
                ("max_lease_ttl".to_string(), AttributeValue::Unknown),
                ("default_lease_ttl".to_string(), AttributeValue::Null),
            ]),
        )
        .with_id("abc")
    }

    #[test]
    fn test_default_state() {
        let state = StateFile::default();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_set_and_forget() {
        let mut state = StateFile::default();
        let address = ResourceAddress::new("vault_cluster", "primary");

        state.set(&address, Some(vault_state()));
        assert_eq!(state.get(&address).and_then(ResourceState::id), Some("abc"));
        assert_eq!(state.addresses().unwrap(), vec![address.clone()]);

        state.set(&address, None);
        assert!(state.get(&address).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let address = ResourceAddress::new("vault_cluster", "primary");

        let mut state = StateFile::default();
        state.set(&address, Some(vault_state()));
        state.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = StateFile::load(&path).unwrap();
        let recorded = loaded.get(&address).unwrap();
        assert!(recorded.same_as(&vault_state()));
        // Null and unknown stay distinct on disk
        assert!(recorded.attributes["max_lease_ttl"].is_unknown());
        assert!(recorded.attributes["default_lease_ttl"].is_null());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::load(&dir.path().join("state.json")).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_load_rejects_newer_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"version": 99, "last_updated": "2026-01-01T00:00:00Z", "resources": {}}"#,
        )
        .unwrap();

        assert!(StateFile::load(&path).is_err());
    }

    #[test]
    fn test_invalid_address_in_state() {
        let mut state = StateFile::default();
        state
            .resources
            .insert("not-an-address".to_string(), vault_state());
        assert!(state.addresses().is_err());
    }
}
