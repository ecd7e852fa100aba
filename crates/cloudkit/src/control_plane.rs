//! In-process control plane
//!
//! [`LocalControlPlane`] keeps native documents per kind, assigns ids,
//! validates requests and fills defaults the way the hosted service
//! does. With a backing file, every mutation is saved before it is
//! acknowledged; a failed save leaves the store unchanged.

use crate::defaults::fill_defaults;
use crate::error::{ControlPlaneError, Result};
use crate::kinds::{AccessPolicy, NomadCluster, StaticIp, VaultCluster};
use crate::regions;
use declarative::{CancelToken, Created, NativeObject, Remote, RemoteError, RemoteResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Documents by kind, then by id
type Store = BTreeMap<String, BTreeMap<String, NativeObject>>;

/// A [`Remote`] backed by memory and, optionally, a JSON file.
#[derive(Debug, Default)]
pub struct LocalControlPlane {
    store: Mutex<Store>,
    path: Option<PathBuf>,
    authenticated: bool,
}

impl LocalControlPlane {
    /// An empty control plane that is never saved.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a control plane backed by `path`, starting empty if the file
    /// does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let store = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| ControlPlaneError::io(path, e))?;
            serde_json::from_str(&content).map_err(|e| ControlPlaneError::json(path, e))?
        } else {
            log::debug!("Control plane store {} does not exist yet", path.display());
            Store::new()
        };

        Ok(Self {
            store: Mutex::new(store),
            path: Some(path.to_path_buf()),
            authenticated: false,
        })
    }

    /// Act as an authenticated caller, which unlocks more regions.
    #[must_use]
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Number of stored resources of `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.lock().get(kind).map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Apply `mutate` to a copy of the store, save it, then commit.
    fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut Store) -> RemoteResult<T>,
    ) -> RemoteResult<T> {
        let mut store = self.lock();
        let mut next = store.clone();
        let result = mutate(&mut next)?;
        if let Some(path) = &self.path {
            save(path, &next).map_err(|e| RemoteError::Server {
                message: e.to_string(),
            })?;
        }
        *store = next;
        Ok(result)
    }

    fn validate(kind: &str, doc: &NativeObject) -> RemoteResult<()> {
        if kind != AccessPolicy::NAME && kind != StaticIp::NAME {
            require_string(doc, "name")?;
        }

        match kind {
            NomadCluster::NAME => {
                require_string(doc, "datacenter")?;
            }
            AccessPolicy::NAME => {
                let has_target = doc
                    .get("policyData")
                    .and_then(|data| data.get("id"))
                    .and_then(Value::as_str)
                    .is_some_and(|id| !id.is_empty());
                if !has_target {
                    return Err(RemoteError::Rejected {
                        field: "policyData.id".to_string(),
                        message: "is required".to_string(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Region checks apply to creates only.
    fn validate_placement(&self, kind: &str, doc: &NativeObject) -> RemoteResult<()> {
        if kind != VaultCluster::NAME {
            return Ok(());
        }

        let region_id = require_string(doc, "region")?;
        let region = regions::find(region_id, self.authenticated).ok_or_else(|| {
            RemoteError::Rejected {
                field: "region".to_string(),
                message: format!("unknown region {region_id:?}"),
            }
        })?;
        if !region.products.vault {
            return Err(RemoteError::Rejected {
                field: "region".to_string(),
                message: format!("vault is not available in {region_id}"),
            });
        }
        Ok(())
    }
}

fn require_string<'a>(doc: &'a NativeObject, field: &str) -> RemoteResult<&'a str> {
    match doc.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(RemoteError::Rejected {
            field: field.to_string(),
            message: "is required".to_string(),
        }),
    }
}

/// Fail with a conflict if another resource of the kind has the same name.
fn check_unique_name(
    resources: Option<&BTreeMap<String, NativeObject>>,
    doc: &NativeObject,
    except: Option<&str>,
) -> RemoteResult<()> {
    let Some(name) = doc.get("name").and_then(Value::as_str) else {
        return Ok(());
    };
    let taken = resources.is_some_and(|resources| {
        resources.iter().any(|(id, other)| {
            Some(id.as_str()) != except && other.get("name").and_then(Value::as_str) == Some(name)
        })
    });
    if taken {
        return Err(RemoteError::Conflict {
            message: format!("name {name:?} is already in use"),
        });
    }
    Ok(())
}

fn save(path: &Path, store: &Store) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(|e| ControlPlaneError::io(dir, e))?;
    }

    let content = serde_json::to_string_pretty(store).map_err(|e| ControlPlaneError::json(path, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| ControlPlaneError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| ControlPlaneError::io(path, e))?;

    log::debug!("Saved control plane store to {}", path.display());
    Ok(())
}

fn check_cancel(cancel: &CancelToken) -> RemoteResult<()> {
    if cancel.is_cancelled() {
        return Err(RemoteError::Cancelled);
    }
    Ok(())
}

impl Remote for LocalControlPlane {
    fn get(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<NativeObject> {
        check_cancel(cancel)?;
        log::debug!("GET {kind}/{id}");
        self.lock()
            .get(kind)
            .and_then(|resources| resources.get(id))
            .cloned()
            .ok_or(RemoteError::NotFound)
    }

    fn create(
        &self,
        kind: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<Created> {
        check_cancel(cancel)?;
        Self::validate(kind, document)?;
        self.validate_placement(kind, document)?;

        let mut doc = document.clone();
        fill_defaults(kind, &mut doc);

        let id = uuid::Uuid::new_v4().to_string();
        log::debug!("POST {kind} -> {id}");

        self.commit(|store| {
            check_unique_name(store.get(kind), &doc, None)?;
            store
                .entry(kind.to_string())
                .or_default()
                .insert(id.clone(), doc.clone());
            Ok(())
        })?;

        Ok(Created { id, document: doc })
    }

    fn update(
        &self,
        kind: &str,
        id: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<NativeObject> {
        check_cancel(cancel)?;
        Self::validate(kind, document)?;

        let mut doc = document.clone();
        fill_defaults(kind, &mut doc);
        log::debug!("PUT {kind}/{id}");

        self.commit(|store| {
            let resources = store.get_mut(kind).ok_or(RemoteError::NotFound)?;
            if !resources.contains_key(id) {
                return Err(RemoteError::NotFound);
            }
            check_unique_name(Some(resources), &doc, Some(id))?;
            resources.insert(id.to_string(), doc.clone());
            Ok(())
        })?;

        Ok(doc)
    }

    fn delete(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<()> {
        check_cancel(cancel)?;
        log::debug!("DELETE {kind}/{id}");

        self.commit(|store| {
            store
                .get_mut(kind)
                .and_then(|resources| resources.remove(id))
                .map(|_| ())
                .ok_or(RemoteError::NotFound)
        })
    }
}
