//! Importer - adopts existing remote resources and refreshes recorded ones

use crate::error::{Error, Result};
use crate::registry::SchemaRegistry;
use crate::remote::{CancelToken, Remote, RemoteError};
use crate::types::ResourceState;

/// Reads resources from a [`Remote`] into [`ResourceState`]s.
pub struct Importer<'a, R: Remote + ?Sized> {
    registry: &'a SchemaRegistry,
    remote: &'a R,
}

impl<'a, R: Remote + ?Sized> Importer<'a, R> {
    pub fn new(registry: &'a SchemaRegistry, remote: &'a R) -> Self {
        Self { registry, remote }
    }

    /// Build a state for an existing remote resource.
    ///
    /// Every declared attribute is present in the result, null when the
    /// remote did not report it. Fails when the resource does not exist.
    pub fn import(&self, kind: &str, id: &str, cancel: &CancelToken) -> Result<ResourceState> {
        if id.is_empty() {
            return Err(Error::Other(format!("cannot import {kind} with an empty id")));
        }
        self.read(kind, id, cancel)?.ok_or_else(|| Error::RemoteNotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        })
    }

    /// Re-read a recorded state from the remote.
    ///
    /// Returns `None` when the resource no longer exists. A state that
    /// was never created is returned unchanged without a remote call.
    pub fn refresh(
        &self,
        state: &ResourceState,
        cancel: &CancelToken,
    ) -> Result<Option<ResourceState>> {
        let Some(id) = state.id() else {
            return Ok(Some(state.clone()));
        };
        self.read(&state.kind, id, cancel)
    }

    fn read(&self, kind: &str, id: &str, cancel: &CancelToken) -> Result<Option<ResourceState>> {
        let resource_kind = self.registry.kind(kind)?;
        cancel.check()?;

        log::debug!("Reading {kind} {id}");
        let document = match self.remote.get(kind, id, cancel) {
            Ok(document) => document,
            Err(RemoteError::NotFound) => {
                log::info!("{kind} {id} no longer exists");
                return Ok(None);
            }
            Err(e) => return Err(e.into_error(kind, Some(id))),
        };

        let attributes = resource_kind.decode(&document)?;
        resource_kind.schema().validate_shape(&attributes)?;

        Ok(Some(ResourceState {
            kind: kind.to_string(),
            external_id: Some(id.to_string()),
            attributes,
        }))
    }
}
