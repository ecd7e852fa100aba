//! Remote control-plane capability
//!
//! The engine talks to the remote through [`Remote`], one synchronous
//! call at a time per resource instance. Every call receives a
//! [`CancelToken`]; implementations check it before causing any side
//! effect and report whether an interrupted call may have taken effect.

use crate::codec::NativeObject;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error as ThisError;

/// Response to a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// Identifier assigned by the remote
    pub id: String,
    /// Authoritative representation after create
    pub document: NativeObject,
}

/// Typed failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    /// A resource with a colliding identity already exists
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The request was refused because of one field
    #[error("invalid {field}: {message}")]
    Rejected { field: String, message: String },

    #[error("server error: {message}")]
    Server { message: String },

    /// Aborted before any side effect
    #[error("cancelled")]
    Cancelled,

    /// Aborted after the request may have taken effect
    #[error("interrupted: {message}")]
    Interrupted { message: String },
}

impl RemoteError {
    /// Convert to an engine error for `kind`, naming `id` when known.
    pub fn into_error(self, kind: &str, id: Option<&str>) -> Error {
        let kind = kind.to_string();
        match self {
            Self::NotFound => Error::RemoteNotFound {
                kind,
                id: id.unwrap_or_default().to_string(),
            },
            Self::Conflict { message } => Error::RemoteConflict { kind, message },
            Self::Rejected { field, message } => Error::RemoteRejected {
                kind,
                field,
                message,
            },
            Self::Server { message } => Error::RemoteServerError { kind, message },
            Self::Cancelled => Error::Cancelled,
            Self::Interrupted { message } => Error::InconsistentState {
                kind,
                id: id.map(str::to_string),
                message,
            },
        }
    }
}

/// Result of a remote call.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The remote control plane, working on native documents.
///
/// Implementations must be safe to share between threads; the engine
/// reconciles distinct resource instances in parallel.
pub trait Remote: Send + Sync {
    /// Fetch a resource; [`RemoteError::NotFound`] when absent
    fn get(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<NativeObject>;

    /// Create a resource and return its id and authoritative document
    fn create(
        &self,
        kind: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<Created>;

    /// Replace a resource and return its authoritative document
    fn update(
        &self,
        kind: &str,
        id: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<NativeObject>;

    /// Delete a resource; [`RemoteError::NotFound`] when already absent
    fn delete(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<()>;
}

impl<R: Remote + ?Sized> Remote for Arc<R> {
    fn get(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<NativeObject> {
        (**self).get(kind, id, cancel)
    }

    fn create(
        &self,
        kind: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<Created> {
        (**self).create(kind, document, cancel)
    }

    fn update(
        &self,
        kind: &str,
        id: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<NativeObject> {
        (**self).update(kind, id, document, cancel)
    }

    fn delete(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<()> {
        (**self).delete(kind, id, cancel)
    }
}

/// Cooperative cancellation signal with an optional deadline.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also expires at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
