//! Core types for declarative resource management

use crate::error::{Error, Result};
use crate::value::{AttributePath, Attributes, same_attributes};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of a managed resource instance, written `kind.name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress {
    pub kind: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}

impl FromStr for ResourceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() && !name.contains('.') => {
                Ok(Self::new(kind, name))
            }
            _ => Err(Error::InvalidAddress(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Recorded or planned state of one resource instance.
///
/// `external_id` is set by the first successful create and never changes
/// afterwards. Deletion is represented by the absence of a state, not by
/// a variant of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub attributes: Attributes,
}

impl ResourceState {
    pub fn new(kind: &str, attributes: Attributes) -> Self {
        Self {
            kind: kind.to_string(),
            external_id: None,
            attributes,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.external_id = Some(id.to_string());
        self
    }

    /// The external id, treating an empty id as not yet created.
    pub fn id(&self) -> Option<&str> {
        self.external_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether the remote resource has been created.
    pub fn is_created(&self) -> bool {
        self.id().is_some()
    }

    /// Identity comparison, treating unknown values as identical.
    pub fn same_as(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.id() == other.id()
            && same_attributes(&self.attributes, &other.attributes)
    }
}

/// A warning reported alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: AttributePath,
    pub summary: String,
}

impl Diagnostic {
    pub fn warning(path: &AttributePath, summary: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            summary: summary.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "warning: {}", self.summary)
        } else {
            write!(f, "warning: {}: {}", self.path, self.summary)
        }
    }
}

/// Result of applying a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    /// Resource was created
    Created,
    /// Resource was modified
    Modified,
    /// Resource was removed
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.failed + self.no_change
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of resources reconciled in parallel
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
        }
    }
}
