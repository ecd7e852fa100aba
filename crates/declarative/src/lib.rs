//! # Declarative
//!
//! A schema-driven engine for declarative resource reconciliation.
//!
//! Callers declare the desired configuration of remote resources. The
//! engine plans the state each resource should reach, reconciles it
//! against a remote control plane, and records what the remote
//! reports back.
//!
//! ## Core Concepts
//!
//! - **AttributeValue**: A dynamically typed value that may be unknown until apply
//! - **ResourceSchema**: Declared attributes and nested blocks of a resource kind
//! - **SchemaRegistry**: The resource kinds an engine can manage
//! - **Planner**: Computes the planned state from prior state and desired config
//! - **Reconciler**: Issues the create, update or delete a planned state needs
//! - **Importer**: Adopts existing remote resources and refreshes recorded ones
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     CancelToken, PlanRequest, Reconciler, SchemaRegistry, plan,
//! };
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(VaultCluster::new())?;
//!
//! let planned = plan(&PlanRequest {
//!     kind: "vault_cluster",
//!     schema: registry.lookup("vault_cluster")?,
//!     prior_state: None,
//!     desired_config: &config,
//! })?;
//!
//! let reconciled = Reconciler::new(&registry, &remote)
//!     .reconcile(None, Some(&planned.planned_state), &CancelToken::new())?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`Remote`]: The remote control plane
//! - [`ResourceKind`]: A kind's schema and native mapping
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations

pub mod codec;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod importer;
pub mod planner;
pub mod reconciler;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod types;
pub mod value;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use codec::{NativeObject, from_native, to_native};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{
    AttributeChange, DiffSummary, ResourceDiff, compute_diffs, diff_attributes, diff_states,
    group_by_kind,
};
pub use error::{Error, ErrorCategory, Result};
pub use executor::{ExecutionOutcome, execute};
pub use importer::Importer;
pub use planner::{ExecutionPlan, PlanRequest, PlanResult, ResourceChange, plan, plan_change};
pub use reconciler::{Action, Reconciled, Reconciler, merge_attributes};
pub use registry::{ResourceKind, SchemaRegistry};
pub use remote::{CancelToken, Created, Remote, RemoteError, RemoteResult};
pub use schema::{
    AttributeSpec, BlockShape, BlockSpec, ID_ATTRIBUTE, Nesting, ResourceSchema, Role, Selection,
    ValueType,
};
pub use types::{
    ApplyResult, Diagnostic, ExecuteOptions, ExecuteSummary, ResourceAddress, ResourceState,
};
pub use value::{
    AttributePath, AttributeValue, Attributes, FromAttribute, IntoAttribute, PathStep, Scalar,
    get_as,
};
