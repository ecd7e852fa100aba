//! Planner - resolves desired configuration against prior state
//!
//! Every declared attribute is resolved independently:
//!
//! 1. a non-null configured value is used verbatim (after type checks)
//! 2. a missing required attribute is an error
//! 3. a computed attribute with a non-null prior value keeps that value
//! 4. any other computed attribute becomes unknown
//! 5. anything else is null
//!
//! Nested blocks recurse with the same rules. Lists, both list attributes
//! and list blocks, are replaced as a whole.

use crate::error::{Error, Result};
use crate::reconciler::Action;
use crate::registry::SchemaRegistry;
use crate::schema::{AttributeSpec, BlockSpec, ID_ATTRIBUTE, Nesting, ResourceSchema, Role, Selection};
use crate::types::{Diagnostic, ResourceAddress, ResourceState};
use crate::value::{AttributePath, AttributeValue, Attributes};

/// Inputs to [`plan`].
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub kind: &'a str,
    pub schema: &'a ResourceSchema,
    pub prior_state: Option<&'a ResourceState>,
    pub desired_config: &'a Attributes,
}

/// Output of [`plan`].
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub planned_state: ResourceState,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve a desired configuration into a planned state.
///
/// All problems found in the configuration are reported together; a
/// single problem is returned bare, several as [`Error::Multiple`].
pub fn plan(request: &PlanRequest<'_>) -> Result<PlanResult> {
    let root = AttributePath::root();
    let prior = request.prior_state;

    if let Some(prior) = prior
        && prior.kind != request.kind
    {
        return Err(Error::invalid(
            &root,
            format!(
                "prior state belongs to {} but {} was planned",
                prior.kind, request.kind
            ),
        ));
    }

    let mut walk = Walk::default();
    let prior_id = prior.and_then(ResourceState::id);

    if let Some(id) = request.desired_config.get(ID_ATTRIBUTE)
        && !id.is_null()
    {
        let id_path = AttributePath::attribute(ID_ATTRIBUTE);
        match (id.as_str(), prior_id) {
            (Some(given), Some(current)) if given == current => {}
            (_, Some(current)) => walk.errors.push(Error::invalid(
                &id_path,
                format!("external id cannot change (recorded as {current})"),
            )),
            (_, None) => walk
                .errors
                .push(Error::invalid(&id_path, "external id is assigned by the remote")),
        }
    }

    let config: Attributes = request
        .desired_config
        .iter()
        .filter(|(name, _)| name.as_str() != ID_ATTRIBUTE)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let attributes = walk.object(
        request.schema,
        prior.map(|p| &p.attributes),
        &config,
        &root,
    );

    if let Some(err) = Error::collect(walk.errors) {
        return Err(err);
    }

    let unknown = attributes.values().filter(|v| v.contains_unknown()).count();
    log::debug!(
        "Planned {} ({} attributes, {} known after apply)",
        request.kind,
        attributes.len(),
        unknown
    );

    Ok(PlanResult {
        planned_state: ResourceState {
            kind: request.kind.to_string(),
            external_id: prior_id.map(str::to_string),
            attributes,
        },
        diagnostics: walk.diagnostics,
    })
}

#[derive(Default)]
struct Walk {
    errors: Vec<Error>,
    diagnostics: Vec<Diagnostic>,
}

impl Walk {
    fn object(
        &mut self,
        schema: &ResourceSchema,
        prior: Option<&Attributes>,
        config: &Attributes,
        path: &AttributePath,
    ) -> Attributes {
        for name in config.keys() {
            if !schema.declares(name) {
                self.errors.push(Error::invalid(
                    &path.child(name),
                    "attribute is not declared by the schema",
                ));
            }
        }

        if let Some(prior) = prior {
            for name in prior.keys().filter(|name| !schema.declares(name)) {
                log::warn!("Dropping {} from prior state", path.child(name));
                self.diagnostics.push(Diagnostic::warning(
                    &path.child(name),
                    "no longer declared by the schema; dropped from state",
                ));
            }
        }

        let mut planned = Attributes::new();
        for spec in &schema.attributes {
            let value = self.attribute(
                spec,
                config.get(&spec.name),
                prior.and_then(|p| p.get(&spec.name)),
                &path.child(&spec.name),
            );
            planned.insert(spec.name.clone(), value);
        }

        // Block shapes may depend on the attributes planned above.
        let mut blocks = Vec::with_capacity(schema.blocks.len());
        for block in &schema.blocks {
            let value = self.block(
                block,
                &planned,
                prior,
                config.get(&block.name),
                &path.child(&block.name),
            );
            blocks.push((block.name.clone(), value));
        }
        planned.extend(blocks);

        planned
    }

    fn attribute(
        &mut self,
        spec: &AttributeSpec,
        supplied: Option<&AttributeValue>,
        prior: Option<&AttributeValue>,
        path: &AttributePath,
    ) -> AttributeValue {
        match supplied.filter(|v| !v.is_null()) {
            Some(value) => {
                if !spec.role.accepts_config() {
                    self.errors
                        .push(Error::invalid(path, "attribute is computed and cannot be set"));
                } else if let Err(e) = spec.check(value, path) {
                    self.errors.push(e);
                }
                value.clone()
            }
            None if spec.is_required() => {
                self.errors.push(Error::MissingRequiredAttribute { path: path.clone() });
                AttributeValue::Null
            }
            None if spec.is_computed() => match prior {
                Some(value) if !value.is_null() => value.clone(),
                _ => AttributeValue::Unknown,
            },
            None => AttributeValue::Null,
        }
    }

    fn block(
        &mut self,
        block: &BlockSpec,
        planned_parent: &Attributes,
        prior_parent: Option<&Attributes>,
        supplied: Option<&AttributeValue>,
        path: &AttributePath,
    ) -> AttributeValue {
        let supplied = supplied.filter(|v| !v.is_null());

        let schema = match block.shape.select(planned_parent) {
            Selection::Schema(schema) => schema,
            Selection::Pending => return AttributeValue::Unknown,
            Selection::Unselected => {
                if supplied.is_some() {
                    let discriminator = block.shape.discriminator().unwrap_or_default();
                    self.errors.push(Error::invalid(
                        path,
                        format!("'{discriminator}' must be set to choose the block's shape"),
                    ));
                }
                return AttributeValue::Null;
            }
            Selection::NoVariant(tag) => {
                self.errors
                    .push(Error::invalid(path, format!("no block shape for {tag:?}")));
                return AttributeValue::Null;
            }
        };

        // A prior block planned under a different shape does not carry over.
        let prior = prior_parent
            .filter(|prior| same_selection(block, prior, planned_parent))
            .and_then(|prior| prior.get(&block.name))
            .filter(|v| !v.is_null());

        match block.nesting {
            Nesting::Single => self.single_block(block.role, schema, prior, supplied, path),
            Nesting::List => self.list_block(block.role, schema, prior, supplied, path),
        }
    }

    fn single_block(
        &mut self,
        role: Role,
        schema: &ResourceSchema,
        prior: Option<&AttributeValue>,
        supplied: Option<&AttributeValue>,
        path: &AttributePath,
    ) -> AttributeValue {
        let prior = prior.and_then(AttributeValue::as_object);

        if let Some(value) = supplied {
            let Some(config) = value.as_object() else {
                self.errors.push(Error::invalid(
                    path,
                    format!("expected block, found {}", value.type_name()),
                ));
                return AttributeValue::Null;
            };
            return AttributeValue::Object(self.object(schema, prior, config, path));
        }

        match role {
            Role::Required => {
                self.errors.push(Error::MissingRequiredAttribute { path: path.clone() });
                AttributeValue::Null
            }
            Role::OptionalComputed if !schema.has_required() => {
                AttributeValue::Object(self.object(schema, prior, &Attributes::new(), path))
            }
            // Required inner values can only come from the prior block.
            Role::OptionalComputed => match prior {
                Some(prior) => match required_values(schema, prior) {
                    Some(config) => {
                        AttributeValue::Object(self.object(schema, Some(prior), &config, path))
                    }
                    // Filled by the remote without its required values.
                    None => AttributeValue::Object(prior.clone()),
                },
                None => AttributeValue::Unknown,
            },
            Role::Optional | Role::Computed => AttributeValue::Null,
        }
    }

    fn list_block(
        &mut self,
        role: Role,
        schema: &ResourceSchema,
        prior: Option<&AttributeValue>,
        supplied: Option<&AttributeValue>,
        path: &AttributePath,
    ) -> AttributeValue {
        if let Some(value) = supplied {
            let Some(items) = value.as_list() else {
                self.errors.push(Error::invalid(
                    path,
                    format!("expected list of blocks, found {}", value.type_name()),
                ));
                return AttributeValue::Null;
            };
            let mut planned = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let item_path = path.index(i);
                match item.as_object() {
                    Some(config) => planned.push(AttributeValue::Object(
                        self.object(schema, None, config, &item_path),
                    )),
                    None => self.errors.push(Error::invalid(
                        &item_path,
                        format!("expected block, found {}", item.type_name()),
                    )),
                }
            }
            return AttributeValue::List(planned);
        }

        match role {
            Role::Required => {
                self.errors.push(Error::MissingRequiredAttribute { path: path.clone() });
                AttributeValue::Null
            }
            Role::OptionalComputed => prior.cloned().unwrap_or(AttributeValue::Unknown),
            Role::Optional | Role::Computed => AttributeValue::Null,
        }
    }
}

fn same_selection(block: &BlockSpec, prior: &Attributes, planned: &Attributes) -> bool {
    let Some(discriminator) = block.shape.discriminator() else {
        return true;
    };
    match (prior.get(discriminator), planned.get(discriminator)) {
        (Some(a), Some(b)) => a.same_as(b),
        (None, None) => true,
        _ => false,
    }
}

fn required_values(schema: &ResourceSchema, prior: &Attributes) -> Option<Attributes> {
    let required = schema
        .attributes
        .iter()
        .filter(|a| a.is_required())
        .map(|a| &a.name)
        .chain(
            schema
                .blocks
                .iter()
                .filter(|b| b.role.is_required())
                .map(|b| &b.name),
        );
    required
        .map(|name| {
            prior
                .get(name)
                .filter(|value| !value.is_null())
                .map(|value| (name.clone(), value.clone()))
        })
        .collect()
}

// ============================================================================
// Execution plans
// ============================================================================

/// A planned transition of one resource instance.
#[derive(Debug, Clone)]
pub struct ResourceChange {
    pub address: ResourceAddress,
    /// Recorded state before the change
    pub prior: Option<ResourceState>,
    /// State to reconcile towards; `None` requests deletion
    pub planned: Option<ResourceState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResourceChange {
    /// The remote operation this change needs.
    pub fn action(&self) -> Action {
        Action::decide(self.prior.as_ref(), self.planned.as_ref())
    }

    /// Whether the planned state matches the recorded state exactly.
    pub fn is_noop(&self) -> bool {
        match (&self.prior, &self.planned) {
            (Some(prior), Some(planned)) => prior.is_created() && prior.same_as(planned),
            _ => self.action() == Action::Noop,
        }
    }
}

/// Plan one resource instance.
///
/// `desired` is the instance's configuration, or `None` when it was
/// removed from configuration and should be deleted.
pub fn plan_change(
    registry: &SchemaRegistry,
    address: &ResourceAddress,
    prior: Option<&ResourceState>,
    desired: Option<&Attributes>,
) -> Result<ResourceChange> {
    let Some(desired) = desired else {
        return Ok(ResourceChange {
            address: address.clone(),
            prior: prior.cloned(),
            planned: None,
            diagnostics: Vec::new(),
        });
    };

    let schema = registry.lookup(&address.kind)?;
    let result = plan(&PlanRequest {
        kind: &address.kind,
        schema,
        prior_state: prior,
        desired_config: desired,
    })?;

    Ok(ResourceChange {
        address: address.clone(),
        prior: prior.cloned(),
        planned: Some(result.planned_state),
        diagnostics: result.diagnostics,
    })
}

/// An execution plan: the changes for a set of resource instances
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<ResourceChange>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: ResourceChange) {
        self.changes.push(change);
    }

    /// Filter plan to only include changes matching a predicate
    #[must_use]
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&ResourceChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include changes matching any target
    ///
    /// Target format: "kind" or "kind.name". No targets keeps everything.
    #[must_use]
    pub fn filter_by_targets(self, targets: &[String]) -> Self {
        if targets.is_empty() {
            return self;
        }
        let parsed: Vec<_> = targets.iter().map(|t| parse_target(t)).collect();
        self.filter(|change| {
            parsed
                .iter()
                .any(|(kind, name)| matches_filter(&change.address, kind, name.as_deref()))
        })
    }

    /// Changes that need a remote call
    pub fn pending(&self) -> impl Iterator<Item = &ResourceChange> {
        self.changes.iter().filter(|c| !c.is_noop())
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Parse a target string like "kind.name" into (kind, name)
fn parse_target(target: &str) -> (String, Option<String>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind.to_string(), Some(name.to_string())),
        None => (target.to_string(), None),
    }
}

/// Check if an address matches the filter criteria
fn matches_filter(address: &ResourceAddress, kind: &str, name: Option<&str>) -> bool {
    if address.kind != kind {
        return false;
    }

    if let Some(n) = name
        && address.name != n
    {
        return false;
    }

    true
}
