//! Reconciler - executes a planned transition against the remote
//!
//! The remote call is chosen from (prior, planned): create when nothing
//! was created yet, update when both exist, delete when the plan is a
//! deletion. The persisted result keeps the planned values, filling in
//! only what the plan left unknown from the remote's response.

use crate::error::{Error, Result};
use crate::registry::{ResourceKind, SchemaRegistry};
use crate::remote::{CancelToken, Remote, RemoteError};
use crate::codec::NativeObject;
use crate::types::{Diagnostic, ResourceState};
use crate::value::{AttributePath, AttributeValue, Attributes};
use std::fmt;

/// Remote operation needed to move from a prior to a planned state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
    Noop,
}

impl Action {
    /// Choose the operation for a transition.
    ///
    /// A prior state without an external id counts as absent.
    pub fn decide(prior: Option<&ResourceState>, planned: Option<&ResourceState>) -> Self {
        let created = prior.is_some_and(ResourceState::is_created);
        match (created, planned.is_some()) {
            (false, true) => Self::Create,
            (true, true) => Self::Update,
            (true, false) => Self::Delete,
            (false, false) => Self::Noop,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Noop => "no-op",
        };
        write!(f, "{label}")
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub action: Action,
    /// State to persist; `None` means the resource is absent
    pub state: Option<ResourceState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Reconciled {
    fn absent(action: Action) -> Self {
        Self {
            action,
            state: None,
            diagnostics: Vec::new(),
        }
    }
}

/// Executes planned transitions against a [`Remote`].
///
/// Each call issues at most one remote request and never retries.
pub struct Reconciler<'a, R: Remote + ?Sized> {
    registry: &'a SchemaRegistry,
    remote: &'a R,
}

impl<'a, R: Remote + ?Sized> Reconciler<'a, R> {
    pub fn new(registry: &'a SchemaRegistry, remote: &'a R) -> Self {
        Self { registry, remote }
    }

    /// Reconcile one resource instance.
    ///
    /// On error nothing should be persisted: the prior state stays
    /// authoritative, except for [`Error::InconsistentState`], which
    /// means the remote may have changed and needs inspection.
    pub fn reconcile(
        &self,
        prior: Option<&ResourceState>,
        planned: Option<&ResourceState>,
        cancel: &CancelToken,
    ) -> Result<Reconciled> {
        if let (Some(prior), Some(planned)) = (prior, planned)
            && prior.kind != planned.kind
        {
            return Err(Error::invalid(
                &AttributePath::root(),
                format!("cannot change kind from {} to {}", prior.kind, planned.kind),
            ));
        }

        let created = prior.and_then(|p| Some((p.kind.as_str(), p.id()?)));
        match (created, planned) {
            (Some((kind, id)), None) => self.delete(kind, id, cancel),
            (Some((_, id)), Some(planned)) => self.update(id, planned, cancel),
            (None, Some(planned)) => self.create(planned, cancel),
            (None, None) => Ok(Reconciled::absent(Action::Noop)),
        }
    }

    fn delete(&self, kind: &str, id: &str, cancel: &CancelToken) -> Result<Reconciled> {
        cancel.check()?;
        log::info!("Deleting {kind} {id}");
        match self.remote.delete(kind, id, cancel) {
            Ok(()) => {}
            Err(RemoteError::NotFound) => log::info!("{kind} {id} is already absent"),
            Err(e) => return Err(e.into_error(kind, Some(id))),
        }
        Ok(Reconciled::absent(Action::Delete))
    }

    fn create(&self, planned: &ResourceState, cancel: &CancelToken) -> Result<Reconciled> {
        let (kind, document) = self.prepare(planned)?;
        cancel.check()?;

        log::info!("Creating {}", planned.kind);
        let created = self
            .remote
            .create(&planned.kind, &document, cancel)
            .map_err(|e| e.into_error(&planned.kind, None))?;

        if created.id.is_empty() {
            return Err(Error::InconsistentState {
                kind: planned.kind.clone(),
                id: None,
                message: "create succeeded without returning an id".to_string(),
            });
        }

        merge_back(kind, planned, &created.id, &created.document, Action::Create)
    }

    fn update(&self, id: &str, planned: &ResourceState, cancel: &CancelToken) -> Result<Reconciled> {
        let (kind, document) = self.prepare(planned)?;
        cancel.check()?;

        log::info!("Updating {} {id}", planned.kind);
        let response = self
            .remote
            .update(&planned.kind, id, &document, cancel)
            .map_err(|e| e.into_error(&planned.kind, Some(id)))?;

        merge_back(kind, planned, id, &response, Action::Update)
    }

    /// Validate the planned state and encode it, before any remote call.
    fn prepare(&self, planned: &ResourceState) -> Result<(&'a dyn ResourceKind, NativeObject)> {
        let kind = self.registry.kind(&planned.kind)?;
        kind.schema().validate_state(&planned.attributes)?;
        let document = kind.encode(&planned.attributes)?;
        Ok((kind, document))
    }
}

fn merge_back(
    kind: &dyn ResourceKind,
    planned: &ResourceState,
    id: &str,
    document: &NativeObject,
    action: Action,
) -> Result<Reconciled> {
    let response = kind.decode(document).map_err(|e| Error::InconsistentState {
        kind: planned.kind.clone(),
        id: Some(id.to_string()),
        message: format!("{action} succeeded but the response could not be read: {e}"),
    })?;

    let mut diagnostics = Vec::new();
    let attributes = merge_attributes(
        &planned.attributes,
        &response,
        &AttributePath::root(),
        &mut diagnostics,
    );

    Ok(Reconciled {
        action,
        state: Some(ResourceState {
            kind: planned.kind.clone(),
            external_id: Some(id.to_string()),
            attributes,
        }),
        diagnostics,
    })
}

/// Merge a remote response into planned attributes.
///
/// Known planned values are kept as planned. Unknown values take the
/// response's value; a list holding any unknown is replaced whole.
pub fn merge_attributes(
    planned: &Attributes,
    response: &Attributes,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) -> Attributes {
    let mut merged = Attributes::new();
    for (name, value) in planned {
        let value_path = path.child(name);
        let value = merge_value(value, response.get(name), &value_path, diagnostics);
        merged.insert(name.clone(), value);
    }
    merged
}

fn merge_value(
    planned: &AttributeValue,
    response: Option<&AttributeValue>,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) -> AttributeValue {
    if planned.is_known() {
        return planned.clone();
    }
    match planned {
        AttributeValue::Object(inner) => {
            let empty = Attributes::new();
            let response = response.and_then(AttributeValue::as_object).unwrap_or(&empty);
            AttributeValue::Object(merge_attributes(inner, response, path, diagnostics))
        }
        _ => match response.filter(|v| !v.is_null()) {
            Some(value) => value.clone(),
            None => {
                log::warn!("Remote returned no value for {path}");
                diagnostics.push(Diagnostic::warning(
                    path,
                    "remote returned no value; recorded as null",
                ));
                AttributeValue::Null
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{PlanRequest, plan};
    use crate::testing::{MockRemote, registry, widget_config};
    use serde_json::json;

    fn plan_widget(
        registry: &SchemaRegistry,
        prior: Option<&ResourceState>,
        config: &Attributes,
    ) -> ResourceState {
        plan(&PlanRequest {
            kind: "widget",
            schema: registry.lookup("widget").unwrap(),
            prior_state: prior,
            desired_config: config,
        })
        .unwrap()
        .planned_state
    }

    #[test]
    fn test_decide() {
        let state = ResourceState::new("widget", Attributes::new());
        let created = state.clone().with_id("1");

        assert_eq!(Action::decide(None, Some(&state)), Action::Create);
        assert_eq!(Action::decide(Some(&state), Some(&state)), Action::Create);
        assert_eq!(Action::decide(Some(&created), Some(&state)), Action::Update);
        assert_eq!(Action::decide(Some(&created), None), Action::Delete);
        assert_eq!(Action::decide(Some(&state), None), Action::Noop);
        assert_eq!(Action::decide(None, None), Action::Noop);
    }

    #[test]
    fn test_create_fills_unknown_from_response() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);

        let planned = plan_widget(&registry, None, &widget_config("x"));
        assert!(planned.attributes["ttl"].is_unknown());

        let result = reconciler
            .reconcile(None, Some(&planned), &CancelToken::new())
            .unwrap();
        assert_eq!(result.action, Action::Create);

        let state = result.state.unwrap();
        assert_eq!(state.id(), Some("1"));
        assert_eq!(state.attributes["name"], AttributeValue::from("x"));
        assert_eq!(state.attributes["ttl"], AttributeValue::from("24h"));
        assert_eq!(state.attributes["tags"], AttributeValue::List(Vec::new()));
        assert!(result.diagnostics.is_empty());
        assert_eq!(remote.calls(), vec!["create widget"]);
        assert_eq!(remote.stored("1").unwrap()["name"], json!("x"));
    }

    #[test]
    fn test_update_keeps_planned_values() {
        let registry = registry();
        let remote = MockRemote::new();
        remote.insert("1", json!({"name": "x", "ttl": "24h", "tags": []}));
        let reconciler = Reconciler::new(&registry, &remote);

        let prior = ResourceState::new(
            "widget",
            Attributes::from([
                ("name".to_string(), "x".into()),
                ("ttl".to_string(), "24h".into()),
                ("tags".to_string(), AttributeValue::List(Vec::new())),
            ]),
        )
        .with_id("1");
        let planned = plan_widget(&registry, Some(&prior), &widget_config("y"));
        assert_eq!(planned.attributes["ttl"], AttributeValue::from("24h"));

        // The remote normalizes the name; the planned value is persisted.
        remote.respond_with(json!({"name": "Y", "ttl": "24h", "tags": []}));
        let result = reconciler
            .reconcile(Some(&prior), Some(&planned), &CancelToken::new())
            .unwrap();

        assert_eq!(result.action, Action::Update);
        let state = result.state.unwrap();
        assert_eq!(state.id(), Some("1"));
        assert_eq!(state.attributes["name"], AttributeValue::from("y"));
        assert_eq!(remote.calls(), vec!["update widget 1"]);
    }

    #[test]
    fn test_update_of_vanished_resource_fails() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);

        let prior = plan_widget(&registry, None, &widget_config("x")).with_id("42");
        let planned = plan_widget(&registry, Some(&prior), &widget_config("x"));

        let err = reconciler
            .reconcile(Some(&prior), Some(&planned), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_not_found());
        // Not silently recreated
        assert_eq!(remote.calls(), vec!["update widget 42"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let registry = registry();
        let remote = MockRemote::new();
        remote.insert("1", json!({"name": "x", "ttl": "24h", "tags": []}));
        let reconciler = Reconciler::new(&registry, &remote);

        let prior = plan_widget(&registry, None, &widget_config("x")).with_id("1");

        let first = reconciler
            .reconcile(Some(&prior), None, &CancelToken::new())
            .unwrap();
        assert_eq!(first.action, Action::Delete);
        assert!(first.state.is_none());

        let second = reconciler
            .reconcile(Some(&prior), None, &CancelToken::new())
            .unwrap();
        assert!(second.state.is_none());
        assert_eq!(remote.calls(), vec!["delete widget 1", "delete widget 1"]);
    }

    #[test]
    fn test_delete_without_prior_is_noop() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);

        let uncreated = plan_widget(&registry, None, &widget_config("x"));
        let result = reconciler
            .reconcile(Some(&uncreated), None, &CancelToken::new())
            .unwrap();
        assert_eq!(result.action, Action::Noop);
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_create_fails_closed_on_conflict_and_server_error() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);
        let planned = plan_widget(&registry, None, &widget_config("x"));

        remote.fail_next(RemoteError::Conflict {
            message: "name taken".into(),
        });
        let err = reconciler
            .reconcile(None, Some(&planned), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::RemoteConflict { .. }));

        remote.fail_next(RemoteError::Server {
            message: "boom".into(),
        });
        let err = reconciler
            .reconcile(None, Some(&planned), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::RemoteServerError { .. }));
        assert!(remote.stored("1").is_none());
    }

    #[test]
    fn test_invalid_plan_never_reaches_remote() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);

        let bad = ResourceState::new(
            "widget",
            Attributes::from([("name".to_string(), AttributeValue::from(1_i64))]),
        );
        assert!(reconciler
            .reconcile(None, Some(&bad), &CancelToken::new())
            .is_err());

        let unknown_kind = ResourceState::new("gadget", Attributes::new());
        let err = reconciler
            .reconcile(None, Some(&unknown_kind), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownResourceKind { .. }));
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_cancelled_before_call_has_no_effect() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);
        let planned = plan_widget(&registry, None, &widget_config("x"));

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = reconciler.reconcile(None, Some(&planned), &cancel).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!err.is_fatal());
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_interrupted_call_is_inconsistent() {
        let registry = registry();
        let remote = MockRemote::new();
        remote.insert("1", json!({"name": "x", "ttl": "24h", "tags": []}));
        let reconciler = Reconciler::new(&registry, &remote);
        let prior = plan_widget(&registry, None, &widget_config("x")).with_id("1");

        remote.fail_next(RemoteError::Interrupted {
            message: "connection reset".into(),
        });
        let err = reconciler
            .reconcile(Some(&prior), None, &CancelToken::new())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, Error::InconsistentState { id: Some(ref id), .. } if id == "1"));
    }

    #[test]
    fn test_unreadable_response_is_inconsistent() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);
        let planned = plan_widget(&registry, None, &widget_config("x"));

        remote.respond_with(json!({"name": "x", "colour": "blue"}));
        let err = reconciler
            .reconcile(None, Some(&planned), &CancelToken::new())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("widget 1"));
    }

    #[test]
    fn test_missing_response_value_becomes_null_with_warning() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);
        let planned = plan_widget(&registry, None, &widget_config("x"));

        remote.respond_with(json!({"name": "x", "tags": ["a"]}));
        let result = reconciler
            .reconcile(None, Some(&planned), &CancelToken::new())
            .unwrap();
        let state = result.state.unwrap();
        assert_eq!(state.attributes["ttl"], AttributeValue::Null);
        assert_eq!(state.attributes["tags"], AttributeValue::List(vec!["a".into()]));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].path.to_string(), "ttl");
    }

    #[test]
    fn test_merge_nested_unknowns() {
        let planned = Attributes::from([(
            "listener".to_string(),
            AttributeValue::object([
                ("address", AttributeValue::Unknown),
                ("tls", AttributeValue::from(true)),
            ]),
        )]);
        let response = Attributes::from([(
            "listener".to_string(),
            AttributeValue::object([
                ("address", AttributeValue::from("127.0.0.1:8200")),
                ("tls", AttributeValue::from(false)),
            ]),
        )]);

        let mut diagnostics = Vec::new();
        let merged = merge_attributes(&planned, &response, &AttributePath::root(), &mut diagnostics);
        let listener = merged["listener"].as_object().unwrap();
        assert_eq!(listener["address"], AttributeValue::from("127.0.0.1:8200"));
        assert_eq!(listener["tls"], AttributeValue::from(true));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_scenario_create_then_update_then_delete() {
        let registry = registry();
        let remote = MockRemote::new();
        let reconciler = Reconciler::new(&registry, &remote);
        let cancel = CancelToken::new();

        // Create: ttl unknown until the remote fills it
        let planned = plan_widget(&registry, None, &widget_config("x"));
        let created = reconciler
            .reconcile(None, Some(&planned), &cancel)
            .unwrap()
            .state
            .unwrap();
        assert_eq!(created.attributes["ttl"], AttributeValue::from("24h"));

        // Update: ttl carried forward, not re-marked unknown
        let planned = plan_widget(&registry, Some(&created), &widget_config("y"));
        assert_eq!(planned.attributes["ttl"], AttributeValue::from("24h"));
        let updated = reconciler
            .reconcile(Some(&created), Some(&planned), &cancel)
            .unwrap()
            .state
            .unwrap();
        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.attributes["name"], AttributeValue::from("y"));

        // Delete twice
        let deleted = reconciler.reconcile(Some(&updated), None, &cancel).unwrap();
        assert!(deleted.state.is_none());
        let again = reconciler.reconcile(Some(&updated), None, &cancel).unwrap();
        assert!(again.state.is_none());
    }
}
