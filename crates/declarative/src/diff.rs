//! Attribute-level diffs between recorded and planned states

use crate::planner::ResourceChange;
use crate::reconciler::Action;
use crate::types::{ResourceAddress, ResourceState};
use crate::value::{AttributePath, AttributeValue, Attributes};
use std::collections::BTreeMap;

/// One attribute whose value changes
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub path: AttributePath,
    /// Recorded value; `Null` when absent
    pub before: AttributeValue,
    /// Planned value; `Unknown` when the remote decides
    pub after: AttributeValue,
}

impl AttributeChange {
    /// Whether the planned value is only known after apply
    pub fn is_deferred(&self) -> bool {
        self.after.contains_unknown()
    }
}

/// A diff between the recorded and planned state of a resource
#[derive(Debug, Clone)]
pub struct ResourceDiff {
    pub address: ResourceAddress,
    pub kind: String,
    pub action: Action,
    pub changes: Vec<AttributeChange>,
}

impl ResourceDiff {
    /// Create a diff from a planned change, returning None if nothing changes
    pub fn from_change(change: &ResourceChange) -> Option<Self> {
        if change.is_noop() {
            return None;
        }

        Some(Self {
            address: change.address.clone(),
            kind: change.address.kind.clone(),
            action: change.action(),
            changes: diff_states(change.prior.as_ref(), change.planned.as_ref()),
        })
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        self.action == Action::Create
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        self.action == Action::Delete
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        self.action == Action::Update
    }
}

/// Changed attributes between two states; an absent state has no attributes.
pub fn diff_states(
    prior: Option<&ResourceState>,
    planned: Option<&ResourceState>,
) -> Vec<AttributeChange> {
    let empty = Attributes::new();
    let before = prior.map_or(&empty, |s| &s.attributes);
    let after = planned.map_or(&empty, |s| &s.attributes);

    let mut changes = Vec::new();
    diff_attributes(before, after, &AttributePath::root(), &mut changes);
    changes
}

/// Collect the changed leaves between two attribute maps.
///
/// Nested objects are walked; lists are compared whole. Null on both
/// sides is not a change.
pub fn diff_attributes(
    before: &Attributes,
    after: &Attributes,
    path: &AttributePath,
    changes: &mut Vec<AttributeChange>,
) {
    let mut names: Vec<&String> = before.keys().chain(after.keys()).collect();
    names.sort();
    names.dedup();

    for name in names {
        let old = before.get(name).unwrap_or(&AttributeValue::Null);
        let new = after.get(name).unwrap_or(&AttributeValue::Null);
        let child = path.child(name);

        match (old, new) {
            (AttributeValue::Object(old), AttributeValue::Object(new)) => {
                diff_attributes(old, new, &child, changes);
            }
            (AttributeValue::Object(old), AttributeValue::Null) => {
                diff_attributes(old, &Attributes::new(), &child, changes);
            }
            (AttributeValue::Null, AttributeValue::Object(new)) => {
                diff_attributes(&Attributes::new(), new, &child, changes);
            }
            (old, new) if old.same_as(new) => {}
            (old, new) => changes.push(AttributeChange {
                path: child,
                before: old.clone(),
                after: new.clone(),
            }),
        }
    }
}

/// Compute diffs for a set of planned changes
///
/// Returns only resources that need a remote call.
pub fn compute_diffs(changes: &[ResourceChange]) -> Vec<ResourceDiff> {
    changes.iter().filter_map(ResourceDiff::from_change).collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to create
    pub additions: usize,
    /// Number of resources to delete
    pub removals: usize,
    /// Number of resources to update
    pub modifications: usize,
    /// Number of attribute values known only after apply
    pub deferred: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.additions += 1,
                Action::Delete => summary.removals += 1,
                Action::Update => summary.modifications += 1,
                Action::Noop => {}
            }
            summary.deferred += diff.changes.iter().filter(|c| c.is_deferred()).count();
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource kind
pub fn group_by_kind(diffs: &[ResourceDiff]) -> BTreeMap<String, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<String, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.kind.clone()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(attrs: &[(&str, AttributeValue)], id: Option<&str>) -> ResourceState {
        let attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        let state = ResourceState::new("vault_cluster", attributes);
        match id {
            Some(id) => state.with_id(id),
            None => state,
        }
    }

    fn change(
        name: &str,
        prior: Option<ResourceState>,
        planned: Option<ResourceState>,
    ) -> ResourceChange {
        ResourceChange {
            address: ResourceAddress::new("vault_cluster", name),
            prior,
            planned,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_diff_nested_attributes() {
        let before = state(
            &[
                ("name", "a".into()),
                (
                    "listener",
                    AttributeValue::object([("address", AttributeValue::from("x")), ("tls", AttributeValue::from("on"))]),
                ),
            ],
            None,
        );
        let after = state(
            &[
                ("name", "a".into()),
                (
                    "listener",
                    AttributeValue::object([("address", AttributeValue::from("y")), ("tls", AttributeValue::from("on"))]),
                ),
                ("ttl", AttributeValue::Unknown),
            ],
            None,
        );

        let mut changes = Vec::new();
        diff_attributes(
            &before.attributes,
            &after.attributes,
            &AttributePath::root(),
            &mut changes,
        );

        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path.to_string(), "listener.address");
        assert_eq!(changes[1].path.to_string(), "ttl");
        assert!(changes[1].is_deferred());
    }

    #[test]
    fn test_unknown_on_both_sides_is_not_a_change() {
        let before = state(&[("ttl", AttributeValue::Unknown)], None);
        let after = before.clone();
        let mut changes = Vec::new();
        diff_attributes(
            &before.attributes,
            &after.attributes,
            &AttributePath::root(),
            &mut changes,
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn test_compute_diffs_and_summary() {
        let recorded = state(&[("name", "a".into())], Some("1"));
        let changes = vec![
            change("new", None, Some(state(&[("name", "n".into())], None))),
            change("same", Some(recorded.clone()), Some(recorded.clone())),
            change(
                "renamed",
                Some(recorded.clone()),
                Some(state(&[("name", "b".into())], Some("1"))),
            ),
            change("gone", Some(recorded), None),
        ];

        let diffs = compute_diffs(&changes);
        assert_eq!(diffs.len(), 3);
        assert!(diffs[0].is_addition());
        assert!(diffs[1].is_modification());
        assert!(diffs[2].is_removal());
        assert_eq!(diffs[2].changes[0].after, AttributeValue::Null);

        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.modifications, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.total(), 3);

        let groups = group_by_kind(&diffs);
        assert_eq!(groups["vault_cluster"].len(), 3);
    }
}
