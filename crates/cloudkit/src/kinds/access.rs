//! Access policies
//!
//! The contents of `policy_data` depend on `type`: each product has its
//! own permission set, keyed to the cluster or workspace it grants on.

use declarative::{AttributeSpec, BlockSpec, ResourceKind, ResourceSchema, Role, ValueType};

/// Products an access policy can grant on.
pub const POLICY_TYPES: &[&str] = &["consul", "nomad", "terraform", "vault"];

/// A managed access policy.
pub struct AccessPolicy {
    schema: ResourceSchema,
}

impl AccessPolicy {
    pub const NAME: &'static str = "access_policy";

    pub fn new() -> Self {
        let terraform = ResourceSchema::new()
            .attribute(AttributeSpec::required("workspace_id", ValueType::String).native("id"))
            .attribute(AttributeSpec::optional("plan", ValueType::Bool))
            .attribute(AttributeSpec::optional("apply", ValueType::Bool))
            .attribute(AttributeSpec::optional("override_policies", ValueType::Bool));

        let key_value = ResourceSchema::new()
            .attribute(AttributeSpec::required("cluster_id", ValueType::String).native("id"))
            .attribute(AttributeSpec::optional("key", ValueType::String))
            .attribute(AttributeSpec::optional("read", ValueType::Bool))
            .attribute(AttributeSpec::optional("write", ValueType::Bool))
            .attribute(AttributeSpec::optional("delete", ValueType::Bool));

        let nomad = ResourceSchema::new()
            .attribute(AttributeSpec::required("cluster_id", ValueType::String).native("id"))
            .attribute(AttributeSpec::optional("submit_jobs", ValueType::Bool))
            .attribute(AttributeSpec::optional("read_job_status", ValueType::Bool))
            .attribute(AttributeSpec::optional("cancel_jobs", ValueType::Bool));

        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("type", ValueType::String).allowed(POLICY_TYPES))
                .block(BlockSpec::selected(
                    "policy_data",
                    Role::Required,
                    "type",
                    [
                        ("consul", key_value.clone()),
                        ("nomad", nomad),
                        ("terraform", terraform),
                        ("vault", key_value),
                    ],
                )),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for AccessPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Access policy"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}
