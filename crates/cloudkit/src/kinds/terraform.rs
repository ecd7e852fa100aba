//! Terraform workspaces

use declarative::{
    AttributeSpec, BlockSpec, Nesting, ResourceKind, ResourceSchema, Role, ValueType,
};

/// A managed Terraform workspace.
pub struct TerraformWorkspace {
    schema: ResourceSchema,
}

impl TerraformWorkspace {
    pub const NAME: &'static str = "terraform_workspace";

    pub fn new() -> Self {
        let vcs_repo = ResourceSchema::new()
            .attribute(AttributeSpec::optional("oauth_token_id", ValueType::String).native("oauthTokenID"))
            .attribute(AttributeSpec::optional_computed("branch", ValueType::String))
            .attribute(AttributeSpec::optional("ingress_submodules", ValueType::Bool))
            .attribute(AttributeSpec::optional("identifier", ValueType::String));

        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("name", ValueType::String))
                .attribute(
                    AttributeSpec::optional("agent_pool_id", ValueType::String).native("agentPoolID"),
                )
                .attribute(AttributeSpec::optional_computed("allow_destroy_plan", ValueType::Bool))
                .attribute(AttributeSpec::optional("auto_apply", ValueType::Bool))
                .attribute(AttributeSpec::optional("description", ValueType::String))
                .attribute(
                    AttributeSpec::optional_computed("execution_mode", ValueType::String)
                        .allowed(&["remote", "local", "agent"]),
                )
                .attribute(AttributeSpec::optional_computed(
                    "file_triggers_enabled",
                    ValueType::Bool,
                ))
                .attribute(AttributeSpec::optional("queue_all_runs", ValueType::Bool))
                .attribute(AttributeSpec::optional_computed("speculative_enabled", ValueType::Bool))
                .attribute(AttributeSpec::optional_computed("terraform_version", ValueType::String))
                .attribute(AttributeSpec::optional_computed(
                    "trigger_prefixes",
                    ValueType::list_of(ValueType::String),
                ))
                .attribute(AttributeSpec::optional_computed("working_directory", ValueType::String))
                .block(BlockSpec::new("vcs_repo", Nesting::Single, Role::OptionalComputed, vcs_repo)),
        }
    }
}

impl Default for TerraformWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for TerraformWorkspace {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Terraform workspace"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}
