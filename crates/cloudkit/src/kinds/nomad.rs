//! Nomad clusters

use declarative::{
    AttributeSpec, BlockSpec, Nesting, ResourceKind, ResourceSchema, Role, ValueType,
};

/// A managed Nomad cluster.
pub struct NomadCluster {
    schema: ResourceSchema,
}

impl NomadCluster {
    pub const NAME: &'static str = "nomad_cluster";

    pub fn new() -> Self {
        let advertise = ResourceSchema::new()
            .attribute(AttributeSpec::optional("http", ValueType::String))
            .attribute(AttributeSpec::optional("rpc", ValueType::String))
            .attribute(AttributeSpec::optional("serf", ValueType::String));

        let ports = ResourceSchema::new()
            .attribute(AttributeSpec::optional_computed("http", ValueType::Number))
            .attribute(AttributeSpec::optional_computed("rpc", ValueType::Number))
            .attribute(AttributeSpec::optional_computed("serf", ValueType::Number));

        let server_join = ResourceSchema::new()
            .attribute(AttributeSpec::optional_computed(
                "retry_join",
                ValueType::list_of(ValueType::String),
            ))
            .attribute(AttributeSpec::optional_computed(
                "start_join",
                ValueType::list_of(ValueType::String),
            ))
            .attribute(AttributeSpec::optional("retry_max", ValueType::Number))
            .attribute(AttributeSpec::optional_computed("retry_interval", ValueType::String));

        let server = ResourceSchema::new().block(BlockSpec::new(
            "server_join",
            Nesting::Single,
            Role::OptionalComputed,
            server_join,
        ));

        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("name", ValueType::String))
                .attribute(AttributeSpec::required("datacenter", ValueType::String))
                .attribute(AttributeSpec::optional("bind_addr", ValueType::String))
                .block(BlockSpec::new(
                    "advertise",
                    Nesting::Single,
                    Role::OptionalComputed,
                    advertise,
                ))
                .block(BlockSpec::new(
                    "ports",
                    Nesting::Single,
                    Role::OptionalComputed,
                    ports,
                ))
                .block(BlockSpec::new(
                    "server",
                    Nesting::Single,
                    Role::OptionalComputed,
                    server,
                )),
        }
    }
}

impl Default for NomadCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for NomadCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Nomad cluster"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}
