//! Consul clusters

use declarative::{
    AttributeSpec, BlockSpec, Nesting, ResourceKind, ResourceSchema, Role, ValueType,
};

/// A managed Consul cluster.
pub struct ConsulCluster {
    schema: ResourceSchema,
}

impl ConsulCluster {
    pub const NAME: &'static str = "consul_cluster";

    pub fn new() -> Self {
        let addresses = ["dns", "http", "https", "grpc"]
            .into_iter()
            .fold(ResourceSchema::new(), |schema, name| {
                schema.attribute(AttributeSpec::optional_computed(name, ValueType::String))
            });

        let computed_ports = ["dns", "http", "https", "grpc", "serf_lan", "serf_wan", "server"];
        let required_ports = [
            "sidecar_min_port",
            "sidecar_max_port",
            "expose_min_port",
            "expose_max_port",
        ];
        let ports = computed_ports
            .into_iter()
            .map(|name| AttributeSpec::optional_computed(name, ValueType::Number))
            .chain(
                required_ports
                    .into_iter()
                    .map(|name| AttributeSpec::required(name, ValueType::Number)),
            )
            .fold(ResourceSchema::new(), ResourceSchema::attribute);

        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("name", ValueType::String))
                .attribute(AttributeSpec::optional("bind_addr", ValueType::String))
                .block(BlockSpec::new(
                    "addresses",
                    Nesting::Single,
                    Role::OptionalComputed,
                    addresses,
                ))
                .block(BlockSpec::new(
                    "ports",
                    Nesting::Single,
                    Role::OptionalComputed,
                    ports,
                )),
        }
    }
}

impl Default for ConsulCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for ConsulCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Consul cluster"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}
