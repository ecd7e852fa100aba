//! Vault clusters

use declarative::{
    AttributeSpec, BlockSpec, Nesting, ResourceKind, ResourceSchema, Role, ValueType,
};

/// Regions a vault cluster can be planned into.
pub const VAULT_REGIONS: &[&str] = &["us-va-1", "us-va-2"];

/// A managed Vault cluster.
pub struct VaultCluster {
    schema: ResourceSchema,
}

impl VaultCluster {
    pub const NAME: &'static str = "vault_cluster";

    pub fn new() -> Self {
        let tcp_listener = ResourceSchema::new()
            .attribute(
                AttributeSpec::optional_computed("address", ValueType::String)
                    .describe("Address the API listens on"),
            )
            .attribute(
                AttributeSpec::optional_computed("cluster_address", ValueType::String)
                    .describe("Address for server-to-server traffic"),
            );

        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("name", ValueType::String))
                .attribute(
                    AttributeSpec::required("region", ValueType::String).allowed(VAULT_REGIONS),
                )
                .attribute(
                    AttributeSpec::optional_computed("default_lease_ttl", ValueType::String)
                        .native("defaultLeaseTTL"),
                )
                .attribute(
                    AttributeSpec::optional_computed("max_lease_ttl", ValueType::String)
                        .native("maxLeaseTTL"),
                )
                .block(BlockSpec::new(
                    "tcp_listener",
                    Nesting::Single,
                    Role::OptionalComputed,
                    tcp_listener,
                )),
        }
    }
}

impl Default for VaultCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for VaultCluster {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Vault cluster"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{AttributeValue, Attributes};
    use serde_json::json;

    #[test]
    fn test_encode_uses_native_names() {
        let kind = VaultCluster::new();
        let attrs = Attributes::from([
            ("name".to_string(), AttributeValue::from("primary")),
            ("region".to_string(), AttributeValue::from("us-va-1")),
            ("default_lease_ttl".to_string(), AttributeValue::from("1h")),
            ("max_lease_ttl".to_string(), AttributeValue::Unknown),
            ("tcp_listener".to_string(), AttributeValue::Unknown),
        ]);

        let doc = kind.encode(&attrs).unwrap();
        assert_eq!(
            serde_json::Value::Object(doc),
            json!({"name": "primary", "region": "us-va-1", "defaultLeaseTTL": "1h"})
        );
    }

    #[test]
    fn test_decode_full_document() {
        let kind = VaultCluster::new();
        let doc = json!({
            "name": "primary",
            "region": "us-va-2",
            "defaultLeaseTTL": "768h",
            "maxLeaseTTL": "768h",
            "tcpListener": {"address": "127.0.0.1:8200", "clusterAddress": "127.0.0.1:8201"},
        });
        let serde_json::Value::Object(doc) = doc else {
            unreachable!()
        };

        let attrs = kind.decode(&doc).unwrap();
        let listener = attrs["tcp_listener"].as_object().unwrap();
        assert_eq!(listener["cluster_address"], AttributeValue::from("127.0.0.1:8201"));
        assert_eq!(attrs["max_lease_ttl"], AttributeValue::from("768h"));
        kind.schema().validate_state(&attrs).unwrap();
    }
}
