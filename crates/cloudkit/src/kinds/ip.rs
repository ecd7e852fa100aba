//! Static IP reservations

use declarative::{AttributeSpec, ResourceKind, ResourceSchema, ValueType};

/// A reserved static IP. The address is always chosen by the control plane.
pub struct StaticIp {
    schema: ResourceSchema,
}

impl StaticIp {
    pub const NAME: &'static str = "ip";

    /// Address the control plane hands out
    pub const ADDRESS: &'static str = "1.2.3.4";

    pub fn new() -> Self {
        Self {
            schema: ResourceSchema::new().attribute(
                AttributeSpec::computed("ip", ValueType::String).describe("Reserved address"),
            ),
        }
    }
}

impl Default for StaticIp {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceKind for StaticIp {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Static IP address"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}
