//! Resource kinds managed through the control plane

pub mod access;
pub mod consul;
pub mod ip;
pub mod nomad;
pub mod terraform;
pub mod vault;

pub use access::AccessPolicy;
pub use consul::ConsulCluster;
pub use ip::StaticIp;
pub use nomad::NomadCluster;
pub use terraform::TerraformWorkspace;
pub use vault::VaultCluster;

use declarative::{Result, SchemaRegistry};

/// Register every kind into `registry`.
pub fn register_all(registry: &mut SchemaRegistry) -> Result<()> {
    registry.register(VaultCluster::new())?;
    registry.register(ConsulCluster::new())?;
    registry.register(NomadCluster::new())?;
    registry.register(TerraformWorkspace::new())?;
    registry.register(AccessPolicy::new())?;
    registry.register(StaticIp::new())?;
    Ok(())
}
