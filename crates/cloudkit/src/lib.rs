//! # Cloudkit
//!
//! Managed cluster resource kinds for the declarative engine, plus an
//! in-process control plane that behaves like the hosted service.
//!
//! ## Kinds
//!
//! - `vault_cluster`, `consul_cluster`, `nomad_cluster`
//! - `terraform_workspace`
//! - `access_policy`, whose `policy_data` block is selected by `type`
//! - `ip`, a static address chosen by the control plane
//!
//! ## Example
//!
//! ```ignore
//! let registry = cloudkit::registry()?;
//! let remote = cloudkit::LocalControlPlane::open(&path)?;
//! let reconciler = declarative::Reconciler::new(&registry, &remote);
//! ```

pub mod control_plane;
pub mod defaults;
pub mod error;
pub mod kinds;
pub mod regions;

pub use control_plane::LocalControlPlane;
pub use error::{ControlPlaneError, Result};
pub use regions::{Products, Region};

use declarative::SchemaRegistry;

/// A registry holding every cloudkit kind.
pub fn registry() -> declarative::Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    kinds::register_all(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{
        AttributeValue, Attributes, CancelToken, Importer, Reconciler, ResourceAddress,
        ResourceState, plan_change,
    };

    fn named(name: &str) -> Attributes {
        Attributes::from([("name".to_string(), AttributeValue::from(name))])
    }

    fn plan_and_apply(
        registry: &SchemaRegistry,
        remote: &LocalControlPlane,
        address: &ResourceAddress,
        prior: Option<&ResourceState>,
        config: &Attributes,
    ) -> ResourceState {
        let change = plan_change(registry, address, prior, Some(config)).unwrap();
        Reconciler::new(registry, remote)
            .reconcile(prior, change.planned.as_ref(), &CancelToken::new())
            .unwrap()
            .state
            .unwrap()
    }

    #[test]
    fn test_registry_holds_every_kind() {
        let registry = registry().unwrap();
        let names: Vec<_> = registry.kinds().map(|kind| kind.name()).collect();
        assert_eq!(
            names,
            vec![
                "access_policy",
                "consul_cluster",
                "ip",
                "nomad_cluster",
                "terraform_workspace",
                "vault_cluster"
            ]
        );
    }

    #[test]
    fn test_consul_lifecycle_through_engine() {
        let registry = registry().unwrap();
        let remote = LocalControlPlane::in_memory();
        let address = ResourceAddress::new("consul_cluster", "c");

        let created = plan_and_apply(&registry, &remote, &address, None, &named("c1"));
        assert!(created.is_created());
        assert!(created.attributes["ports"].is_known());

        // Ports were filled by the remote; a rename must still plan and apply
        let renamed = plan_and_apply(&registry, &remote, &address, Some(&created), &named("c2"));
        assert_eq!(renamed.id(), created.id());
        assert_eq!(renamed.attributes["name"], AttributeValue::from("c2"));
        assert_eq!(remote.count("consul_cluster"), 1);
    }

    #[test]
    fn test_omitted_terraform_repo_is_stable() {
        let registry = registry().unwrap();
        let remote = LocalControlPlane::in_memory();
        let address = ResourceAddress::new("terraform_workspace", "ws");

        let created = plan_and_apply(&registry, &remote, &address, None, &named("ws"));
        let repo = created.attributes["vcs_repo"].as_object().unwrap();
        assert_eq!(repo["branch"], AttributeValue::from("main"));

        let replan = plan_change(&registry, &address, Some(&created), Some(&named("ws"))).unwrap();
        assert!(replan.is_noop());
    }

    #[test]
    fn test_omitted_nomad_advertise_is_stable() {
        let registry = registry().unwrap();
        let remote = LocalControlPlane::in_memory();
        let address = ResourceAddress::new("nomad_cluster", "n");
        let config = Attributes::from([
            ("name".to_string(), AttributeValue::from("n")),
            ("datacenter".to_string(), AttributeValue::from("dc1")),
        ]);

        let created = plan_and_apply(&registry, &remote, &address, None, &config);
        let advertise = created.attributes["advertise"].as_object().unwrap();
        assert!(advertise.values().all(AttributeValue::is_null));

        let replan = plan_change(&registry, &address, Some(&created), Some(&config)).unwrap();
        assert!(replan.is_noop());
    }

    #[test]
    fn test_ip_lifecycle() {
        let registry = registry().unwrap();
        let remote = LocalControlPlane::in_memory();
        let address = ResourceAddress::new("ip", "edge");

        let created = plan_and_apply(&registry, &remote, &address, None, &Attributes::new());
        assert!(created.is_created());
        assert_eq!(created.attributes["ip"], AttributeValue::from("1.2.3.4"));

        let replan = plan_change(&registry, &address, Some(&created), Some(&Attributes::new()))
            .unwrap();
        assert!(replan.is_noop());

        let refreshed = Importer::new(&registry, &remote)
            .refresh(&created, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert!(refreshed.same_as(&created));
    }
}
