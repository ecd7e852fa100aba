//! Adopt an existing remote resource into recorded state

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{CancelToken, Importer, Remote, ResourceAddress, SchemaRegistry};

use crate::Context;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, address: &str, id: &str) -> Result<()> {
    let address: ResourceAddress = address
        .parse()
        .with_context(|| format!("Invalid address: {address}"))?;

    let registry = cloudkit::registry()?;
    let remote = ctx.open_remote()?;
    let state_path = ctx.state_path()?;
    let mut state = StateFile::load(&state_path)?;

    import(&registry, &remote, &mut state, &address, id)?;
    state.save(&state_path)?;

    ui::success(&format!("Imported {address} ({id})"));
    Ok(())
}

fn import<R: Remote + ?Sized>(
    registry: &SchemaRegistry,
    remote: &R,
    state: &mut StateFile,
    address: &ResourceAddress,
    id: &str,
) -> Result<()> {
    if let Some(existing) = state.get(address) {
        bail!(
            "{address} is already recorded{}; remove it from state before importing",
            existing
                .id()
                .map(|id| format!(" with id {id}"))
                .unwrap_or_default()
        );
    }

    let imported = Importer::new(registry, remote)
        .import(&address.kind, id, &CancelToken::new())
        .with_context(|| format!("Failed to import {address}"))?;

    state.set(address, Some(imported));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::AttributeValue;
    use serde_json::json;

    fn remote_with_vault() -> (cloudkit::LocalControlPlane, String) {
        let remote = cloudkit::LocalControlPlane::in_memory();
        let doc = match json!({"name": "legacy", "region": "us-va-2"}) {
            serde_json::Value::Object(doc) => doc,
            _ => unreachable!(),
        };
        let id = remote
            .create("vault_cluster", &doc, &CancelToken::new())
            .unwrap()
            .id;
        (remote, id)
    }

    #[test]
    fn test_import_records_state() {
        let registry = cloudkit::registry().unwrap();
        let (remote, id) = remote_with_vault();
        let mut state = StateFile::default();
        let address = ResourceAddress::new("vault_cluster", "legacy");

        import(&registry, &remote, &mut state, &address, &id).unwrap();

        let recorded = state.get(&address).unwrap();
        assert_eq!(recorded.id(), Some(id.as_str()));
        assert_eq!(recorded.attributes["region"], AttributeValue::from("us-va-2"));
        assert_eq!(recorded.attributes["max_lease_ttl"], AttributeValue::from("768h"));
    }

    #[test]
    fn test_import_refuses_existing_record() {
        let registry = cloudkit::registry().unwrap();
        let (remote, id) = remote_with_vault();
        let mut state = StateFile::default();
        let address = ResourceAddress::new("vault_cluster", "legacy");

        import(&registry, &remote, &mut state, &address, &id).unwrap();
        let err = import(&registry, &remote, &mut state, &address, &id).unwrap_err();
        assert!(err.to_string().contains("already recorded"));
    }

    #[test]
    fn test_import_missing_resource() {
        let registry = cloudkit::registry().unwrap();
        let remote = cloudkit::LocalControlPlane::in_memory();
        let mut state = StateFile::default();
        let address = ResourceAddress::new("vault_cluster", "ghost");

        assert!(import(&registry, &remote, &mut state, &address, "nope").is_err());
        assert!(state.resources.is_empty());
    }
}
