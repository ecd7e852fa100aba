//! Plan construction from configuration and recorded state

use anyhow::{Result, bail};
use declarative::{
    CancelToken, ExecutionPlan, Importer, Remote, ResourceAddress, SchemaRegistry, plan_change,
};
use std::collections::BTreeSet;

use crate::config::DesiredConfig;
use crate::state::StateFile;

/// Plan every address in configuration or state.
///
/// Addresses only in state are planned for deletion. Planning problems
/// from all resources are reported together.
pub fn build_plan(
    registry: &SchemaRegistry,
    config: &DesiredConfig,
    state: &StateFile,
    targets: &[String],
) -> Result<ExecutionPlan> {
    let mut addresses: BTreeSet<ResourceAddress> = config.addresses().cloned().collect();
    addresses.extend(state.addresses()?);

    plan_addresses(registry, addresses, |address| config.get(address), state, targets)
}

/// Plan the deletion of every recorded address.
pub fn build_destroy_plan(
    registry: &SchemaRegistry,
    state: &StateFile,
    targets: &[String],
) -> Result<ExecutionPlan> {
    plan_addresses(registry, state.addresses()?, |_| None, state, targets)
}

fn plan_addresses<'c>(
    registry: &SchemaRegistry,
    addresses: impl IntoIterator<Item = ResourceAddress>,
    desired: impl Fn(&ResourceAddress) -> Option<&'c declarative::Attributes>,
    state: &StateFile,
    targets: &[String],
) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();
    let mut problems = Vec::new();

    for address in addresses {
        match plan_change(registry, &address, state.get(&address), desired(&address)) {
            Ok(change) => plan.push(change),
            Err(e) => problems.extend(e.causes().iter().map(|cause| format!("{address}: {cause}"))),
        }
    }

    if !problems.is_empty() {
        bail!(
            "Planning failed with {} error(s):\n  - {}",
            problems.len(),
            problems.join("\n  - ")
        );
    }

    Ok(plan.filter_by_targets(targets))
}

/// Re-read every recorded resource from the remote.
///
/// Resources the remote no longer has are dropped from state. Returns
/// the addresses whose recorded state changed.
pub fn refresh_state<R: Remote + ?Sized>(
    registry: &SchemaRegistry,
    remote: &R,
    state: &mut StateFile,
    cancel: &CancelToken,
) -> Result<Vec<ResourceAddress>> {
    let importer = Importer::new(registry, remote);
    let mut changed = Vec::new();

    for address in state.addresses()? {
        let Some(recorded) = state.get(&address) else {
            continue;
        };
        let refreshed = importer.refresh(recorded, cancel)?;

        if !refreshed.as_ref().is_some_and(|r| r.same_as(recorded)) {
            log::info!("Refreshed {address}");
            changed.push(address.clone());
            state.set(&address, refreshed);
        }
    }

    Ok(changed)
}
