//! Print recorded state

use anyhow::{Context as AnyhowContext, Result, bail};
use declarative::{AttributeValue, Attributes, ResourceAddress, ResourceState};

use crate::Context;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context, address: Option<&str>) -> Result<()> {
    let state_path = ctx.state_path()?;
    let state = StateFile::load(&state_path)?;

    match address {
        Some(address) => {
            let address: ResourceAddress = address
                .parse()
                .with_context(|| format!("Invalid address: {address}"))?;
            let Some(recorded) = state.get(&address) else {
                bail!("{address} is not recorded in {}", state_path.display());
            };
            show_resource(&address, recorded);
        }
        None => {
            if state.resources.is_empty() {
                ui::info("No recorded resources");
                return Ok(());
            }
            ui::kv("State", &state_path.display().to_string());
            ui::kv("Updated", &state.last_updated.to_rfc3339());
            for address in state.addresses()? {
                if let Some(recorded) = state.get(&address) {
                    show_resource(&address, recorded);
                }
            }
        }
    }

    Ok(())
}

fn show_resource(address: &ResourceAddress, recorded: &ResourceState) {
    ui::section(&address.to_string());
    ui::kv("id", recorded.id().unwrap_or("(not created)"));
    for line in attribute_lines(&recorded.attributes, 0) {
        println!("  {line}");
    }
}

/// Render attributes one per line, nesting objects by indentation.
/// Null attributes are left out.
fn attribute_lines(attributes: &Attributes, depth: usize) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();
    for (name, value) in attributes {
        match value {
            AttributeValue::Null => {}
            AttributeValue::Object(nested) => {
                lines.push(format!("{indent}{name} {{"));
                lines.extend(attribute_lines(nested, depth + 1));
                lines.push(format!("{indent}}}"));
            }
            other => lines.push(format!("{indent}{name} = {other}")),
        }
    }
    lines
}
