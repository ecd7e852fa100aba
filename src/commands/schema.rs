//! Describe registered resource kinds

use anyhow::Result;
use colored::Colorize;
use declarative::{BlockShape, Nesting, ResourceSchema};

use crate::ui;

pub fn run(kind: Option<&str>) -> Result<()> {
    let registry = cloudkit::registry()?;

    let Some(kind) = kind else {
        ui::header("Resource Kinds");
        for kind in registry.kinds() {
            println!("  {:<22} {}", kind.name().bold(), kind.description().dimmed());
        }
        return Ok(());
    };

    let resource_kind = registry.kind(kind)?;
    ui::header(resource_kind.name());
    ui::dim(resource_kind.description());
    println!();
    for line in schema_lines(resource_kind.schema(), 0) {
        println!("  {line}");
    }
    Ok(())
}

/// One line per attribute and block, blocks followed by their contents.
fn schema_lines(schema: &ResourceSchema, depth: usize) -> Vec<String> {
    let indent = "  ".repeat(depth);
    let mut lines = Vec::new();

    for attr in &schema.attributes {
        let mut line = format!("{indent}{} ({}, {})", attr.name, attr.value_type, attr.role);
        if let Some(allowed) = &attr.allowed {
            line.push_str(&format!(" one of: {}", allowed.join(", ")));
        }
        lines.push(line);
    }

    for block in &schema.blocks {
        let nesting = match block.nesting {
            Nesting::Single => "block",
            Nesting::List => "list block",
        };
        match &block.shape {
            BlockShape::Fixed(inner) => {
                lines.push(format!("{indent}{} ({nesting}, {})", block.name, block.role));
                lines.extend(schema_lines(inner, depth + 1));
            }
            BlockShape::Selected {
                discriminator,
                variants,
            } => {
                lines.push(format!(
                    "{indent}{} ({nesting}, {}, selected by {discriminator})",
                    block.name, block.role
                ));
                for (tag, inner) in variants {
                    lines.push(format!("{indent}  when {discriminator} = {tag}:"));
                    lines.extend(schema_lines(inner, depth + 2));
                }
            }
        }
    }

    lines
}
