//! Plan display

use colored::Colorize;
use declarative::{Action, AttributeChange, AttributeValue, DiffSummary, ResourceDiff, group_by_kind};

use crate::ui;

/// Widest rendered value shown on one line
const MAX_VALUE_WIDTH: usize = 48;

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (kind, kind_diffs) in group_by_kind(diffs) {
        println!("│ {}", kind_title(&kind).bold());

        for diff in kind_diffs {
            let symbol = match diff.action {
                Action::Create => "+".green(),
                Action::Delete => "-".red(),
                Action::Update => "~".yellow(),
                Action::Noop => "?".dimmed(),
            };
            let verb = match diff.action {
                Action::Create => "(will create)",
                Action::Delete => "(will delete)",
                Action::Update => "(will update)",
                Action::Noop => "",
            };
            println!("│   {} {:<30} {}", symbol, diff.address, verb.dimmed());

            // Deleted resources list no attributes
            if diff.action == Action::Delete {
                continue;
            }
            for change in &diff.changes {
                println!("│       {}", describe_change(change));
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to update, {} to delete",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    if summary.deferred > 0 {
        println!(
            "│          {} values known after apply",
            summary.deferred.to_string().dimmed()
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Render one attribute change as `path: before → after`
pub fn describe_change(change: &AttributeChange) -> String {
    match (&change.before, &change.after) {
        (AttributeValue::Null, after) => format!("{} = {}", change.path, render(after)),
        (before, AttributeValue::Null) => format!("{}: {} → null", change.path, render(before)),
        (before, after) => format!("{}: {} → {}", change.path, render(before), render(after)),
    }
}

fn render(value: &AttributeValue) -> String {
    ui::truncate(&value.to_string(), MAX_VALUE_WIDTH)
}

fn kind_title(kind: &str) -> &str {
    match kind {
        "vault_cluster" => "Vault clusters",
        "consul_cluster" => "Consul clusters",
        "nomad_cluster" => "Nomad clusters",
        "terraform_workspace" => "Terraform workspaces",
        "access_policy" => "Access policies",
        "ip" => "Static IPs",
        _ => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::AttributePath;

    fn change(path: &str, before: AttributeValue, after: AttributeValue) -> AttributeChange {
        AttributeChange {
            path: AttributePath::attribute(path),
            before,
            after,
        }
    }

    #[test]
    fn test_describe_new_value() {
        let c = change("region", AttributeValue::Null, AttributeValue::from("us-va-1"));
        assert_eq!(describe_change(&c), "region = \"us-va-1\"");
    }

    #[test]
    fn test_describe_modified_value() {
        let c = change(
            "region",
            AttributeValue::from("us-va-1"),
            AttributeValue::from("us-va-2"),
        );
        assert_eq!(describe_change(&c), "region: \"us-va-1\" → \"us-va-2\"");
    }

    #[test]
    fn test_describe_deferred_value() {
        let c = change("max_lease_ttl", AttributeValue::Null, AttributeValue::Unknown);
        assert_eq!(describe_change(&c), "max_lease_ttl = (known after apply)");
    }

    #[test]
    fn test_describe_removed_value() {
        let c = change("bind_addr", AttributeValue::from("0.0.0.0"), AttributeValue::Null);
        assert_eq!(describe_change(&c), "bind_addr: \"0.0.0.0\" → null");
    }

    #[test]
    fn test_kind_title_falls_back_to_kind() {
        assert_eq!(kind_title("vault_cluster"), "Vault clusters");
        assert_eq!(kind_title("gadget"), "gadget");
    }
}
