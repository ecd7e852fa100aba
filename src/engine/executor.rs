//! Execution with terminal progress and confirmation

use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteSummary, ExecutionOutcome, ProgressCallback,
    ResourceAddress,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over the resources being reconciled
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(count as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message("Applying");
        self.bar = Some(pb);
    }

    fn on_resource_start(&mut self, address: &ResourceAddress, description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{description} {address}"));
        }
    }

    fn on_resource_complete(&mut self, address: &ResourceAddress, result: &ApplyResult) {
        if let Some(pb) = &self.bar {
            pb.set_message(format!("{} {}", result_symbol(result), address));
            pb.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::NoChange => "○",
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Confirm with the user on the terminal
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> declarative::Result<bool> {
        use dialoguer::Confirm;

        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| declarative::Error::Other(format!("Confirmation failed: {e}")))
    }
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Changes applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Changes applied with errors", "⚠".yellow().bold());
    }

    for line in summary_lines(summary) {
        println!("    • {line}");
    }
}

fn summary_lines(summary: &ExecuteSummary) -> Vec<String> {
    let counts = [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.removed, "deleted"),
        (summary.skipped, "skipped"),
        (summary.failed, "failed"),
    ];
    counts
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, verb)| format!("{count} resources {verb}"))
        .collect()
}

/// Print failures and warnings collected during execution
pub fn print_problems(outcome: &ExecutionOutcome) {
    for (address, diagnostic) in &outcome.diagnostics {
        println!("  {} {}: {}", "⚠".yellow(), address, diagnostic);
    }

    for (address, error) in &outcome.failures {
        let category = error.category();
        eprintln!("  {} {}: {}", "✗".red(), address.to_string().bold(), error);
        eprintln!("      {}", category.advice().dimmed());
    }

    let inconsistent: Vec<_> = outcome.inconsistent().collect();
    if !inconsistent.is_empty() {
        eprintln!();
        eprintln!(
            "  {} {} resource(s) may no longer match recorded state:",
            "✗".red().bold(),
            inconsistent.len()
        );
        for (address, _) in inconsistent {
            eprintln!("      {address}");
        }
    }
}
