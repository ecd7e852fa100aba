//! Declarative commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make the remote match the desired configuration
//! - `destroy` - Delete recorded resources

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    AutoConfirm, CancelToken, ExecuteOptions, ExecutionOutcome, ExecutionPlan, Remote,
    SchemaRegistry, compute_diffs, execute,
};
use std::path::Path;
use std::time::Duration;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, PlanArgs};
use crate::config::DesiredConfig;
use crate::engine::{self, BarProgress, PromptConfirm};
use crate::state::StateFile;
use crate::ui;

// ============================================================================
// Plan Command
// ============================================================================

pub fn plan(ctx: &Context, args: &PlanArgs) -> Result<()> {
    ui::header("Converge Plan");

    let registry = cloudkit::registry()?;
    let remote = ctx.open_remote()?;
    let state_path = ctx.state_path()?;
    let mut state = StateFile::load(&state_path)?;
    let config = DesiredConfig::load(&ctx.config_path()?)?;

    if args.refresh {
        refresh(&registry, &remote, &mut state, &state_path, &CancelToken::new())?;
    }

    let plan = engine::build_plan(&registry, &config, &state, &args.target)?;
    show_plan(&plan);
    Ok(())
}

// ============================================================================
// Apply Command
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Converge Apply");

    let registry = cloudkit::registry()?;
    let remote = ctx.open_remote()?;
    let state_path = ctx.state_path()?;
    let mut state = StateFile::load(&state_path)?;
    let config = DesiredConfig::load(&ctx.config_path()?)?;

    let mut cancel = CancelToken::new();
    if let Some(secs) = args.timeout {
        cancel = cancel.with_timeout(Duration::from_secs(secs));
    }

    if args.refresh {
        refresh(&registry, &remote, &mut state, &state_path, &cancel)?;
    }

    let plan = engine::build_plan(&registry, &config, &state, &args.target)?;
    if !show_plan(&plan) {
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: usize::from(args.jobs),
    };
    run(ctx, &plan, &registry, &remote, &opts, args.yes, &cancel, &mut state, &state_path)
}

// ============================================================================
// Destroy Command
// ============================================================================

pub fn destroy(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    ui::header("Converge Destroy");

    let registry = cloudkit::registry()?;
    let remote = ctx.open_remote()?;
    let state_path = ctx.state_path()?;
    let mut state = StateFile::load(&state_path)?;

    if state.resources.is_empty() {
        ui::info("No recorded resources");
        return Ok(());
    }

    let plan = engine::build_destroy_plan(&registry, &state, &args.target)?;
    if !show_plan(&plan) {
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: false,
        jobs: usize::from(args.jobs),
    };
    run(
        ctx,
        &plan,
        &registry,
        &remote,
        &opts,
        args.yes,
        &CancelToken::new(),
        &mut state,
        &state_path,
    )
}

// ============================================================================
// Shared
// ============================================================================

fn refresh<R: Remote + ?Sized>(
    registry: &SchemaRegistry,
    remote: &R,
    state: &mut StateFile,
    state_path: &Path,
    cancel: &CancelToken,
) -> Result<()> {
    let changed = engine::refresh_state(registry, remote, state, cancel)?;
    if changed.is_empty() {
        ui::dim("Recorded state is up to date");
        return Ok(());
    }

    for address in &changed {
        match state.get(address) {
            Some(_) => ui::info(&format!("Refreshed {address}")),
            None => ui::warn(&format!("{address} no longer exists remotely")),
        }
    }
    state.save(state_path)
}

/// Print planning warnings and the diff; returns whether anything changes.
fn show_plan(plan: &ExecutionPlan) -> bool {
    for change in &plan.changes {
        for diagnostic in &change.diagnostics {
            ui::warn(&format!("{}: {}", change.address, diagnostic));
        }
    }

    let diffs = compute_diffs(&plan.changes);
    engine::display_diff(&diffs);
    !diffs.is_empty()
}

/// Execute a plan and record the outcome, including partial progress.
#[allow(clippy::too_many_arguments)]
fn run<R: Remote + ?Sized>(
    ctx: &Context,
    plan: &ExecutionPlan,
    registry: &SchemaRegistry,
    remote: &R,
    opts: &ExecuteOptions,
    yes: bool,
    cancel: &CancelToken,
    state: &mut StateFile,
    state_path: &Path,
) -> Result<()> {
    let mut progress = BarProgress::new(ctx.quiet);
    let outcome = if yes {
        execute(plan, registry, remote, opts, cancel, &mut progress, &mut AutoConfirm)?
    } else {
        execute(plan, registry, remote, opts, cancel, &mut progress, &mut PromptConfirm)?
    };

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(());
    }

    if aborted(&outcome) {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    record(state, &outcome);
    state.save(state_path)?;

    engine::print_problems(&outcome);
    engine::print_summary(&outcome.summary);

    if !outcome.is_success() {
        bail!("{} resource(s) failed", outcome.failures.len());
    }
    Ok(())
}

/// Whether the operator declined before anything was attempted
fn aborted(outcome: &ExecutionOutcome) -> bool {
    outcome.summary.skipped > 0 && outcome.updates.is_empty() && outcome.failures.is_empty()
}

/// Apply reconciled states to the recorded state; failed resources keep
/// their prior record.
fn record(state: &mut StateFile, outcome: &ExecutionOutcome) {
    for (address, reconciled) in &outcome.updates {
        state.set(address, reconciled.clone());
    }
}
