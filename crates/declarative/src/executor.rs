//! Execution engine - reconciles planned changes with bounded parallelism
//!
//! Distinct resource instances are independent and reconciled in
//! parallel. A failed instance keeps its recorded state; the others
//! proceed.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::error::{Error, Result};
use crate::planner::{ExecutionPlan, ResourceChange};
use crate::reconciler::{Action, Reconciled, Reconciler};
use crate::registry::SchemaRegistry;
use crate::remote::{CancelToken, Remote};
use crate::types::{ApplyResult, Diagnostic, ExecuteOptions, ExecuteSummary, ResourceAddress, ResourceState};
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

/// What happened to every pending change of a plan.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub summary: ExecuteSummary,
    /// New state per reconciled address; `None` when the resource is gone
    pub updates: Vec<(ResourceAddress, Option<ResourceState>)>,
    pub failures: Vec<(ResourceAddress, Error)>,
    pub diagnostics: Vec<(ResourceAddress, Diagnostic)>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures after which the remote may no longer match recorded state
    pub fn inconsistent(&self) -> impl Iterator<Item = &(ResourceAddress, Error)> {
        self.failures.iter().filter(|(_, e)| e.is_fatal())
    }
}

type Applied = (ApplyResult, Result<Reconciled>);

/// Execute a plan with the given options and callbacks
///
/// No-op changes are skipped. Nothing is applied in a dry run or when
/// the confirmation is declined.
pub fn execute<R, P, C>(
    plan: &ExecutionPlan,
    registry: &SchemaRegistry,
    remote: &R,
    opts: &ExecuteOptions,
    cancel: &CancelToken,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecutionOutcome>
where
    R: Remote + ?Sized,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let pending: Vec<&ResourceChange> = plan.pending().collect();
    let mut outcome = ExecutionOutcome::default();
    outcome.summary.no_change = plan.total_resources() - pending.len();

    if pending.is_empty() || opts.dry_run {
        return Ok(outcome);
    }

    if !confirm.confirm("Apply changes?")? {
        outcome.summary.skipped = pending.len();
        return Ok(outcome);
    }

    let reconciler = Reconciler::new(registry, remote);

    progress.on_batch_start(pending.len());
    let applied = if opts.jobs <= 1 || pending.len() == 1 {
        execute_sequential(&pending, &reconciler, cancel, progress)
    } else {
        execute_parallel(&pending, &reconciler, opts.jobs, cancel, progress)?
    };
    progress.on_batch_complete();

    for (change, (result, reconciled)) in pending.iter().zip(applied) {
        outcome.summary.add_result(&result);
        let address = change.address.clone();
        match reconciled {
            Ok(reconciled) => {
                for diagnostic in reconciled.diagnostics {
                    outcome.diagnostics.push((address.clone(), diagnostic));
                }
                outcome.updates.push((address, reconciled.state));
            }
            Err(e) => {
                log::warn!("Failed to {} {address}: {e}", change.action());
                outcome.failures.push((address, e));
            }
        }
    }

    Ok(outcome)
}

fn execute_sequential<R, P>(
    pending: &[&ResourceChange],
    reconciler: &Reconciler<'_, R>,
    cancel: &CancelToken,
    progress: &mut P,
) -> Vec<Applied>
where
    R: Remote + ?Sized,
    P: ProgressCallback,
{
    let mut results = Vec::with_capacity(pending.len());
    for change in pending {
        progress.on_resource_start(&change.address, &change.action().to_string());
        let applied = apply_change(change, reconciler, cancel);
        progress.on_resource_complete(&change.address, &applied.0);
        results.push(applied);
    }
    results
}

/// Execute changes in parallel using rayon
fn execute_parallel<R, P>(
    pending: &[&ResourceChange],
    reconciler: &Reconciler<'_, R>,
    jobs: usize,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<Vec<Applied>>
where
    R: Remote + ?Sized,
    P: ProgressCallback,
{
    // The progress callback is not thread-safe; report after the batch.
    let results: Arc<Mutex<Vec<(usize, Applied)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(pending.len())));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::Other(format!("Failed to create thread pool: {e}")))?;

    pool.install(|| {
        pending.par_iter().enumerate().for_each(|(index, change)| {
            let applied = apply_change(change, reconciler, cancel);
            push_applied(&results, index, applied);
        });
    });

    let mut results = into_applied(results)?;
    results.sort_by_key(|(index, _)| *index);

    for (index, (result, _)) in &results {
        progress.on_resource_complete(&pending[*index].address, result);
    }

    Ok(results.into_iter().map(|(_, applied)| applied).collect())
}

fn push_applied(results: &Arc<Mutex<Vec<(usize, Applied)>>>, index: usize, applied: Applied) {
    match results.lock() {
        Ok(mut locked) => locked.push((index, applied)),
        Err(poisoned) => poisoned.into_inner().push((index, applied)),
    }
}

fn into_applied(results: Arc<Mutex<Vec<(usize, Applied)>>>) -> Result<Vec<(usize, Applied)>> {
    let mutex = Arc::try_unwrap(results).map_err(|_| {
        Error::Other("Failed to collect apply results: shared result state".to_string())
    })?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}

/// Reconcile a single change
fn apply_change<R: Remote + ?Sized>(
    change: &ResourceChange,
    reconciler: &Reconciler<'_, R>,
    cancel: &CancelToken,
) -> Applied {
    let reconciled = reconciler.reconcile(change.prior.as_ref(), change.planned.as_ref(), cancel);
    let result = match &reconciled {
        Ok(r) => match r.action {
            Action::Create => ApplyResult::Created,
            Action::Update => ApplyResult::Modified,
            Action::Delete => ApplyResult::Removed,
            Action::Noop => ApplyResult::NoChange,
        },
        Err(Error::Cancelled) => ApplyResult::Skipped {
            reason: "cancelled".to_string(),
        },
        Err(e) => ApplyResult::Failed {
            error: e.to_string(),
        },
    };
    (result, reconciled)
}
