//! Execution engine - refreshes, plans and applies instances in parallel
//!
//! Instances are independent: each one gets its own [`ApplyContext`] and runs
//! refresh → plan → apply as a short sequence of calls on the pool. Nothing is
//! retried; a failed call becomes [`ApplyResult::Failed`] for that instance and
//! the host re-runs on its next pass.

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::planner::{Instance, plan_action};
use crate::resource::{Lifecycle, ResourceData};
use crate::types::{Action, ApplyResult, Creation, ExecuteOptions, ExecuteSummary};
use anyhow::{Context, Result};
use rayon::prelude::*;

/// Final state of one instance after execution
#[derive(Debug, Clone)]
pub struct Outcome<M> {
    pub address: String,
    /// What the planner decided after refresh
    pub action: Action,
    pub result: ApplyResult,
    /// Whether refresh found the remote record gone
    pub drifted: bool,
    /// Instance record to persist; an empty id means absent
    pub data: ResourceData<M>,
}

/// Outcomes in input order plus their summary
#[derive(Debug, Clone)]
pub struct ExecuteReport<M> {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<Outcome<M>>,
}

/// Execute instances against a lifecycle implementation
///
/// # Arguments
/// * `resource` - Lifecycle implementation shared by every instance
/// * `instances` - Instances to reconcile
/// * `opts` - Execution options (dry_run, jobs)
/// * `ctx` - Base context; each instance gets a clone sharing its cancel flag
/// * `progress` - Progress callback
/// * `confirm` - Confirmation callback, asked once before mutating anything
pub fn execute<L, P, C>(
    resource: &L,
    instances: Vec<Instance<L::Model>>,
    opts: &ExecuteOptions,
    ctx: &ApplyContext,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport<L::Model>>
where
    L: Lifecycle,
    P: ProgressCallback,
    C: ConfirmCallback,
{
    if instances.is_empty() {
        return Ok(ExecuteReport {
            summary: ExecuteSummary::default(),
            outcomes: Vec::new(),
        });
    }

    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        let mut summary = ExecuteSummary::default();
        let outcomes = instances
            .into_iter()
            .map(|instance| {
                let result = ApplyResult::Skipped {
                    reason: "Declined".to_string(),
                };
                summary.add_result(&result);
                Outcome {
                    address: instance.address,
                    action: Action::NoChange,
                    result,
                    drifted: false,
                    data: instance.data,
                }
            })
            .collect();
        return Ok(ExecuteReport { summary, outcomes });
    }

    progress.on_batch_start(instances.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create apply thread pool")?;

    let instance_ctx = ApplyContext::with_cancel(opts.dry_run, ctx.cancel.clone());
    let outcomes: Vec<Outcome<L::Model>> = pool.install(|| {
        instances
            .into_par_iter()
            .map(|instance| reconcile_instance(resource, &instance_ctx, instance))
            .collect()
    });

    // Progress is reported after the parallel section; callbacks are not Sync.
    let mut summary = ExecuteSummary::default();
    for outcome in &outcomes {
        progress.on_resource_complete(&outcome.address, &outcome.result);
        summary.add_result(&outcome.result);
        if outcome.drifted {
            summary.drifted += 1;
        }
    }
    progress.on_batch_complete();

    Ok(ExecuteReport { summary, outcomes })
}

/// Refresh, plan and apply a single instance
fn reconcile_instance<L: Lifecycle>(
    resource: &L,
    ctx: &ApplyContext,
    instance: Instance<L::Model>,
) -> Outcome<L::Model> {
    let Instance {
        address,
        mut data,
        desired,
    } = instance;

    let outcome = |action, result, drifted, data| Outcome {
        address: address.clone(),
        action,
        result,
        drifted,
        data,
    };

    if ctx.is_cancelled() {
        return outcome(Action::NoChange, cancelled(), false, data);
    }

    let mut drifted = false;
    if !data.is_new() {
        if let Err(e) = resource.read(ctx, &mut data) {
            return outcome(Action::NoChange, failed(&e), false, data);
        }
        if data.is_new() {
            log::warn!("{}: remote record disappeared, will recreate", address);
            drifted = true;
        } else {
            data.commit();
        }
    }

    if let Some(desired) = &desired {
        let mut planned = data.planned().clone();
        resource.merge_config(&mut planned, desired);
        data.set_planned(planned);
    }

    let action = plan_action(resource, &data, desired.is_some());
    log::debug!("{}: planned {}", address, action);

    if action == Action::NoChange {
        return outcome(action, ApplyResult::NoChange, drifted, data);
    }

    if ctx.dry_run {
        let result = ApplyResult::Skipped {
            reason: format!("Dry run: would {}", action),
        };
        return outcome(action, result, drifted, data);
    }

    let applied = match action {
        Action::Create => resource.create(ctx, &mut data).map(Creation::result),
        Action::Update => resource.update(ctx, &mut data).map(|()| ApplyResult::Modified),
        Action::Delete => resource.delete(ctx, &mut data).map(|()| ApplyResult::Removed),
        Action::NoChange => Ok(ApplyResult::NoChange),
    };

    let result = match applied {
        Ok(result) => {
            data.commit();
            result
        }
        Err(e) => failed(&e),
    };

    outcome(action, result, drifted, data)
}

fn failed(error: &dyn std::error::Error) -> ApplyResult {
    ApplyResult::Failed {
        error: error.to_string(),
    }
}

fn cancelled() -> ApplyResult {
    ApplyResult::Skipped {
        reason: "Cancelled".to_string(),
    }
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple<L: Lifecycle>(
    resource: &L,
    instances: Vec<Instance<L::Model>>,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport<L::Model>> {
    use crate::context::{AutoConfirm, NoProgress};

    let ctx = ApplyContext::new(opts.dry_run);
    execute(
        resource,
        instances,
        opts,
        &ctx,
        &mut NoProgress,
        &mut AutoConfirm,
    )
}
