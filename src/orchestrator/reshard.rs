//! Slot resharding between two masters.

use tracing::{debug, info, instrument, warn};

use super::ClusterOrchestrator;
use crate::command::ClusterCommand;
use crate::error::{Error, Operation, Result};
use crate::exec::RemoteExecutor;
use crate::slots::{ReshardPlan, plan_reshard};
use crate::topology::ClusterMember;

impl ClusterOrchestrator {
    /// Move `requested` slots from `source` to `destination`.
    ///
    /// Plans with [`plan_reshard`] and runs one command per step, in order.
    /// The first failing step aborts the sequence; steps already executed are
    /// not rolled back, so the caller must re-read topology before deciding
    /// how to continue. Returns the executed plan, whose
    /// [`total_slots`](ReshardPlan::total_slots) may be below `requested`
    /// when the source owned fewer slots.
    ///
    /// Every step runs on `via`. `source` and `destination` only supply their
    /// address and node ID, so members straight from
    /// [`fetch_topology`](Self::fetch_topology) need no instance name.
    #[instrument(
        skip(self, exec, via, source, destination),
        fields(via = %via.name, from = %source.address, to = %destination.address)
    )]
    pub async fn reshard<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        source: &ClusterMember,
        destination: &ClusterMember,
        requested: i64,
    ) -> Result<ReshardPlan> {
        info!(
            "Resharding {} slots from {:?} to {:?}...",
            requested, source.address, destination.address
        );

        let plan = plan_reshard(source, destination, requested);
        if plan.is_short() {
            warn!(
                requested,
                available = source.slot_count(),
                "Source owns fewer slots than requested, moving all of them"
            );
        }

        let total_steps = plan.steps.len();
        for (index, step) in plan.steps.iter().enumerate() {
            debug!(
                step = index + 1,
                of = total_steps,
                range = %step.range,
                "Migrating slot range"
            );

            let tokens = self.cli.build(&ClusterCommand::Reshard { step });
            exec.execute(via, &tokens, None).await.map_err(|e| {
                Error::failed(
                    Operation::Reshard,
                    format!(
                        "failed to reshard {} slots from {:?} to {:?} (step {}/{}, slots {})",
                        requested,
                        source.address,
                        destination.address,
                        index + 1,
                        total_steps,
                        step.range
                    ),
                    e,
                )
            })?;
        }

        info!(
            slots_moved = plan.total_slots(),
            steps = total_steps,
            "Reshard complete"
        );
        Ok(plan)
    }
}
