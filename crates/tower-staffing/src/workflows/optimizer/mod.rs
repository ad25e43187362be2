//! Greedy, single-pass staffing of shop slots.
//!
//! The engine is a pure function of its inputs: residents and shops in
//! declaration order, the previous assignment table, and whether that table
//! should be kept. Identical inputs always yield identical tables and metrics.

mod metrics;
mod ranking;
pub mod report;
mod scarcity;

pub use metrics::AssignmentMetrics;
pub use report::{ShopStaffingView, StaffingReport, WorkerView};

use crate::workflows::roster::domain::{AssignmentTable, EntityId, Resident, Shop};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptimizerError {
    #[error("add at least one shop before running the optimizer")]
    EmptyShops,
    #[error("add at least one resident before running the optimizer")]
    EmptyResidents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizerOutcome {
    pub assignments: AssignmentTable,
    pub metrics: AssignmentMetrics,
}

pub fn run_optimizer(
    residents: &[Resident],
    shops: &[Shop],
    prior: &AssignmentTable,
    lock_existing: bool,
) -> Result<OptimizerOutcome, OptimizerError> {
    if shops.is_empty() {
        return Err(OptimizerError::EmptyShops);
    }
    if residents.is_empty() {
        return Err(OptimizerError::EmptyResidents);
    }

    let mut table = if lock_existing && !prior.is_empty() {
        seed_locked(residents, shops, prior)
    } else {
        AssignmentTable::new()
    };
    for shop in shops {
        table.sequence_mut(shop.id);
    }

    let mut assigned: HashSet<EntityId> = table
        .entries()
        .flat_map(|(_, sequence)| sequence.iter().copied())
        .collect();
    let seeded = assigned.len();

    for shop in scarcity::order_by_scarcity(shops, residents, &assigned) {
        let sequence = table.sequence_mut(shop.id);
        let need = (shop.capacity as usize).saturating_sub(sequence.len());
        if need == 0 {
            continue;
        }

        let chosen = ranking::rank_candidates(shop, shops, residents, &assigned);
        for resident in chosen.into_iter().take(need) {
            sequence.push(resident.id);
            assigned.insert(resident.id);
        }
        debug!(shop = %shop.name, filled = sequence.len(), capacity = shop.capacity, "shop staffed");
    }

    let metrics = AssignmentMetrics::compute(residents, shops, &table);
    info!(
        lock_existing,
        seeded,
        filled = metrics.filled_slots,
        total_slots = metrics.total_slots,
        efficiency = metrics.efficiency_pct,
        unplaced = metrics.unplaced,
        "optimizer run complete"
    );

    Ok(OptimizerOutcome {
        assignments: table,
        metrics,
    })
}

/// Carries prior sequences forward for shops that still exist, dropping residents
/// that are gone or already placed and truncating to the current capacity.
fn seed_locked(residents: &[Resident], shops: &[Shop], prior: &AssignmentTable) -> AssignmentTable {
    let existing: HashSet<EntityId> = residents.iter().map(|resident| resident.id).collect();
    let mut placed: HashSet<EntityId> = HashSet::new();
    let mut table = AssignmentTable::new();

    for (shop_id, sequence) in prior.entries() {
        let Some(shop) = shops.iter().find(|shop| shop.id == shop_id) else {
            continue;
        };
        let kept: Vec<EntityId> = sequence
            .iter()
            .copied()
            .filter(|id| existing.contains(id) && !placed.contains(id))
            .take(shop.capacity as usize)
            .collect();
        placed.extend(kept.iter().copied());
        table.insert(shop_id, kept);
    }

    table
}
