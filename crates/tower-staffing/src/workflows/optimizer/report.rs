use super::metrics::AssignmentMetrics;
use crate::workflows::roster::domain::{Category, EntityId};
use crate::workflows::roster::Roster;
use serde::Serialize;

/// Occupant of one filled slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerView {
    pub slot: usize,
    pub resident_id: EntityId,
    pub name: String,
    pub skill: u8,
    pub dream_job_match: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShopStaffingView {
    pub shop_id: EntityId,
    pub name: String,
    pub category: Category,
    pub capacity: u32,
    pub workers: Vec<WorkerView>,
    pub open_slots: u32,
    pub skill_total: u32,
    pub skill_max: u32,
}

/// Per-shop staffing plus roster-wide metrics, shops in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffingReport {
    pub metrics: AssignmentMetrics,
    pub shops: Vec<ShopStaffingView>,
    pub unplaced_residents: Vec<String>,
}

impl StaffingReport {
    pub fn build(roster: &Roster) -> Self {
        let table = roster.assignments();
        let shops = roster
            .shops()
            .iter()
            .map(|shop| {
                let workers: Vec<WorkerView> = table
                    .get(shop.id)
                    .iter()
                    .filter_map(|id| roster.resident(*id))
                    .enumerate()
                    .map(|(slot, resident)| WorkerView {
                        slot,
                        resident_id: resident.id,
                        name: resident.name.clone(),
                        skill: resident.skill(shop.category),
                        dream_job_match: resident.dreams_of(&shop.name),
                    })
                    .collect();
                let skill_total = workers.iter().map(|worker| u32::from(worker.skill)).sum();
                ShopStaffingView {
                    shop_id: shop.id,
                    name: shop.name.clone(),
                    category: shop.category,
                    capacity: shop.capacity,
                    open_slots: shop.capacity.saturating_sub(workers.len() as u32),
                    skill_total,
                    skill_max: shop.max_skill(),
                    workers,
                }
            })
            .collect();

        let unplaced_residents = roster
            .residents()
            .iter()
            .filter(|resident| table.shop_of(resident.id).is_none())
            .map(|resident| resident.name.clone())
            .collect();

        Self {
            metrics: roster.metrics(),
            shops,
            unplaced_residents,
        }
    }

    pub fn has_unplaced(&self) -> bool {
        self.metrics.unplaced > 0
    }
}
