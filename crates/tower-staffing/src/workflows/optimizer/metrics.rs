use crate::workflows::roster::domain::{AssignmentTable, Resident, Shop, MAX_SKILL};
use serde::{Deserialize, Serialize};

/// Summary derived from an assignment table; never stored, always recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentMetrics {
    pub total_skill: u32,
    pub total_slots: u32,
    pub filled_slots: u32,
    pub efficiency_pct: u32,
    pub unplaced: u32,
}

impl AssignmentMetrics {
    pub fn compute(residents: &[Resident], shops: &[Shop], table: &AssignmentTable) -> Self {
        let mut total_skill = 0u32;
        let mut total_slots = 0u32;
        let mut filled_slots = 0u32;

        for shop in shops {
            total_slots += shop.capacity;
            for resident_id in table.get(shop.id) {
                if let Some(resident) = residents.iter().find(|r| r.id == *resident_id) {
                    filled_slots += 1;
                    total_skill += u32::from(resident.skill(shop.category));
                }
            }
        }

        Self {
            total_skill,
            total_slots,
            filled_slots,
            efficiency_pct: efficiency_pct(total_skill, filled_slots),
            unplaced: (residents.len() as u32).saturating_sub(filled_slots),
        }
    }

    pub fn open_slots(&self) -> u32 {
        self.total_slots.saturating_sub(self.filled_slots)
    }
}

/// `round(total / (filled * 9) * 100)`, rounding halves up, in integer arithmetic.
fn efficiency_pct(total_skill: u32, filled_slots: u32) -> u32 {
    if filled_slots == 0 {
        return 0;
    }
    let ceiling = u64::from(filled_slots) * u64::from(MAX_SKILL);
    let scaled = u64::from(total_skill) * 200 + ceiling;
    (scaled / (ceiling * 2)) as u32
}
