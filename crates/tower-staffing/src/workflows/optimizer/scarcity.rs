use crate::workflows::roster::domain::{EntityId, Resident, Shop, QUALIFIED_SKILL};
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
struct Scarcity {
    qualified: u64,
    capacity: u64,
}

impl Scarcity {
    /// Exact comparison of `qualified / capacity` without floating point.
    fn cmp_ratio(&self, other: &Self) -> Ordering {
        (self.qualified * other.capacity).cmp(&(other.qualified * self.capacity))
    }
}

/// Shops sorted from hardest to easiest to staff, measured once against the
/// residents still free after seeding. Ties keep declaration order.
pub(crate) fn order_by_scarcity<'a>(
    shops: &'a [Shop],
    residents: &[Resident],
    assigned: &HashSet<EntityId>,
) -> Vec<&'a Shop> {
    let mut ranked: Vec<(&Shop, Scarcity)> = shops
        .iter()
        .map(|shop| {
            let qualified = residents
                .iter()
                .filter(|resident| !assigned.contains(&resident.id))
                .filter(|resident| resident.skill(shop.category) >= QUALIFIED_SKILL)
                .count() as u64;
            (
                shop,
                Scarcity {
                    qualified,
                    capacity: u64::from(shop.capacity),
                },
            )
        })
        .collect();

    ranked.sort_by(|(_, left), (_, right)| left.cmp_ratio(right));
    ranked.into_iter().map(|(shop, _)| shop).collect()
}
