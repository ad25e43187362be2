use crate::workflows::roster::domain::{names_match, EntityId, Resident, Shop};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Free residents ordered best-first for one shop.
///
/// Keys, most significant first: skill in the shop's category (descending), dream
/// job names this shop, dream job names some shop of the same category. Anything
/// still tied keeps resident declaration order.
pub(crate) fn rank_candidates<'a>(
    shop: &Shop,
    shops: &[Shop],
    residents: &'a [Resident],
    assigned: &HashSet<EntityId>,
) -> Vec<&'a Resident> {
    let mut candidates: Vec<CandidateKey<'a>> = residents
        .iter()
        .filter(|resident| !assigned.contains(&resident.id))
        .map(|resident| CandidateKey::new(resident, shop, shops))
        .collect();

    candidates.sort_by(CandidateKey::compare);
    candidates
        .into_iter()
        .map(|candidate| candidate.resident)
        .collect()
}

struct CandidateKey<'a> {
    resident: &'a Resident,
    skill: u8,
    dreams_of_shop: bool,
    dreams_of_category: bool,
}

impl<'a> CandidateKey<'a> {
    fn new(resident: &'a Resident, shop: &Shop, shops: &[Shop]) -> Self {
        let dreams_of_category = resident
            .dream_job
            .as_deref()
            .and_then(|dream| shops.iter().find(|other| names_match(&other.name, dream)))
            .is_some_and(|dream_shop| dream_shop.category == shop.category);

        Self {
            resident,
            skill: resident.skill(shop.category),
            dreams_of_shop: resident.dreams_of(&shop.name),
            dreams_of_category,
        }
    }

    fn compare(left: &Self, right: &Self) -> Ordering {
        right
            .skill
            .cmp(&left.skill)
            .then_with(|| right.dreams_of_shop.cmp(&left.dreams_of_shop))
            .then_with(|| right.dreams_of_category.cmp(&left.dreams_of_category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::roster::domain::{Category, SkillSet};

    fn shop(id: u64, name: &str, category: Category) -> Shop {
        Shop {
            id: EntityId(id),
            name: name.to_string(),
            category,
            capacity: 1,
        }
    }

    fn resident(id: u64, food: u8, dream_job: Option<&str>) -> Resident {
        Resident {
            id: EntityId(id),
            name: format!("resident-{id}"),
            skills: SkillSet::uniform(0).with(Category::Food, food),
            dream_job: dream_job.map(str::to_string),
        }
    }

    fn ranked_ids(shop: &Shop, shops: &[Shop], residents: &[Resident]) -> Vec<u64> {
        rank_candidates(shop, shops, residents, &HashSet::new())
            .into_iter()
            .map(|resident| resident.id.0)
            .collect()
    }

    #[test]
    fn skill_outranks_dream_job() {
        let shops = vec![shop(1, "Sushi", Category::Food)];
        let residents = vec![resident(10, 4, Some("sushi")), resident(11, 6, None)];
        assert_eq!(ranked_ids(&shops[0], &shops, &residents), vec![11, 10]);
    }

    #[test]
    fn padded_dream_job_still_counts_as_a_fan() {
        let shops = vec![shop(1, "Sushi", Category::Food)];
        let residents = vec![resident(10, 6, None), resident(11, 6, Some("  sushi "))];
        assert_eq!(ranked_ids(&shops[0], &shops, &residents), vec![11, 10]);
    }

    #[test]
    fn shop_fan_outranks_category_fan() {
        let shops = vec![
            shop(1, "Sushi", Category::Food),
            shop(2, "Bakery", Category::Food),
        ];
        let residents = vec![
            resident(10, 7, Some("Bakery")),
            resident(11, 7, Some("SUSHI")),
            resident(12, 7, None),
        ];
        assert_eq!(ranked_ids(&shops[0], &shops, &residents), vec![11, 10, 12]);
    }

    #[test]
    fn dream_job_of_other_category_or_missing_shop_gives_no_bonus() {
        let shops = vec![
            shop(1, "Sushi", Category::Food),
            shop(2, "Arcade", Category::Recreation),
        ];
        let residents = vec![
            resident(10, 5, Some("Arcade")),
            resident(11, 5, Some("Mechanic")),
            resident(12, 5, None),
        ];
        assert_eq!(ranked_ids(&shops[0], &shops, &residents), vec![10, 11, 12]);
    }

    #[test]
    fn assigned_residents_are_excluded() {
        let shops = vec![shop(1, "Sushi", Category::Food)];
        let residents = vec![resident(10, 9, None), resident(11, 3, None)];
        let assigned: HashSet<EntityId> = [EntityId(10)].into_iter().collect();
        let ranked: Vec<u64> = rank_candidates(&shops[0], &shops, &residents, &assigned)
            .into_iter()
            .map(|resident| resident.id.0)
            .collect();
        assert_eq!(ranked, vec![11]);
    }
}
