use super::domain::{
    normalize_name, AssignmentTable, Category, EntityId, PartialSkills, Resident, Shop, SkillSet,
};
use super::store::{RosterSnapshot, SNAPSHOT_VERSION};
use crate::workflows::optimizer::{self, AssignmentMetrics, OptimizerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Resident,
    Shop,
}

impl EntityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Shop => "shop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("{} name must not be empty", .0.label())]
    EmptyName(EntityKind),
    #[error("{} '{}' already exists", .kind.label(), .name)]
    DuplicateName { kind: EntityKind, name: String },
    #[error("shop capacity must be at least 1")]
    InvalidCapacity,
    #[error("{category} skill {value} is outside 0-9")]
    InvalidSkill { category: Category, value: u8 },
    #[error("resident {0} not found")]
    ResidentNotFound(EntityId),
    #[error("shop {0} not found")]
    ShopNotFound(EntityId),
    #[error("no {} named '{}'", .kind.label(), .name)]
    UnknownName { kind: EntityKind, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResident {
    pub name: String,
    #[serde(default)]
    pub skills: SkillSet,
    #[serde(default)]
    pub dream_job: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub category: Category,
    pub capacity: u32,
}

/// Edit applied to an existing resident. A blank `dream_job` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentUpdate {
    #[serde(default)]
    pub skills: Option<PartialSkills>,
    #[serde(default)]
    pub dream_job: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopUpdate {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// Residents, shops, and their current assignment table.
///
/// The roster is a plain value: callers own it and pass it into each operation.
/// Every mutation keeps the assignment table consistent with the entities it
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    residents: Vec<Resident>,
    shops: Vec<Shop>,
    assignments: AssignmentTable,
    next_id: u64,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            residents: Vec::new(),
            shops: Vec::new(),
            assignments: AssignmentTable::new(),
            next_id: 1,
        }
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    pub fn shops(&self) -> &[Shop] {
        &self.shops
    }

    pub fn assignments(&self) -> &AssignmentTable {
        &self.assignments
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn resident(&self, id: EntityId) -> Option<&Resident> {
        self.residents.iter().find(|resident| resident.id == id)
    }

    pub fn shop(&self, id: EntityId) -> Option<&Shop> {
        self.shops.iter().find(|shop| shop.id == id)
    }

    pub fn resident_by_name(&self, name: &str) -> Option<&Resident> {
        let key = normalize_name(name);
        self.residents
            .iter()
            .find(|resident| normalize_name(&resident.name) == key)
    }

    pub fn shop_by_name(&self, name: &str) -> Option<&Shop> {
        let key = normalize_name(name);
        self.shops
            .iter()
            .find(|shop| normalize_name(&shop.name) == key)
    }

    /// Looks a resident up by name, falling back to a numeric id.
    pub fn find_resident(&self, target: &str) -> Result<EntityId, RosterError> {
        if let Some(resident) = self.resident_by_name(target) {
            return Ok(resident.id);
        }
        match target.trim().parse::<u64>() {
            Ok(id) => Ok(EntityId(id)),
            Err(_) => Err(RosterError::UnknownName {
                kind: EntityKind::Resident,
                name: target.trim().to_string(),
            }),
        }
    }

    pub fn find_shop(&self, target: &str) -> Result<EntityId, RosterError> {
        if let Some(shop) = self.shop_by_name(target) {
            return Ok(shop.id);
        }
        match target.trim().parse::<u64>() {
            Ok(id) => Ok(EntityId(id)),
            Err(_) => Err(RosterError::UnknownName {
                kind: EntityKind::Shop,
                name: target.trim().to_string(),
            }),
        }
    }

    pub fn add_resident(&mut self, resident: NewResident) -> Result<EntityId, RosterError> {
        let name = resident.name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName(EntityKind::Resident));
        }
        if self.resident_by_name(name).is_some() {
            return Err(RosterError::DuplicateName {
                kind: EntityKind::Resident,
                name: name.to_string(),
            });
        }
        check_skills(&resident.skills)?;

        let id = self.push_resident(name.to_string(), resident.skills, resident.dream_job);
        debug!(%id, name, "resident added");
        Ok(id)
    }

    pub fn add_shop(&mut self, shop: NewShop) -> Result<EntityId, RosterError> {
        let name = shop.name.trim();
        if name.is_empty() {
            return Err(RosterError::EmptyName(EntityKind::Shop));
        }
        if self.shop_by_name(name).is_some() {
            return Err(RosterError::DuplicateName {
                kind: EntityKind::Shop,
                name: name.to_string(),
            });
        }
        if shop.capacity == 0 {
            return Err(RosterError::InvalidCapacity);
        }

        let id = self.allocate_id();
        self.shops.push(Shop {
            id,
            name: name.to_string(),
            category: shop.category,
            capacity: shop.capacity,
        });
        debug!(%id, name, category = %shop.category, "shop added");
        Ok(id)
    }

    pub fn update_resident(
        &mut self,
        id: EntityId,
        update: ResidentUpdate,
    ) -> Result<&Resident, RosterError> {
        let index = self
            .residents
            .iter()
            .position(|resident| resident.id == id)
            .ok_or(RosterError::ResidentNotFound(id))?;

        let mut skills = self.residents[index].skills;
        if let Some(partial) = &update.skills {
            skills.apply(partial);
            check_skills(&skills)?;
        }

        let resident = &mut self.residents[index];
        resident.skills = skills;
        if let Some(dream_job) = update.dream_job {
            resident.dream_job = clean_dream_job(Some(dream_job));
        }
        Ok(&self.residents[index])
    }

    pub fn update_shop(&mut self, id: EntityId, update: ShopUpdate) -> Result<&Shop, RosterError> {
        if update.capacity == Some(0) {
            return Err(RosterError::InvalidCapacity);
        }
        let index = self
            .shops
            .iter()
            .position(|shop| shop.id == id)
            .ok_or(RosterError::ShopNotFound(id))?;

        if let Some(category) = update.category {
            self.shops[index].category = category;
        }
        if let Some(capacity) = update.capacity {
            self.shops[index].capacity = capacity;
            self.assignments.truncate_shop(id, capacity);
        }
        Ok(&self.shops[index])
    }

    pub fn remove_resident(&mut self, id: EntityId) -> Result<Resident, RosterError> {
        let index = self
            .residents
            .iter()
            .position(|resident| resident.id == id)
            .ok_or(RosterError::ResidentNotFound(id))?;
        self.assignments.remove_resident(id);
        Ok(self.residents.remove(index))
    }

    pub fn remove_shop(&mut self, id: EntityId) -> Result<Shop, RosterError> {
        let index = self
            .shops
            .iter()
            .position(|shop| shop.id == id)
            .ok_or(RosterError::ShopNotFound(id))?;
        self.assignments.remove_shop(id);
        Ok(self.shops.remove(index))
    }

    /// Recomputes the assignment table in place and returns the resulting metrics.
    ///
    /// On error the roster is left untouched.
    pub fn optimize(&mut self, lock_existing: bool) -> Result<AssignmentMetrics, OptimizerError> {
        let outcome = optimizer::run_optimizer(
            &self.residents,
            &self.shops,
            &self.assignments,
            lock_existing,
        )?;
        self.assignments = outcome.assignments;
        Ok(outcome.metrics)
    }

    pub fn metrics(&self) -> AssignmentMetrics {
        AssignmentMetrics::compute(&self.residents, &self.shops, &self.assignments)
    }

    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> RosterSnapshot {
        RosterSnapshot {
            version: SNAPSHOT_VERSION,
            saved_at,
            residents: self.residents.clone(),
            shops: self.shops.clone(),
            assignments: self.assignments.clone(),
            next_id: self.next_id,
        }
    }

    /// Rebuilds a roster from stored data, dropping any assignment that points at a
    /// missing entity, double-books a resident, or overflows a shop.
    pub fn from_snapshot(snapshot: RosterSnapshot) -> Self {
        let RosterSnapshot {
            residents,
            shops,
            assignments,
            next_id,
            ..
        } = snapshot;

        let max_id = residents
            .iter()
            .map(|resident| resident.id.0)
            .chain(shops.iter().map(|shop| shop.id.0))
            .max()
            .unwrap_or(0);

        let mut roster = Self {
            residents,
            shops,
            assignments: AssignmentTable::new(),
            next_id: next_id.max(max_id + 1),
        };

        let mut placed = HashSet::new();
        let mut pruned = 0usize;
        for (shop_id, sequence) in assignments.entries() {
            let Some(capacity) = roster.shop(shop_id).map(|shop| shop.capacity as usize) else {
                pruned += sequence.len();
                continue;
            };
            let mut kept = Vec::with_capacity(sequence.len().min(capacity));
            for resident_id in sequence {
                if kept.len() < capacity
                    && roster.resident(*resident_id).is_some()
                    && placed.insert(*resident_id)
                {
                    kept.push(*resident_id);
                } else {
                    pruned += 1;
                }
            }
            roster.assignments.insert(shop_id, kept);
        }

        if pruned > 0 {
            warn!(pruned, "dropped stale assignments while loading roster snapshot");
        }
        roster
    }

    pub(crate) fn resident_mut_by_name(&mut self, name: &str) -> Option<&mut Resident> {
        let key = normalize_name(name);
        self.residents
            .iter_mut()
            .find(|resident| normalize_name(&resident.name) == key)
    }

    /// Appends a resident without name checks; callers have already resolved collisions.
    pub(crate) fn push_resident(
        &mut self,
        name: String,
        skills: SkillSet,
        dream_job: Option<String>,
    ) -> EntityId {
        let id = self.allocate_id();
        self.residents.push(Resident {
            id,
            name,
            skills,
            dream_job: clean_dream_job(dream_job),
        });
        id
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn check_skills(skills: &SkillSet) -> Result<(), RosterError> {
    match skills.out_of_range() {
        Some((category, value)) => Err(RosterError::InvalidSkill { category, value }),
        None => Ok(()),
    }
}

pub(crate) fn clean_dream_job(value: Option<String>) -> Option<String> {
    value
        .map(|dream| dream.trim().to_string())
        .filter(|dream| !dream.is_empty())
}
