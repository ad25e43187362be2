//! Residents, shops, and the assignment table that staffs them.

pub mod domain;
#[allow(clippy::module_inception)]
mod roster;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    AssignmentTable, Category, EntityId, PartialSkills, Resident, Shop, SkillSet, UnknownCategory,
};
pub use roster::{EntityKind, NewResident, NewShop, ResidentUpdate, Roster, RosterError, ShopUpdate};
pub use router::roster_router;
pub use service::{RosterService, RosterServiceError, RosterView};
pub use store::{JsonFileStore, MemoryRosterStore, RosterSnapshot, RosterStore, StoreError};
