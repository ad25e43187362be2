use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::roster::domain::{Category, SkillSet};
use crate::workflows::roster::store::{
    MemoryRosterStore, RosterSnapshot, RosterStore, StoreError,
};
use crate::workflows::roster::{roster_router, NewResident, NewShop, RosterService};

pub(super) fn resident(name: &str, skills: SkillSet, dream_job: Option<&str>) -> NewResident {
    NewResident {
        name: name.to_string(),
        skills,
        dream_job: dream_job.map(str::to_string),
    }
}

pub(super) fn cook(name: &str, food: u8) -> NewResident {
    resident(name, SkillSet::uniform(1).with(Category::Food, food), None)
}

pub(super) fn shop(name: &str, category: Category, capacity: u32) -> NewShop {
    NewShop {
        name: name.to_string(),
        category,
        capacity,
    }
}

pub(super) fn build_service() -> (RosterService<MemoryRosterStore>, Arc<MemoryRosterStore>) {
    let store = Arc::new(MemoryRosterStore::default());
    let service = RosterService::open(store.clone()).expect("empty store opens");
    (service, store)
}

/// Diner (cap 2) with three cooks rated 9, 3 and 7.
pub(super) fn seeded_service() -> (RosterService<MemoryRosterStore>, Arc<MemoryRosterStore>) {
    let (service, store) = build_service();
    service
        .add_shop(shop("Diner", Category::Food, 2))
        .expect("shop");
    for (name, food) in [("Ada", 9), ("Bo", 3), ("Cy", 7)] {
        service.add_resident(cook(name, food)).expect("resident");
    }
    (service, store)
}

pub(super) fn router_with_service(service: RosterService<MemoryRosterStore>) -> axum::Router {
    roster_router(Arc::new(service))
}

/// Accepts a fixed number of saves, then fails every later one.
pub(super) struct FlakyStore {
    inner: MemoryRosterStore,
    remaining: AtomicUsize,
}

impl FlakyStore {
    pub(super) fn failing_after(saves: usize) -> Self {
        Self {
            inner: MemoryRosterStore::default(),
            remaining: AtomicUsize::new(saves),
        }
    }
}

impl RosterStore for FlakyStore {
    fn load(&self) -> Result<Option<RosterSnapshot>, StoreError> {
        self.inner.load()
    }

    fn save(&self, snapshot: &RosterSnapshot) -> Result<(), StoreError> {
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.save(snapshot)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
