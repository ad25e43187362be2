use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::domain::{AssignmentTable, EntityId, Resident, Shop};
use super::roster::{NewResident, NewShop, ResidentUpdate, Roster, RosterError, ShopUpdate};
use super::store::{RosterStore, StoreError};
use crate::workflows::import::{
    self, CandidateBatch, ImportError, ImportPreviewRow, ImportSummary,
};
use crate::workflows::optimizer::{AssignmentMetrics, OptimizerError, StaffingReport};

/// Full roster as returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterView {
    pub residents: Vec<Resident>,
    pub shops: Vec<Shop>,
    pub assignments: AssignmentTable,
    pub metrics: AssignmentMetrics,
}

impl RosterView {
    pub fn of(roster: &Roster) -> Self {
        Self {
            residents: roster.residents().to_vec(),
            shops: roster.shops().to_vec(),
            assignments: roster.assignments().clone(),
            metrics: roster.metrics(),
        }
    }
}

/// Owns the one live roster and persists every change through a [`RosterStore`].
///
/// Mutations run against a copy; the copy replaces the live roster only after
/// the store accepted it.
pub struct RosterService<S> {
    store: Arc<S>,
    roster: Mutex<Roster>,
}

impl<S> RosterService<S>
where
    S: RosterStore + 'static,
{
    /// Restores the last saved roster, or starts empty.
    pub fn open(store: Arc<S>) -> Result<Self, RosterServiceError> {
        let roster = match store.load()? {
            Some(snapshot) => Roster::from_snapshot(snapshot),
            None => Roster::new(),
        };
        info!(
            residents = roster.residents().len(),
            shops = roster.shops().len(),
            "roster opened"
        );
        Ok(Self::with_roster(store, roster))
    }

    pub fn with_roster(store: Arc<S>, roster: Roster) -> Self {
        Self {
            store,
            roster: Mutex::new(roster),
        }
    }

    pub fn roster(&self) -> Result<Roster, RosterServiceError> {
        Ok(self.lock()?.clone())
    }

    pub fn view(&self) -> Result<RosterView, RosterServiceError> {
        Ok(RosterView::of(&*self.lock()?))
    }

    pub fn staffing(&self) -> Result<StaffingReport, RosterServiceError> {
        Ok(StaffingReport::build(&*self.lock()?))
    }

    pub fn add_resident(&self, resident: NewResident) -> Result<Resident, RosterServiceError> {
        self.commit(|roster| {
            let id = roster.add_resident(resident)?;
            Ok(cloned_resident(roster, id)?)
        })
    }

    pub fn update_resident(
        &self,
        id: EntityId,
        update: ResidentUpdate,
    ) -> Result<Resident, RosterServiceError> {
        self.commit(|roster| Ok(roster.update_resident(id, update)?.clone()))
    }

    pub fn remove_resident(&self, id: EntityId) -> Result<Resident, RosterServiceError> {
        self.commit(|roster| Ok(roster.remove_resident(id)?))
    }

    pub fn add_shop(&self, shop: NewShop) -> Result<Shop, RosterServiceError> {
        self.commit(|roster| {
            let id = roster.add_shop(shop)?;
            Ok(roster
                .shop(id)
                .cloned()
                .ok_or(RosterError::ShopNotFound(id))?)
        })
    }

    pub fn update_shop(&self, id: EntityId, update: ShopUpdate) -> Result<Shop, RosterServiceError> {
        self.commit(|roster| Ok(roster.update_shop(id, update)?.clone()))
    }

    pub fn remove_shop(&self, id: EntityId) -> Result<Shop, RosterServiceError> {
        self.commit(|roster| Ok(roster.remove_shop(id)?))
    }

    /// Reassigns residents and returns the resulting staffing report.
    pub fn optimize(&self, lock_existing: bool) -> Result<StaffingReport, RosterServiceError> {
        self.commit(|roster| {
            roster.optimize(lock_existing)?;
            Ok(StaffingReport::build(roster))
        })
    }

    /// Validates and merges a raw JSON payload.
    pub fn import(&self, payload: &Value) -> Result<ImportSummary, RosterServiceError> {
        let batch = import::validate_candidates(payload)?;
        self.import_batch(batch)
    }

    pub fn import_batch(&self, batch: CandidateBatch) -> Result<ImportSummary, RosterServiceError> {
        self.commit(|roster| {
            let (merged, summary) = import::reconcile(std::mem::take(roster), batch);
            *roster = merged;
            Ok(summary)
        })
    }

    pub fn preview(&self, batch: &CandidateBatch) -> Result<Vec<ImportPreviewRow>, RosterServiceError> {
        Ok(import::preview(&*self.lock()?, batch))
    }

    fn commit<T>(
        &self,
        operation: impl FnOnce(&mut Roster) -> Result<T, RosterServiceError>,
    ) -> Result<T, RosterServiceError> {
        let mut live = self.lock()?;
        let mut staged = live.clone();
        let value = operation(&mut staged)?;
        self.store.save(&staged.snapshot(Utc::now()))?;
        *live = staged;
        Ok(value)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Roster>, RosterServiceError> {
        self.roster.lock().map_err(|_| {
            RosterServiceError::Store(StoreError::Unavailable(
                "roster mutex poisoned".to_string(),
            ))
        })
    }
}

fn cloned_resident(roster: &Roster, id: EntityId) -> Result<Resident, RosterError> {
    roster
        .resident(id)
        .cloned()
        .ok_or(RosterError::ResidentNotFound(id))
}

/// Error raised by the roster service.
#[derive(Debug, thiserror::Error)]
pub enum RosterServiceError {
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
