//! Merges externally produced resident records into a roster.
//!
//! Payloads are untrusted: they are first validated into a [`CandidateBatch`]
//! (all records or nothing), and only a validated batch can be reconciled.

mod csv;
mod normalizer;
mod parser;

pub use self::csv::parse_csv_candidates;
pub use parser::{parse_model_text, validate_candidates};

use crate::workflows::roster::domain::{normalize_name, EntityId, PartialSkills};
use crate::workflows::roster::Roster;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("the scanned data could not be read ({reason}); please scan again")]
    Malformed { reason: String },
}

impl ImportError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// One validated record. Skills hold only the categories that were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateResident {
    pub name: String,
    pub skills: PartialSkills,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dream_job: Option<String>,
}

/// A non-empty list of structurally valid candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateBatch {
    candidates: Vec<CandidateResident>,
}

impl CandidateBatch {
    pub(crate) fn new(candidates: Vec<CandidateResident>) -> Result<Self, ImportError> {
        if candidates.is_empty() {
            return Err(ImportError::malformed("no residents found"));
        }
        Ok(Self { candidates })
    }

    pub fn candidates(&self) -> &[CandidateResident] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Drops the candidate at `index`; the batch must keep at least one record.
    pub fn remove(&mut self, index: usize) -> Option<CandidateResident> {
        if index >= self.candidates.len() || self.candidates.len() == 1 {
            return None;
        }
        Some(self.candidates.remove(index))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.created, self.updated) {
            (0, 0) => write!(f, "nothing to import"),
            (created, 0) => write!(f, "{created} added"),
            (0, updated) => write!(f, "{updated} updated"),
            (created, updated) => write!(f, "{created} added, {updated} updated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPreviewRow {
    pub name: String,
    pub skills: PartialSkills,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dream_job: Option<String>,
    pub action: ImportAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<EntityId>,
}

/// Validates `payload` and merges it; a malformed payload leaves the roster untouched.
pub fn reconcile_import(
    roster: Roster,
    payload: &Value,
) -> Result<(Roster, ImportSummary), ImportError> {
    let batch = validate_candidates(payload)?;
    Ok(reconcile(roster, batch))
}

/// Add-or-update by case-insensitive name, in batch order.
///
/// Matches overwrite only the supplied skills and a supplied dream job; new
/// residents default missing skills to 5.
pub fn reconcile(mut roster: Roster, batch: CandidateBatch) -> (Roster, ImportSummary) {
    let mut summary = ImportSummary::default();

    for candidate in batch.candidates {
        let CandidateResident {
            name,
            skills,
            dream_job,
        } = candidate;

        match roster.resident_mut_by_name(&name) {
            Some(existing) => {
                existing.skills.apply(&skills);
                if dream_job.is_some() {
                    existing.dream_job = dream_job;
                }
                summary.updated += 1;
            }
            None => {
                roster.push_resident(name, skills.complete(), dream_job);
                summary.created += 1;
            }
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        "import reconciled"
    );
    (roster, summary)
}

/// What [`reconcile`] would do with each candidate, without touching the roster.
pub fn preview(roster: &Roster, batch: &CandidateBatch) -> Vec<ImportPreviewRow> {
    let mut pending_names = HashSet::new();

    batch
        .candidates()
        .iter()
        .map(|candidate| {
            let existing_id = roster
                .resident_by_name(&candidate.name)
                .map(|resident| resident.id);
            let first_in_batch = pending_names.insert(normalize_name(&candidate.name));
            let action = if existing_id.is_some() || !first_in_batch {
                ImportAction::Update
            } else {
                ImportAction::Create
            };

            ImportPreviewRow {
                name: candidate.name.clone(),
                skills: candidate.skills.clone(),
                dream_job: candidate.dream_job.clone(),
                action,
                existing_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::roster::domain::{Category, SkillSet};
    use crate::workflows::roster::NewResident;
    use serde_json::json;

    fn roster_with_perry() -> Roster {
        let mut roster = Roster::new();
        roster
            .add_resident(NewResident {
                name: "Perry Mitchell".to_string(),
                skills: SkillSet::uniform(3),
                dream_job: Some("Mechanic".to_string()),
            })
            .expect("resident");
        roster
    }

    #[test]
    fn case_different_match_updates_only_supplied_skills() {
        let roster = roster_with_perry();
        let payload = json!([{ "name": "PERRY MITCHELL", "skills": { "Food": 8 } }]);

        let (roster, summary) = reconcile_import(roster, &payload).expect("import");
        assert_eq!(summary, ImportSummary { created: 0, updated: 1 });

        let perry = roster.resident_by_name("perry mitchell").expect("present");
        assert_eq!(perry.skills, SkillSet::uniform(3).with(Category::Food, 8));
        assert_eq!(perry.dream_job.as_deref(), Some("Mechanic"));
        assert_eq!(roster.residents().len(), 1);
    }

    #[test]
    fn new_candidates_default_missing_skills_to_five() {
        let payload = json!([{
            "name": "Lola Reyes",
            "skills": { "Retail": 9, "Creative": null },
            "fav": "Boutique"
        }]);

        let (roster, summary) = reconcile_import(Roster::new(), &payload).expect("import");
        assert_eq!(summary, ImportSummary { created: 1, updated: 0 });

        let lola = roster.resident_by_name("Lola Reyes").expect("created");
        assert_eq!(lola.skills, SkillSet::uniform(5).with(Category::Retail, 9));
        assert_eq!(lola.dream_job.as_deref(), Some("Boutique"));
    }

    #[test]
    fn blank_dream_job_keeps_existing_value() {
        let payload = json!([{ "name": "Perry Mitchell", "skills": {}, "fav": "  " }]);
        let (roster, _) = reconcile_import(roster_with_perry(), &payload).expect("import");
        let perry = roster.resident_by_name("Perry Mitchell").expect("present");
        assert_eq!(perry.dream_job.as_deref(), Some("Mechanic"));
    }

    #[test]
    fn repeated_name_in_batch_creates_then_updates() {
        let payload = json!([
            { "name": "Ada", "skills": { "Food": 1 } },
            { "name": "ada ", "skills": { "Food": 7 } }
        ]);
        let batch = validate_candidates(&payload).expect("valid");
        let rows = preview(&Roster::new(), &batch);
        assert_eq!(rows[0].action, ImportAction::Create);
        assert_eq!(rows[1].action, ImportAction::Update);

        let (roster, summary) = reconcile(Roster::new(), batch);
        assert_eq!(summary, ImportSummary { created: 1, updated: 1 });
        assert_eq!(roster.residents().len(), 1);
        assert_eq!(roster.residents()[0].skills.food, 7);
    }

    #[test]
    fn malformed_payload_merges_nothing() {
        let roster = roster_with_perry();
        let payload = json!([
            { "name": "Ada", "skills": { "Food": 1 } },
            { "name": "Bo" }
        ]);

        let err = reconcile_import(roster.clone(), &payload).expect_err("rejected");
        assert!(matches!(err, ImportError::Malformed { .. }));
        assert!(err.to_string().contains("scan again"));
    }

    #[test]
    fn preview_marks_existing_residents_as_updates() {
        let roster = roster_with_perry();
        let batch = validate_candidates(&json!([
            { "name": "perry mitchell", "skills": { "Food": 2 } },
            { "name": "New Person", "skills": { "Food": 2 } }
        ]))
        .expect("valid");

        let rows = preview(&roster, &batch);
        assert_eq!(rows[0].action, ImportAction::Update);
        assert_eq!(rows[0].existing_id, Some(roster.residents()[0].id));
        assert_eq!(rows[1].action, ImportAction::Create);
        assert_eq!(rows[1].existing_id, None);
    }

    #[test]
    fn batch_remove_keeps_at_least_one_candidate() {
        let mut batch = validate_candidates(&json!([
            { "name": "A", "skills": {} },
            { "name": "B", "skills": {} }
        ]))
        .expect("valid");
        assert_eq!(batch.remove(0).map(|c| c.name), Some("A".to_string()));
        assert_eq!(batch.remove(0), None);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn summary_formats_counts() {
        assert_eq!(ImportSummary { created: 2, updated: 1 }.to_string(), "2 added, 1 updated");
        assert_eq!(ImportSummary { created: 0, updated: 3 }.to_string(), "3 updated");
    }
}
