use super::normalizer::{relax_json, strip_wrappers};
use super::{CandidateBatch, CandidateResident, ImportError};
use crate::workflows::roster::domain::{Category, PartialSkills, MAX_SKILL};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const DREAM_JOB_KEYS: [&str; 3] = ["fav", "dream_job", "dreamJob"];

/// Turns free-form model output into a validated batch.
pub fn parse_model_text(text: &str) -> Result<CandidateBatch, ImportError> {
    let cleaned = strip_wrappers(text);
    if cleaned.is_empty() {
        return Err(ImportError::malformed("no JSON list in the response"));
    }

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(strict) => {
            debug!(error = %strict, "strict parse failed, retrying with relaxed JSON");
            serde_json::from_str::<Value>(&relax_json(&cleaned)).map_err(|err| {
                warn!(error = %err, "model output is not valid JSON");
                ImportError::malformed(format!("invalid JSON: {err}"))
            })?
        }
    };

    validate_candidates(&value)
}

/// Checks every record before anything is accepted.
///
/// The payload must be a non-empty array of objects, each with a non-blank
/// `name` and a `skills` object. Skill keys match categories case-insensitively
/// and unknown keys are ignored; `null` means "not supplied".
pub fn validate_candidates(payload: &Value) -> Result<CandidateBatch, ImportError> {
    let records = payload
        .as_array()
        .ok_or_else(|| ImportError::malformed("expected a list of residents"))?;

    let candidates = records
        .iter()
        .enumerate()
        .map(|(index, record)| candidate_from_record(index + 1, record))
        .collect::<Result<Vec<_>, _>>()?;

    CandidateBatch::new(candidates)
}

fn candidate_from_record(position: usize, record: &Value) -> Result<CandidateResident, ImportError> {
    let fields = record
        .as_object()
        .ok_or_else(|| ImportError::malformed(format!("record {position} is not an object")))?;

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ImportError::malformed(format!("record {position} has no name")))?;

    let skills = fields
        .get("skills")
        .and_then(Value::as_object)
        .ok_or_else(|| ImportError::malformed(format!("{name} has no skills object")))?;

    Ok(CandidateResident {
        name: name.to_string(),
        skills: parse_skills(name, skills)?,
        dream_job: parse_dream_job(name, fields)?,
    })
}

fn parse_skills(name: &str, skills: &Map<String, Value>) -> Result<PartialSkills, ImportError> {
    let mut parsed = PartialSkills::new();

    for (key, value) in skills {
        let Some(category) = Category::parse(key) else {
            debug!(resident = name, key = %key, "ignoring unknown skill key");
            continue;
        };
        if let Some(rating) = parse_rating(value).map_err(|found| {
            ImportError::malformed(format!("{name} has an invalid {category} rating: {found}"))
        })? {
            parsed.insert(category, rating);
        }
    }

    Ok(parsed)
}

/// `Ok(None)` for a missing rating; `Err` carries the offending value.
fn parse_rating(value: &Value) -> Result<Option<u8>, String> {
    let rating = match value {
        Value::Null => return Ok(None),
        Value::Number(number) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && *float >= 0.0)
                    .map(|float| float as u64)
            }),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<u64>().ok()
        }
        _ => None,
    };

    match rating {
        Some(rating) if rating <= u64::from(MAX_SKILL) => Ok(Some(rating as u8)),
        _ => Err(value.to_string()),
    }
}

fn parse_dream_job(name: &str, fields: &Map<String, Value>) -> Result<Option<String>, ImportError> {
    for key in DREAM_JOB_KEYS {
        match fields.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(dream)) => {
                let dream = dream.trim();
                return Ok((!dream.is_empty()).then(|| dream.to_string()));
            }
            Some(other) => {
                return Err(ImportError::malformed(format!(
                    "{name} has a non-text dream job: {other}"
                )))
            }
        }
    }
    Ok(None)
}
