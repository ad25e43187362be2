use super::parser::validate_candidates;
use super::{CandidateBatch, ImportError};
use crate::workflows::roster::domain::Category;
use serde_json::{Map, Value};
use std::io::Read;

enum Column {
    Name,
    Skill(Category),
    DreamJob,
    Ignored,
}

impl Column {
    fn from_header(header: &str) -> Self {
        let key = header.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "name" | "resident" => Self::Name,
            "fav" | "dream_job" | "dreamjob" => Self::DreamJob,
            other => Category::parse(other).map_or(Self::Ignored, Self::Skill),
        }
    }
}

/// Reads a spreadsheet export (`Name,Food,Service,...,Dream Job`) into a batch.
///
/// Cells go through the same validation as JSON payloads; blank skill cells
/// count as "not supplied".
pub fn parse_csv_candidates<R: Read>(reader: R) -> Result<CandidateBatch, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<Column> = csv_reader
        .headers()
        .map_err(csv_failure)?
        .iter()
        .map(Column::from_header)
        .collect();
    if !columns.iter().any(|column| matches!(column, Column::Name)) {
        return Err(ImportError::malformed("CSV header has no name column"));
    }

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row.map_err(csv_failure)?;
        let mut skills = Map::new();
        let mut record = Map::new();

        for (column, cell) in columns.iter().zip(row.iter()) {
            match column {
                Column::Name => {
                    record.insert("name".into(), Value::String(cell.to_string()));
                }
                Column::Skill(category) => {
                    skills.insert(category.label().into(), Value::String(cell.to_string()));
                }
                Column::DreamJob => {
                    record.insert("fav".into(), Value::String(cell.to_string()));
                }
                Column::Ignored => {}
            }
        }

        record.insert("skills".into(), Value::Object(skills));
        records.push(Value::Object(record));
    }

    validate_candidates(&Value::Array(records))
}

fn csv_failure(err: csv::Error) -> ImportError {
    ImportError::malformed(format!("unreadable CSV: {err}"))
}
