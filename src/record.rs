use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Presence of a form field value. A field that exists on the form but was
/// never filled in is `Empty`; a field the extractor could not see at all is
/// `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Absent,
    Empty,
    Present(&'a str),
}

impl<'a> FieldValue<'a> {
    pub fn from_raw(raw: Option<&'a str>) -> Self {
        match raw {
            None => FieldValue::Absent,
            Some("") => FieldValue::Empty,
            Some(v) => FieldValue::Present(v),
        }
    }

    pub fn content(&self) -> Option<&'a str> {
        match self {
            FieldValue::Present(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormFieldRecord {
    pub exam_number: String,
    pub marker: String,
    pub course_code: String,
    pub field: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl FormFieldRecord {
    pub fn value(&self) -> FieldValue<'_> {
        FieldValue::from_raw(self.value.as_deref())
    }
}

pub fn load_records(path: &Path) -> Result<Vec<FormFieldRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading form records: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing form records: {}", path.display()))
}

/// The summary describes a single paper; mixing courses is refused.
pub fn single_course_code(records: &[FormFieldRecord]) -> Result<String> {
    let codes: BTreeSet<&str> = records.iter().map(|r| r.course_code.as_str()).collect();
    match codes.len() {
        0 => bail!("no form records to summarise"),
        1 => Ok(codes.into_iter().next().unwrap_or_default().to_string()),
        _ => bail!(
            "found scripts from multiple courses: {}",
            codes.into_iter().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Orders records so that a run over the same set of records always produces
/// the same ledger: per exam, every original field before any moderation
/// field, then by field key and value.
pub fn canonical_order(records: &mut [FormFieldRecord]) {
    records.sort_by(|a, b| {
        a.exam_number
            .cmp(&b.exam_number)
            .then_with(|| is_moderation(&a.field).cmp(&is_moderation(&b.field)))
            .then_with(|| a.field.cmp(&b.field))
            .then_with(|| a.cmp(b))
    });
}

fn is_moderation(field: &str) -> bool {
    field.contains("qn-part-moderate-")
}
