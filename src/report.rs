use crate::validation::ValidationIssue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    Invalid,
    Valid,
    Unmarked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub exam_number: String,
    pub cells: Vec<String>, // scheme order
    pub total: i64,
    pub issues: Vec<ValidationIssue>,
    pub validation: String,
    pub unmarked_pages: Vec<u32>,
    pub bad_pages: Vec<u32>,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartStats {
    pub name: String,
    pub max_marks: u32,
    pub mean: Option<f64>,
    pub mean_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperStats {
    pub parts: Vec<PartStats>,
    pub total_marks: u32,
    pub marked_scripts: usize,
    pub mean: Option<f64>,
    pub mean_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSummary {
    pub course_code: String,
    pub markers: Vec<String>,
    pub stats: PaperStats,
    /// Sorted by exam number.
    pub rows: Vec<ReportRow>,
}

impl MarkSummary {
    pub fn rows_in(&self, class: Classification) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.classification == class)
    }

    pub fn count(&self, class: Classification) -> usize {
        self.rows_in(class).count()
    }
}
