use crate::{
    ledger::{ExamLedger, MarkLedger},
    scheme::MarkingScheme,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    NonIntegerMark,
    ExceedsMax(u32),
    NotMarked,
    MultipleMarks,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::NonIntegerMark => f.write_str("noninteger mark"),
            IssueKind::ExceedsMax(max) => write!(f, "max mark is {max}"),
            IssueKind::NotMarked => f.write_str("not marked"),
            IssueKind::MultipleMarks => f.write_str("multiple marks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub part: String,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.part, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Unmarked,
    Checked(Vec<ValidationIssue>),
}

/// Final checks for one exam, run after the whole record stream is in the
/// ledger. Each part carries at most one issue; a later check replaces an
/// issue raised while the marks were read.
pub fn validate_exam(exam: &ExamLedger, scheme: &MarkingScheme, ledger: &MarkLedger) -> Verdict {
    if !exam.has_interaction() {
        return Verdict::Unmarked;
    }

    let mut by_part: BTreeMap<usize, IssueKind> = exam.ingest_issues().clone();

    for part in scheme.parts() {
        let entries = exam.entries(part.index);
        if entries.is_empty() && ledger.part_count(part.index) > 0 {
            by_part.insert(part.index, IssueKind::NotMarked);
        }
        if entries.len() > 1 {
            by_part.insert(part.index, IssueKind::MultipleMarks);
        }
    }

    let mut issues: Vec<ValidationIssue> = by_part
        .into_iter()
        .filter_map(|(index, kind)| {
            scheme.part(index).map(|p| ValidationIssue {
                part: p.name.clone(),
                kind,
            })
        })
        .collect();
    issues.sort_by_key(|i| i.to_string());
    Verdict::Checked(issues)
}
