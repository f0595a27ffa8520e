use crate::{
    field_key::{FieldKeyDecoder, FieldKind},
    record::FormFieldRecord,
    sanitize::ValueSanitizer,
    scheme::{MarkingScheme, PartDefinition},
    validation::IssueKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Original,
    Moderated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkEntry {
    pub value: String,
    pub origin: Origin,
}

/// What one record did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Key carries no page, or names a part outside the scheme.
    Dropped,
    /// Page registered, nothing else (blank value or unknown field).
    PageOnly,
    BadPage,
    SeenPage,
    Mark,
    Moderation { reset: bool },
}

#[derive(Debug, Clone, Default)]
pub struct ExamLedger {
    marks: Vec<Vec<MarkEntry>>,
    kept_sum: Vec<i64>,
    kept_count: Vec<u32>,
    moderated: BTreeSet<usize>,
    page_interactions: BTreeMap<u32, u32>,
    bad_pages: Vec<u32>,
    row_total: i64,
    issues: BTreeMap<usize, IssueKind>,
}

impl ExamLedger {
    fn new(parts: usize) -> Self {
        Self {
            marks: vec![Vec::new(); parts],
            kept_sum: vec![0; parts],
            kept_count: vec![0; parts],
            ..Default::default()
        }
    }

    pub fn entries(&self, part: usize) -> &[MarkEntry] {
        self.marks.get(part).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_moderated(&self, part: usize) -> bool {
        self.moderated.contains(&part)
    }

    pub fn page_interactions(&self) -> &BTreeMap<u32, u32> {
        &self.page_interactions
    }

    pub fn has_interaction(&self) -> bool {
        self.page_interactions.values().any(|&n| n > 0)
    }

    pub fn unmarked_pages(&self) -> Vec<u32> {
        self.page_interactions
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn bad_pages(&self) -> Vec<u32> {
        let mut pages = self.bad_pages.clone();
        pages.sort_unstable();
        pages
    }

    pub fn row_total(&self) -> i64 {
        self.row_total
    }

    /// Issues raised while reading values (non-integer, above maximum).
    pub fn ingest_issues(&self) -> &BTreeMap<usize, IssueKind> {
        &self.issues
    }

    fn touch_page(&mut self, page: u32) -> &mut u32 {
        self.page_interactions.entry(page).or_insert(0)
    }
}

/// Per-run accumulator of every exam's marks plus the run-wide per-part sums
/// used for the paper statistics.
#[derive(Debug)]
pub struct MarkLedger<'s> {
    scheme: &'s MarkingScheme,
    decoder: FieldKeyDecoder,
    sanitizer: ValueSanitizer,
    exams: BTreeMap<String, ExamLedger>,
    part_sum: Vec<i64>,
    part_count: Vec<u32>,
    course_codes: BTreeSet<String>,
    markers: BTreeSet<String>,
}

impl<'s> MarkLedger<'s> {
    pub fn new(scheme: &'s MarkingScheme, decoder: FieldKeyDecoder, sanitizer: ValueSanitizer) -> Self {
        Self {
            scheme,
            decoder,
            sanitizer,
            exams: BTreeMap::new(),
            part_sum: vec![0; scheme.len()],
            part_count: vec![0; scheme.len()],
            course_codes: BTreeSet::new(),
            markers: BTreeSet::new(),
        }
    }

    pub fn ingest_all<'r, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'r FormFieldRecord>,
    {
        for r in records {
            self.ingest(r);
        }
    }

    pub fn ingest(&mut self, record: &FormFieldRecord) -> Applied {
        let parts = self.scheme.len();
        self.course_codes.insert(record.course_code.clone());
        let marker = self
            .decoder
            .marker_override(&record.field)
            .unwrap_or_else(|| record.marker.clone());
        self.markers.insert(marker);

        let exam = self
            .exams
            .entry(record.exam_number.clone())
            .or_insert_with(|| ExamLedger::new(parts));

        let Some(key) = self.decoder.decode(&record.field) else {
            trace!(field = %record.field, "field key has no page");
            return Applied::Dropped;
        };
        exam.touch_page(key.page);

        let Some(raw) = record.value().content() else {
            return Applied::PageOnly;
        };

        let kind = self.decoder.classify(&key.base);
        match kind {
            FieldKind::PageBad => {
                exam.bad_pages.push(key.page);
                *exam.touch_page(key.page) += 1;
                Applied::BadPage
            }
            FieldKind::PageSeen => {
                *exam.touch_page(key.page) += 1;
                Applied::SeenPage
            }
            FieldKind::Mark(index) | FieldKind::Moderate(index) => {
                let Some(part) = self.scheme.part(index) else {
                    warn!(
                        exam = %record.exam_number,
                        field = %record.field,
                        "part index {index} is not in the marking scheme"
                    );
                    return Applied::Dropped;
                };

                let value = self.sanitizer.clean(raw);
                if value.is_empty() {
                    return Applied::PageOnly;
                }

                let moderation = matches!(kind, FieldKind::Moderate(_));
                let mut reset = false;
                if moderation && !exam.moderated.contains(&index) {
                    reset_for_moderation(exam, &mut self.part_sum, &mut self.part_count, index);
                    debug!(exam = %record.exam_number, part = %part.name, "moderation replaces original marks");
                    reset = true;
                }

                let origin = if moderation { Origin::Moderated } else { Origin::Original };
                record_mark(exam, &mut self.part_sum, &mut self.part_count, part, value, origin);
                *exam.touch_page(key.page) += 1;

                if moderation {
                    Applied::Moderation { reset }
                } else {
                    Applied::Mark
                }
            }
            FieldKind::Unrecognized => Applied::PageOnly,
        }
    }

    pub fn scheme(&self) -> &MarkingScheme {
        self.scheme
    }

    pub fn exams(&self) -> impl Iterator<Item = (&str, &ExamLedger)> {
        self.exams.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn exam(&self, exam_number: &str) -> Option<&ExamLedger> {
        self.exams.get(exam_number)
    }

    pub fn part_sum(&self, part: usize) -> i64 {
        self.part_sum.get(part).copied().unwrap_or_default()
    }

    pub fn part_count(&self, part: usize) -> u32 {
        self.part_count.get(part).copied().unwrap_or_default()
    }

    pub fn course_codes(&self) -> &BTreeSet<String> {
        &self.course_codes
    }

    pub fn markers(&self) -> &BTreeSet<String> {
        &self.markers
    }
}

fn reset_for_moderation(exam: &mut ExamLedger, part_sum: &mut [i64], part_count: &mut [u32], index: usize) {
    part_sum[index] -= exam.kept_sum[index];
    part_count[index] -= exam.kept_count[index];
    exam.row_total -= exam.kept_sum[index];
    exam.kept_sum[index] = 0;
    exam.kept_count[index] = 0;
    exam.issues.remove(&index);
    exam.marks[index].clear();
    exam.moderated.insert(index);
}

fn record_mark(
    exam: &mut ExamLedger,
    part_sum: &mut [i64],
    part_count: &mut [u32],
    part: &PartDefinition,
    value: String,
    origin: Origin,
) {
    let i = part.index;
    match value.parse::<i64>() {
        Ok(mark) => {
            if mark > i64::from(part.max_marks) {
                exam.issues.insert(i, IssueKind::ExceedsMax(part.max_marks));
            }
            let sums = (
                exam.kept_sum[i].checked_add(mark),
                exam.row_total.checked_add(mark),
                part_sum[i].checked_add(mark),
            );
            if let (Some(kept), Some(row), Some(run)) = sums {
                exam.kept_sum[i] = kept;
                exam.kept_count[i] += 1;
                exam.row_total = row;
                part_sum[i] = run;
                part_count[i] += 1;
            } else {
                // listed and flagged, but left out of every total
                warn!(part = %part.name, value = %value, "mark too large to add to the totals");
                exam.issues.insert(i, IssueKind::ExceedsMax(part.max_marks));
            }
        }
        Err(_) => {
            exam.issues.insert(i, IssueKind::NonIntegerMark);
        }
    }
    exam.marks[i].push(MarkEntry { value, origin });
}
