use mark_check::{
    field_key::FieldKeyDecoder,
    ledger::{Applied, MarkLedger, Origin},
    record::FormFieldRecord,
    sanitize::ValueSanitizer,
    scheme::MarkingScheme,
};

fn rec(exam: &str, field: &str, value: &str) -> FormFieldRecord {
    FormFieldRecord {
        exam_number: exam.into(),
        marker: "AB".into(),
        course_code: "PHYS08001".into(),
        field: field.into(),
        value: Some(value.into()),
    }
}

fn scheme() -> MarkingScheme {
    MarkingScheme::from_parts([("1a", 5), ("1b", 10)]).unwrap()
}

fn ledger(scheme: &MarkingScheme) -> MarkLedger<'_> {
    MarkLedger::new(scheme, FieldKeyDecoder::new().unwrap(), ValueSanitizer::default())
}

fn values(l: &MarkLedger<'_>, exam: &str, part: usize) -> Vec<String> {
    l.exam(exam)
        .unwrap()
        .entries(part)
        .iter()
        .map(|e| e.value.clone())
        .collect()
}

#[test]
fn single_valid_mark() {
    let s = scheme();
    let mut l = ledger(&s);
    assert_eq!(l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "3")), Applied::Mark);

    let exam = l.exam("B100001").unwrap();
    assert_eq!(values(&l, "B100001", 0), ["3"]);
    assert_eq!(exam.row_total(), 3);
    assert!(exam.ingest_issues().is_empty());
    assert_eq!(l.part_sum(0), 3);
    assert_eq!(l.part_count(0), 1);
    assert_eq!(exam.page_interactions().get(&1), Some(&1));
}

#[test]
fn out_of_range_mark_still_counts() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "9"));
    let exam = l.exam("B100001").unwrap();
    assert_eq!(exam.row_total(), 9);
    assert_eq!(l.part_sum(0), 9);
    assert_eq!(exam.ingest_issues().get(&0).map(|k| k.to_string()).as_deref(), Some("max mark is 5"));
}

#[test]
fn non_integer_mark_takes_a_slot_but_adds_nothing() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-1", "2.5"));
    let exam = l.exam("B100001").unwrap();
    assert_eq!(values(&l, "B100001", 1), ["2.5"]);
    assert_eq!(exam.row_total(), 0);
    assert_eq!(l.part_count(1), 0);
    assert_eq!(exam.page_interactions().get(&1), Some(&1));
}

#[test]
fn moderation_replaces_original_marks() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100002", "page-000-qn-part-mark-0", "2"));
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "3"));
    l.ingest(&rec("B100001", "page-001-qn-part-mark-0", "4"));
    l.ingest(&rec("B100001", "page-001-qn-part-mark-1", "6"));
    assert_eq!(l.part_sum(0), 9);
    assert_eq!(l.part_count(0), 3);

    let applied = l.ingest(&rec("B100001", "marker_CD-page-001-qn-part-moderate-0", "5"));
    assert_eq!(applied, Applied::Moderation { reset: true });

    let exam = l.exam("B100001").unwrap();
    assert_eq!(values(&l, "B100001", 0), ["5"]);
    assert_eq!(exam.entries(0)[0].origin, Origin::Moderated);
    assert!(exam.is_moderated(0));
    assert!(!exam.is_moderated(1));
    assert_eq!(exam.row_total(), 11);
    // the other exam's contribution is untouched
    assert_eq!(l.part_sum(0), 7);
    assert_eq!(l.part_count(0), 2);
    assert!(l.markers().contains("CD"));
}

#[test]
fn moderation_reset_fires_once() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "3"));
    let first = l.ingest(&rec("B100001", "page-000-qn-part-moderate-0", "4"));
    let second = l.ingest(&rec("B100001", "page-000-qn-part-moderate-0", "4"));
    assert_eq!(first, Applied::Moderation { reset: true });
    assert_eq!(second, Applied::Moderation { reset: false });

    let exam = l.exam("B100001").unwrap();
    assert_eq!(values(&l, "B100001", 0), ["4", "4"]);
    assert_eq!(exam.row_total(), 8);
    assert_eq!(l.part_sum(0), 8);
    assert_eq!(l.part_count(0), 2);
}

#[test]
fn moderation_clears_the_original_issue() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "seven"));
    assert!(l.exam("B100001").unwrap().ingest_issues().contains_key(&0));
    l.ingest(&rec("B100001", "page-000-qn-part-moderate-0", "5"));
    assert!(l.exam("B100001").unwrap().ingest_issues().is_empty());
}

#[test]
fn pages_are_registered_even_without_values() {
    let s = scheme();
    let mut l = ledger(&s);
    let mut blank = rec("B100001", "page-002-page-seen", "");
    assert_eq!(l.ingest(&blank), Applied::PageOnly);
    blank.value = None;
    blank.field = "page-003-qn-part-mark-1".into();
    assert_eq!(l.ingest(&blank), Applied::PageOnly);
    l.ingest(&rec("B100001", "page-000-page-bad", "Yes"));
    l.ingest(&rec("B100001", "page-001-page-seen", "Yes"));

    let exam = l.exam("B100001").unwrap();
    assert_eq!(exam.unmarked_pages(), [3, 4]);
    assert_eq!(exam.bad_pages(), [1]);
    assert!(exam.has_interaction());
}

#[test]
fn artifacts_are_stripped_and_blank_marks_skipped() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "\u{fe}\u{ff}4 "));
    assert_eq!(l.ingest(&rec("B100001", "page-000-qn-part-mark-1", "\u{fe}\u{ff}  ")), Applied::PageOnly);

    assert_eq!(values(&l, "B100001", 0), ["4"]);
    assert!(values(&l, "B100001", 1).is_empty());
    assert_eq!(l.exam("B100001").unwrap().row_total(), 4);
}

#[test]
fn undecodable_and_unknown_parts_are_dropped() {
    let s = scheme();
    let mut l = ledger(&s);
    assert_eq!(l.ingest(&rec("B100001", "scan-perfect", "Yes")), Applied::Dropped);
    assert_eq!(l.ingest(&rec("B100001", "page-000-qn-part-mark-9", "1")), Applied::Dropped);
    let exam = l.exam("B100001").unwrap();
    assert_eq!(exam.row_total(), 0);
    assert!(!exam.has_interaction());
}

#[test]
fn huge_marks_do_not_overflow_the_totals() {
    let s = scheme();
    let mut l = ledger(&s);
    l.ingest(&rec("B100001", "page-000-qn-part-mark-0", "9223372036854775807"));
    assert_eq!(l.ingest(&rec("B100001", "page-000-qn-part-mark-1", "1")), Applied::Mark);

    let exam = l.exam("B100001").unwrap();
    assert_eq!(exam.row_total(), i64::MAX);
    assert_eq!(values(&l, "B100001", 1), ["1"]);
    assert_eq!(l.part_count(1), 0);
    assert_eq!(l.part_sum(1), 0);
    assert_eq!(exam.ingest_issues().get(&1).map(|k| k.to_string()).as_deref(), Some("max mark is 10"));
}
