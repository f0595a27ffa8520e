use mark_check::{
    config::Config,
    extract::{json::JsonDumpSource, FormSource, ScriptDump},
    pipeline::Pipeline,
    record::FormFieldRecord,
    report::Classification,
    scheme::MarkingScheme,
};
use std::collections::BTreeMap;

fn rec(exam: &str, course: &str, field: &str, value: &str) -> FormFieldRecord {
    FormFieldRecord {
        exam_number: exam.into(),
        marker: "AB".into(),
        course_code: course.into(),
        field: field.into(),
        value: Some(value.into()),
    }
}

fn batch() -> Vec<FormFieldRecord> {
    vec![
        rec("B100001", "MATH1", "page-000-qn-part-mark-0", "3"),
        rec("B100001", "MATH1", "page-001-qn-part-mark-0", "4"),
        rec("B100001", "MATH1", "page-000-qn-part-moderate-0", "5"),
        rec("B100001", "MATH1", "page-001-qn-part-mark-1", "2"),
        rec("B100002", "MATH1", "page-000-qn-part-mark-0", "1"),
        rec("B100002", "MATH1", "page-000-qn-part-mark-1", "x"),
        rec("B100002", "MATH1", "page-001-page-bad", "Yes"),
        rec("B100003", "MATH1", "page-000-page-seen", ""),
    ]
}

fn scheme() -> MarkingScheme {
    MarkingScheme::from_parts([("1a", 5), ("1b", 5)]).unwrap()
}

#[test]
fn reshuffled_input_gives_identical_output() {
    let p = Pipeline::new(&Config::default()).unwrap();
    let a = p.run(batch(), &scheme()).unwrap();

    let mut shuffled = batch();
    shuffled.reverse();
    shuffled.swap(1, 5);
    let b = p.run(shuffled, &scheme()).unwrap();

    assert_eq!(a.summary_csv, b.summary_csv);
    assert_eq!(a.raw_values_csv, b.raw_values_csv);
    assert_eq!(a.records_sha256, b.records_sha256);

    let row = a.summary.rows.iter().find(|r| r.exam_number == "B100001").unwrap();
    assert_eq!(row.cells, ["5", "2"]);
    assert_eq!(row.total, 7);
    assert_eq!(row.classification, Classification::Valid);
}

#[test]
fn multiple_courses_are_refused() {
    let p = Pipeline::new(&Config::default()).unwrap();
    let mut records = batch();
    records.push(rec("B100009", "CHEM2", "page-000-page-seen", "Yes"));
    let err = p.run(records, &scheme()).err().unwrap();
    assert!(format!("{err:#}").contains("multiple courses"));

    assert!(p.run(Vec::new(), &scheme()).is_err());
}

fn dump(path: &str, first_page: &str, fields: &[(&str, Option<&str>)]) -> ScriptDump {
    ScriptDump {
        path: path.into(),
        page_text: BTreeMap::from([(0, first_page.to_string())]),
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect(),
    }
}

#[test]
fn scripts_are_flattened_with_header_details() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scripts.json");
    let scripts = vec![
        dump(
            "batch/B100001-script.pdf",
            "MATH1 Exam B100001\nAB\nQuestion 1\n",
            &[
                ("page-000-qn-part-mark-0", Some("4")),
                ("marker_CD-page-001-qn-part-moderate-0", Some("5")),
                ("scan-perfect", Some("Yes")),
                ("page-001-page-seen", None),
            ],
        ),
        dump("batch/notes.pdf", "MATH1 Exam B100002\nAB\n", &[]),
        dump("batch/B100003-script.pdf", "MATH1 Exam B100003\nEF\n", &[]),
    ];
    std::fs::write(&path, serde_json::to_string(&scripts).unwrap()).unwrap();

    let source = JsonDumpSource::new(&path);
    assert_eq!(source.scripts().unwrap().len(), 3);

    let p = Pipeline::new(&Config::default()).unwrap();
    let records = p.collect_records(&source).unwrap();
    // header record + three page fields for the first script, header only for the last
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.course_code == "MATH1"));
    assert!(records.iter().all(|r| r.exam_number != "B100002"));
    let moderated = records.iter().find(|r| r.field.contains("moderate")).unwrap();
    assert_eq!(moderated.marker, "CD");

    let out = p.run(records, &scheme()).unwrap();
    assert_eq!(out.summary.course_code, "MATH1");
    assert_eq!(out.summary.markers, ["AB", "CD", "EF"]);
    let first = out.summary.rows.iter().find(|r| r.exam_number == "B100001").unwrap();
    assert_eq!(first.cells, ["5", ""]);
    assert_eq!(first.unmarked_pages, Vec::<u32>::new());
    let last = out.summary.rows.iter().find(|r| r.exam_number == "B100003").unwrap();
    assert_eq!(last.classification, Classification::Unmarked);
}

#[test]
fn missing_course_code_is_fatal() {
    let p = Pipeline::new(&Config::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scripts.json");
    let scripts = vec![dump("B100001-x.pdf", "no-header-here", &[])];
    std::fs::write(&path, serde_json::to_string(&scripts).unwrap()).unwrap();
    assert!(p.collect_records(&JsonDumpSource::new(&path)).is_err());
}
