use crate::{
    ledger::MarkLedger,
    report::{Classification, MarkSummary, PaperStats, PartStats, ReportRow},
    validation::{validate_exam, Verdict},
};

pub fn build_summary(ledger: &MarkLedger<'_>) -> MarkSummary {
    let scheme = ledger.scheme();
    let mut rows = Vec::new();

    for (exam_number, exam) in ledger.exams() {
        let row = match validate_exam(exam, scheme, ledger) {
            Verdict::Unmarked => ReportRow {
                exam_number: exam_number.to_string(),
                cells: Vec::new(),
                total: 0,
                issues: Vec::new(),
                validation: String::new(),
                unmarked_pages: Vec::new(),
                bad_pages: Vec::new(),
                classification: Classification::Unmarked,
            },
            Verdict::Checked(issues) => {
                let cells = scheme
                    .parts()
                    .iter()
                    .map(|p| {
                        exam.entries(p.index)
                            .iter()
                            .map(|e| e.value.as_str())
                            .collect::<Vec<_>>()
                            .join(" + ")
                    })
                    .collect();
                let validation = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                let unmarked_pages = exam.unmarked_pages();
                let classification = if validation.is_empty() && unmarked_pages.is_empty() {
                    Classification::Valid
                } else {
                    Classification::Invalid
                };
                ReportRow {
                    exam_number: exam_number.to_string(),
                    cells,
                    total: exam.row_total(),
                    issues,
                    validation,
                    unmarked_pages,
                    bad_pages: exam.bad_pages(),
                    classification,
                }
            }
        };
        rows.push(row);
    }

    let stats = paper_stats(ledger, &rows);
    MarkSummary {
        course_code: ledger.course_codes().iter().next().cloned().unwrap_or_default(),
        markers: ledger.markers().iter().filter(|m| !m.is_empty()).cloned().collect(),
        stats,
        rows,
    }
}

fn paper_stats(ledger: &MarkLedger<'_>, rows: &[ReportRow]) -> PaperStats {
    let scheme = ledger.scheme();
    let marked: Vec<&ReportRow> = rows
        .iter()
        .filter(|r| r.classification != Classification::Unmarked)
        .collect();
    let n = marked.len();

    let parts = scheme
        .parts()
        .iter()
        .map(|p| {
            let mean = if n > 0 && ledger.part_count(p.index) > 0 {
                Some(ledger.part_sum(p.index) as f64 / n as f64)
            } else {
                None
            };
            PartStats {
                name: p.name.clone(),
                max_marks: p.max_marks,
                mean,
                mean_percent: mean.map(|m| m * 100.0 / f64::from(p.max_marks)),
            }
        })
        .collect();

    let total_marks = scheme.total_marks();
    let mean = (n > 0).then(|| marked.iter().map(|r| r.total as f64).sum::<f64>() / n as f64);
    let mean_percent = mean
        .filter(|_| total_marks > 0)
        .map(|m| m * 100.0 / f64::from(total_marks));

    PaperStats {
        parts,
        total_marks,
        marked_scripts: n,
        mean,
        mean_percent,
    }
}
