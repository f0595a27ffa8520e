use crate::{
    field_key::FieldKeyDecoder,
    record::FormFieldRecord,
    report::{Classification, MarkSummary, ReportRow},
};
use anyhow::{Context, Result};
use std::io::Write;

/// Anything that accepts rows of cells. The summary layout is written against
/// this so the file format stays outside the engine.
pub trait TableSink {
    fn write_row(&mut self, cells: &[String]) -> Result<()>;
}

impl TableSink for Vec<Vec<String>> {
    fn write_row(&mut self, cells: &[String]) -> Result<()> {
        self.push(cells.to_vec());
        Ok(())
    }
}

pub struct CsvSink<W: Write> {
    out: W,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush().context("flushing csv output")?;
        Ok(self.out)
    }
}

impl<W: Write> TableSink for CsvSink<W> {
    fn write_row(&mut self, cells: &[String]) -> Result<()> {
        let line = cells.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(",");
        writeln!(self.out, "{line}").context("writing csv row")
    }
}

pub fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

const ROW_COLUMNS: [&str; 4] = ["Total", "Validation", "Unmarked Pages", "Bad Pages"];

pub fn write_summary(summary: &MarkSummary, sink: &mut dyn TableSink) -> Result<()> {
    let part_names: Vec<String> = summary.stats.parts.iter().map(|p| p.name.clone()).collect();

    sink.write_row(&cells(["Exam: ", summary.course_code.as_str()]))?;
    sink.write_row(&cells(["Marker: ", summary.markers.join(", ").as_str()]))?;
    sink.write_row(&[])?;

    let mut header = vec![String::new()];
    header.extend(part_names.iter().cloned());
    header.push("Total".into());
    sink.write_row(&header)?;

    let mut out_of = vec!["out of:".to_string()];
    out_of.extend(summary.stats.parts.iter().map(|p| p.max_marks.to_string()));
    out_of.push(summary.stats.total_marks.to_string());
    sink.write_row(&out_of)?;

    let mut means = vec!["mean:".to_string()];
    means.extend(summary.stats.parts.iter().map(|p| fmt_opt(p.mean, 2)));
    means.push(fmt_opt(summary.stats.mean, 2));
    sink.write_row(&means)?;

    let mut means_pc = vec!["mean (%):".to_string()];
    means_pc.extend(summary.stats.parts.iter().map(|p| fmt_opt(p.mean_percent, 1)));
    means_pc.push(fmt_opt(summary.stats.mean_percent, 1));
    sink.write_row(&means_pc)?;

    let mut row_header = vec!["Exam Number".to_string()];
    row_header.extend(part_names.iter().cloned());
    row_header.extend(ROW_COLUMNS.iter().map(|c| c.to_string()));

    for (class, title) in [
        (Classification::Invalid, "Validation problems"),
        (Classification::Valid, "Marking completed"),
    ] {
        sink.write_row(&[])?;
        sink.write_row(&[format!("{title} ({} scripts):", summary.count(class))])?;
        sink.write_row(&row_header)?;
        for row in summary.rows_in(class) {
            sink.write_row(&exam_row(row))?;
        }
    }

    sink.write_row(&[])?;
    sink.write_row(&[format!(
        "Yet to be marked ({} scripts):",
        summary.count(Classification::Unmarked)
    )])?;
    for row in summary.rows_in(Classification::Unmarked) {
        sink.write_row(std::slice::from_ref(&row.exam_number))?;
    }

    Ok(())
}

pub fn write_raw_values(
    records: &[FormFieldRecord],
    decoder: &FieldKeyDecoder,
    sink: &mut dyn TableSink,
) -> Result<()> {
    sink.write_row(&cells([
        "CourseCode",
        "Marker",
        "ExamNumber",
        "Page",
        "Field",
        "FieldName",
        "Value",
    ]))?;
    for r in records {
        let decoded = decoder.decode(&r.field);
        let marker = decoder.marker_override(&r.field).unwrap_or_else(|| r.marker.clone());
        sink.write_row(&[
            r.course_code.clone(),
            marker,
            r.exam_number.clone(),
            decoded.as_ref().map(|d| d.page.to_string()).unwrap_or_default(),
            r.field.clone(),
            decoded.map(|d| d.base).unwrap_or_default(),
            r.value.clone().unwrap_or_default(),
        ])?;
    }
    Ok(())
}

fn exam_row(row: &ReportRow) -> Vec<String> {
    let mut out = Vec::with_capacity(row.cells.len() + 5);
    out.push(row.exam_number.clone());
    out.extend(row.cells.iter().cloned());
    out.push(row.total.to_string());
    out.push(row.validation.clone());
    out.push(join_pages(&row.unmarked_pages));
    out.push(join_pages(&row.bad_pages));
    out
}

fn join_pages(pages: &[u32]) -> String {
    pages.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map(|x| format!("{x:.decimals$}")).unwrap_or_default()
}

fn cells<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
