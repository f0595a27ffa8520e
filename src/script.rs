use crate::{
    config::Config,
    extract::{ScriptDump, ScriptHeader},
    field_key::FieldKeyDecoder,
    record::FormFieldRecord,
};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

// The cover block printed on page 0 of every script reads:
//   <COURSE> ... <EXAM NUMBER>
//   <MARKER INITIALS>
const COURSE_CODE_PATTERN: &str = r"([a-zA-Z0-9]+) ";
const EXAM_NUMBER_PATTERN: &str = r" ([a-zA-Z0-9]+)\n";
const MARKER_PATTERN: &str = r".*\n([a-zA-Z]+)\n";

pub struct ScriptReader {
    course_code: Regex,
    exam_number: Regex,
    marker: Regex,
    filename: Option<Regex>,
    decoder: FieldKeyDecoder,
}

impl ScriptReader {
    pub fn new(cfg: &Config) -> Result<Self> {
        let filename = if cfg.input.require_exam_filename {
            Some(Regex::new(&cfg.input.exam_filename_pattern).with_context(|| {
                format!("invalid input.exam_filename_pattern: {}", cfg.input.exam_filename_pattern)
            })?)
        } else {
            None
        };
        Ok(Self {
            course_code: Regex::new(COURSE_CODE_PATTERN)?,
            exam_number: Regex::new(EXAM_NUMBER_PATTERN)?,
            marker: Regex::new(MARKER_PATTERN)?,
            filename,
            decoder: FieldKeyDecoder::new()?,
        })
    }

    pub fn header(&self, script: &ScriptDump) -> Result<ScriptHeader> {
        let first = script
            .page_text
            .get(&0)
            .ok_or_else(|| anyhow!("no text on the first page of {}", script.path))?;

        let course_code = first_capture(&self.course_code, first)
            .ok_or_else(|| anyhow!("no course code on the first page of {}", script.path))?;
        let exam_number = first_capture(&self.exam_number, first)
            .ok_or_else(|| anyhow!("no exam number on the first page of {}", script.path))?;
        let marker = first_capture(&self.marker, first).unwrap_or_default();

        Ok(ScriptHeader {
            course_code,
            exam_number,
            marker,
        })
    }

    /// Flattens one script into records. Returns `None` when the file name
    /// does not carry an exam number and such names are required.
    pub fn records(&self, script: &ScriptDump) -> Result<Option<Vec<FormFieldRecord>>> {
        let file_exam = match &self.filename {
            Some(re) => {
                let name = Path::new(&script.path)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(&script.path);
                match first_capture(re, name) {
                    Some(n) => Some(n),
                    None => {
                        warn!("malformed filename, skipping: {}", script.path);
                        return Ok(None);
                    }
                }
            }
            None => None,
        };

        let header = self.header(script)?;
        if let Some(file_exam) = file_exam.filter(|n| *n != header.exam_number) {
            warn!(
                "exam number mismatch: file {} is named for {} but the script says {}",
                script.path, file_exam, header.exam_number
            );
        }

        // A field-less header record keeps scripts without any overlay fields
        // in the summary.
        let mut out = vec![FormFieldRecord {
            exam_number: header.exam_number.clone(),
            marker: header.marker.clone(),
            course_code: header.course_code.clone(),
            field: String::new(),
            value: None,
        }];
        let mut filled = 0usize;
        for (key, value) in &script.fields {
            if !key.contains("page") {
                continue;
            }
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                filled += 1;
            }
            out.push(FormFieldRecord {
                exam_number: header.exam_number.clone(),
                marker: self
                    .decoder
                    .marker_override(key)
                    .unwrap_or_else(|| header.marker.clone()),
                course_code: header.course_code.clone(),
                field: key.clone(),
                value: value.clone(),
            });
        }

        debug!(
            "extracted {} filled entries for {} ({})",
            filled, header.exam_number, script.path
        );
        Ok(Some(out))
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
