use crate::{
    config::Config,
    extract::FormSource,
    field_key::FieldKeyDecoder,
    ledger::MarkLedger,
    record::{canonical_order, single_course_code, FormFieldRecord},
    render::{write_raw_values, write_summary, CsvSink},
    report::{Classification, MarkSummary},
    sanitize::ValueSanitizer,
    scheme::MarkingScheme,
    script::ScriptReader,
    summary::build_summary,
    util::sha256_hex,
};
use anyhow::Result;
use tracing::{debug, info};

pub struct Pipeline {
    cfg: Config,
    decoder: FieldKeyDecoder,
}

pub struct RunOutput {
    pub records: Vec<FormFieldRecord>,
    pub summary: MarkSummary,
    pub summary_csv: String,
    pub raw_values_csv: String,
    pub records_sha256: String,
}

impl Pipeline {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            cfg: cfg.clone(),
            decoder: FieldKeyDecoder::new()?,
        })
    }

    pub fn collect_records(&self, source: &dyn FormSource) -> Result<Vec<FormFieldRecord>> {
        let reader = ScriptReader::new(&self.cfg)?;
        let mut records = Vec::new();
        let mut scripts = 0usize;
        for script in source.scripts()? {
            if let Some(rs) = reader.records(&script)? {
                records.extend(rs);
                scripts += 1;
            }
        }
        info!("read {} records from {} scripts", records.len(), scripts);
        Ok(records)
    }

    pub fn run(&self, mut records: Vec<FormFieldRecord>, scheme: &MarkingScheme) -> Result<RunOutput> {
        let course = single_course_code(&records)?;
        info!("course={course} records={} parts={}", records.len(), scheme.len());

        if self.cfg.input.canonical_order {
            canonical_order(&mut records);
        }

        let mut ledger = MarkLedger::new(scheme, self.decoder.clone(), ValueSanitizer::new(&self.cfg));
        for r in &records {
            let applied = ledger.ingest(r);
            debug!(exam = %r.exam_number, field = %r.field, ?applied, "ingest");
        }

        let summary = build_summary(&ledger);
        info!(
            "invalid={} complete={} unmarked={}",
            summary.count(Classification::Invalid),
            summary.count(Classification::Valid),
            summary.count(Classification::Unmarked)
        );

        let mut sink = CsvSink::new(Vec::new());
        write_summary(&summary, &mut sink)?;
        let summary_csv = String::from_utf8(sink.into_inner()?)?;

        let mut sink = CsvSink::new(Vec::new());
        write_raw_values(&records, &self.decoder, &mut sink)?;
        let raw_values_csv = String::from_utf8(sink.into_inner()?)?;

        let records_sha256 = sha256_hex(serde_json::to_string(&records)?.as_bytes());

        Ok(RunOutput {
            records,
            summary,
            summary_csv,
            raw_values_csv,
            records_sha256,
        })
    }
}
