use crate::{
    config::Config,
    extract::json::JsonDumpSource,
    field_key::FieldKeyDecoder,
    pipeline::Pipeline,
    record::load_records,
    scheme::MarkingScheme,
    util::{ensure_dir, file_stamp, now_rfc3339, sha256_hex, stamped_name},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "mark-check")]
#[command(about = "Deterministic exam-script mark summary (form field decoding + moderation + validation)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./mark-check.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the mark summary for a batch of scripts.
    Summarize {
        /// JSON array of extracted scripts (path, page_text, fields).
        #[arg(long, required_unless_present = "records", conflicts_with = "records")]
        scripts: Option<PathBuf>,
        /// JSON array of already flattened form records.
        #[arg(long)]
        records: Option<PathBuf>,
        #[arg(long)]
        parts: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Show how a form field key is decoded.
    Decode {
        #[arg(long)]
        key: String,
    },
    /// Show the parsed marking scheme.
    Scheme {
        #[arg(long)]
        parts: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(p) => Config::load(&p)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Summarize {
            scripts,
            records,
            parts,
            out_dir,
        } => {
            let input = scripts
                .as_deref()
                .or(records.as_deref())
                .ok_or_else(|| anyhow!("one of --scripts or --records is required"))?;
            let out_root = out_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
            let log_path = resolve_log_path(&cfg, &out_root);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            let parts_path = resolve_parts_path(&cfg, parts.as_deref(), input);
            summarize(&cfg, input, scripts.is_some(), &parts_path, &out_root)
        }
        Command::Decode { key } => {
            let _guard = init_logging(&args, &cfg, None)?;
            decode(key)
        }
        Command::Scheme { parts } => {
            let _guard = init_logging(&args, &cfg, None)?;
            let path = parts
                .clone()
                .unwrap_or_else(|| PathBuf::from(&cfg.paths.parts_csv));
            let scheme = MarkingScheme::load(&path)?;
            println!("{}", serde_json::to_string_pretty(&scheme)?);
            Ok(())
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["mark-check.toml", "mark-check.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// `--parts` wins; otherwise the configured path, then a file of the same
/// name next to the input.
fn resolve_parts_path(cfg: &Config, user: Option<&Path>, input: &Path) -> PathBuf {
    if let Some(p) = user {
        return p.to_path_buf();
    }
    let configured = PathBuf::from(&cfg.paths.parts_csv);
    if configured.exists() {
        return configured;
    }
    let beside = input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(configured.file_name().unwrap_or(configured.as_os_str()));
    if beside.exists() { beside } else { configured }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = if args.log_level.is_some() {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // a subscriber installed earlier in the process keeps receiving events
    if tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return Ok(None);
    }

    Ok(guard)
}

fn decode(key: &str) -> Result<()> {
    let decoder = FieldKeyDecoder::new()?;
    let decoded = decoder.decode(key);
    let kind = decoded.as_ref().map(|d| decoder.classify(&d.base));
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "key": key,
            "decoded": decoded,
            "kind": kind,
            "marker": decoder.marker_override(key),
        }))?
    );
    Ok(())
}

fn summarize(
    cfg: &Config,
    input: &Path,
    is_script_dump: bool,
    parts_path: &Path,
    out_root: &Path,
) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }
    let scheme = MarkingScheme::load(parts_path)?;
    info!("marking scheme {} with {} parts", parts_path.display(), scheme.len());

    let started = now_rfc3339();
    let pipeline = Pipeline::new(cfg)?;
    let records = if is_script_dump {
        pipeline.collect_records(&JsonDumpSource::new(input))?
    } else {
        load_records(input)?
    };
    let result = pipeline.run(records, &scheme)?;

    ensure_dir(out_root)?;
    let stamp = cfg
        .output
        .timestamped
        .then(|| file_stamp(time::OffsetDateTime::now_utc()));
    let stamp = stamp.as_deref();

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(out_root.join("effective-config.toml"), raw)?;
    }

    let summary_name = stamped_name(&cfg.output.summary_stem, stamp, "csv");
    write_file(&out_root.join(&summary_name), &result.summary_csv)?;
    info!("wrote {}", out_root.join(&summary_name).display());

    let raw_name = stamped_name(&cfg.output.raw_values_stem, stamp, "csv");
    if cfg.output.write_raw_values {
        write_file(&out_root.join(&raw_name), &result.raw_values_csv)?;
    }

    let report_name = stamped_name(&cfg.output.report_stem, stamp, "json");
    if cfg.output.write_report_json {
        write_file(
            &out_root.join(&report_name),
            &serde_json::to_string_pretty(&result.summary)?,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "course_code": result.summary.course_code,
            "started": started,
            "finished": now_rfc3339(),
            "parts": parts_path,
            "input": input,
            "records": result.records.len(),
            "records_sha256": result.records_sha256,
            "summary": summary_name,
            "summary_sha256": sha256_hex(result.summary_csv.as_bytes()),
            "raw_values": cfg.output.write_raw_values.then_some(&raw_name),
            "report": cfg.output.write_report_json.then_some(&report_name),
        });
        write_file(&out_root.join("index.json"), &serde_json::to_string_pretty(&index)?)?;
    }

    if result.summary.markers.is_empty() {
        warn!("no marker initials found on any script");
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "course_code": result.summary.course_code,
                "out_dir": out_root,
                "summary": summary_name,
                "scripts": result.summary.rows.len(),
                "marked": result.summary.stats.marked_scripts,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

fn resolve_log_path(cfg: &Config, out_root: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(out_root.join("mark-check.log"))
}
