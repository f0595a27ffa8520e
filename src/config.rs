use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub parts_csv: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            parts_csv: "parts_and_marks.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub normalize_unicode: bool,
    /// Code points trimmed from both ends of mark values.
    pub strip_codepoints: Vec<u32>,
    pub require_exam_filename: bool,
    pub exam_filename_pattern: String,
    pub canonical_order: bool,
}
impl Default for Input {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            strip_codepoints: vec![0x00FE, 0x00FF, 0x00F0, 0xFEFF, 0xFFFD, 0x0000],
            require_exam_filename: true,
            exam_filename_pattern: "(B[0-9]{6})-.*\\.pdf".into(),
            canonical_order: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_raw_values: bool,
    pub write_report_json: bool,
    pub write_index_json: bool,
    pub timestamped: bool,
    pub summary_stem: String,
    pub raw_values_stem: String,
    pub report_stem: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_raw_values: true,
            write_report_json: true,
            write_index_json: true,
            timestamped: true,
            summary_stem: "00_marks_summary".into(),
            raw_values_stem: "01_raw_form_values".into(),
            report_stem: "report".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
        }
    }
}
