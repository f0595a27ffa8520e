use super::{types::ScriptDump, FormSource};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a JSON array of script dumps written by the PDF extraction step.
pub struct JsonDumpSource {
    path: PathBuf,
}

impl JsonDumpSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl FormSource for JsonDumpSource {
    fn scripts(&self) -> Result<Vec<ScriptDump>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading script dump: {}", self.path.display()))?;
        let scripts: Vec<ScriptDump> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing script dump: {}", self.path.display()))?;
        debug!("loaded {} scripts from {}", scripts.len(), self.path.display());
        Ok(scripts)
    }
}
