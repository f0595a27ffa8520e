pub mod json;
pub mod types;

use anyhow::Result;

pub use types::{ScriptDump, ScriptHeader};

/// Supplier of already-extracted scripts. Reading PDFs happens behind this.
pub trait FormSource {
    fn scripts(&self) -> Result<Vec<ScriptDump>>;
}
