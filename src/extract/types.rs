use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the PDF layer hands over for one script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptDump {
    pub path: String,
    /// Zero-based page index to extracted text.
    #[serde(default)]
    pub page_text: BTreeMap<u32, String>,
    /// Full field name to value; `null` when the field has no value object.
    #[serde(default)]
    pub fields: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHeader {
    pub course_code: String,
    pub exam_number: String,
    pub marker: String,
}
