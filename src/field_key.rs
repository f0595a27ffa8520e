use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

const PAGE_KEY_PATTERN: &str = r"^.*page-([0-9]+)-(.*)$";
const MARKER_KEY_PATTERN: &str = r"marker_([a-zA-Z]+)";

const PAGE_BAD: &str = "page-bad";
const PAGE_SEEN: &str = "page-seen";
const MARK_PREFIX: &str = "qn-part-mark-";
const MODERATE_PREFIX: &str = "qn-part-moderate-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedKey {
    pub page: u32, // 1-based
    pub base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    PageBad,
    PageSeen,
    Mark(usize),
    Moderate(usize),
    Unrecognized,
}

impl FieldKind {
    pub fn part_index(&self) -> Option<usize> {
        match self {
            FieldKind::Mark(i) | FieldKind::Moderate(i) => Some(*i),
            _ => None,
        }
    }
}

/// Decodes the naming convention used by the marking overlays:
/// `[marker_<initials>-]page-<zero-based page>-<base field>`.
#[derive(Debug, Clone)]
pub struct FieldKeyDecoder {
    page_key: Regex,
    marker_key: Regex,
}

impl FieldKeyDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_key: Regex::new(PAGE_KEY_PATTERN)?,
            marker_key: Regex::new(MARKER_KEY_PATTERN)?,
        })
    }

    /// Returns `None` when the key carries no usable page number; callers
    /// drop such records without reporting them.
    pub fn decode(&self, key: &str) -> Option<DecodedKey> {
        let caps = self.page_key.captures(key)?;
        let zero_based: u32 = caps.get(1)?.as_str().parse().ok()?;
        let page = zero_based.checked_add(1)?;
        Some(DecodedKey {
            page,
            base: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }

    pub fn marker_override(&self, key: &str) -> Option<String> {
        self.marker_key
            .captures(key)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn classify(&self, base: &str) -> FieldKind {
        classify_base(base)
    }
}

pub fn classify_base(base: &str) -> FieldKind {
    if base == PAGE_BAD {
        return FieldKind::PageBad;
    }
    if base == PAGE_SEEN {
        return FieldKind::PageSeen;
    }
    if let Some(n) = base.strip_prefix(MODERATE_PREFIX) {
        return n
            .parse()
            .map(FieldKind::Moderate)
            .unwrap_or(FieldKind::Unrecognized);
    }
    if let Some(n) = base.strip_prefix(MARK_PREFIX) {
        return n
            .parse()
            .map(FieldKind::Mark)
            .unwrap_or(FieldKind::Unrecognized);
    }
    FieldKind::Unrecognized
}
