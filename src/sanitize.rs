use crate::config::Config;
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Cleans mark values typed into form fields. Some viewers store the UTF-16
/// byte order mark as Latin-1 text (`þÿ`) in front of the value, and
/// full-width digits show up from some input methods.
#[derive(Debug, Clone)]
pub struct ValueSanitizer {
    normalize_unicode: bool,
    strip: BTreeSet<char>,
}

impl ValueSanitizer {
    pub fn new(cfg: &Config) -> Self {
        Self::with_codepoints(cfg.input.normalize_unicode, &cfg.input.strip_codepoints)
    }

    pub fn with_codepoints(normalize_unicode: bool, codepoints: &[u32]) -> Self {
        Self {
            normalize_unicode,
            strip: codepoints.iter().filter_map(|&cp| char::from_u32(cp)).collect(),
        }
    }

    pub fn clean(&self, raw: &str) -> String {
        let normalized = if self.normalize_unicode {
            raw.nfkc().collect::<String>()
        } else {
            raw.to_string()
        };

        normalized
            .trim_matches(|ch: char| self.strip.contains(&ch) || ch.is_whitespace())
            .to_string()
    }
}

impl Default for ValueSanitizer {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
