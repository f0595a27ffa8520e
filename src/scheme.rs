use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDefinition {
    pub index: usize,
    pub name: String,
    pub max_marks: u32,
}

/// Ordered parts of a paper. The position of a part is the number encoded in
/// `qn-part-mark-<N>` and `qn-part-moderate-<N>` field keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingScheme {
    parts: Vec<PartDefinition>,
}

impl MarkingScheme {
    pub fn from_parts<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        for (index, (name, max_marks)) in parts.into_iter().enumerate() {
            let name = name.into();
            if name.is_empty() {
                bail!("part {index} has no name");
            }
            if max_marks == 0 {
                bail!("part {name} must be worth at least one mark");
            }
            if !seen.insert(name.clone()) {
                bail!("duplicate part name: {name}");
            }
            out.push(PartDefinition {
                index,
                name,
                max_marks,
            });
        }
        Ok(Self { parts: out })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading parts and marks: {}", path.display()))?;
        Self::parse_csv(&raw).with_context(|| format!("parsing parts and marks: {}", path.display()))
    }

    /// Two columns, part name then integer maximum. A first row whose
    /// second column is not a number is taken as the header.
    pub fn parse_csv(raw: &str) -> Result<Self> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut parts = Vec::new();
        let mut first_row = true;

        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let is_first = std::mem::replace(&mut first_row, false);
            let cells = split_csv_line(line);
            let name = cells.first().map(|c| c.trim()).unwrap_or_default();
            let marks = cells.get(1).map(|c| c.trim()).unwrap_or_default();

            match marks.parse::<u32>() {
                Ok(m) => parts.push((name.to_string(), m)),
                Err(_) if is_first => continue,
                Err(_) => {
                    return Err(anyhow!(
                        "line {}: marks for part {:?} is not a whole number: {:?}",
                        lineno + 1,
                        name,
                        marks
                    ));
                }
            }
        }

        if parts.is_empty() {
            bail!("marking scheme has no parts");
        }
        Self::from_parts(parts)
    }

    pub fn parts(&self) -> &[PartDefinition] {
        &self.parts
    }

    pub fn part(&self, index: usize) -> Option<&PartDefinition> {
        self.parts.get(index)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn total_marks(&self) -> u32 {
        self.parts.iter().map(|p| p.max_marks).sum()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }
}

/// Splits one CSV line, honouring double-quoted cells and `""` escapes.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut cur)),
            '\r' if !quoted => {}
            _ => cur.push(ch),
        }
    }
    cells.push(cur);
    cells
}
