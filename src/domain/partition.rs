//! Partition keys and their ledger encoding.
//!
//! A partition key is a strict refinement chain: `(university, year)` at the
//! root, with zero or more `(kind, value)` refinements appended. The encoded
//! form is one bracketed, pipe-delimited line per key, grep-able in the
//! progress file, and unambiguous even when a name field contains the
//! delimiter characters themselves.

use std::fmt;

use crate::domain::dimensions::{DimensionValue, RefinementKind};
use crate::error::{HarvestError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub university: DimensionValue,
    pub year: String,
    pub refinements: Vec<(RefinementKind, DimensionValue)>,
}

impl PartitionKey {
    pub fn new(university: DimensionValue, year: impl Into<String>) -> Self {
        Self {
            university,
            year: year.into(),
            refinements: Vec::new(),
        }
    }

    /// A more specific key with one refinement value appended.
    pub fn refine(&self, kind: RefinementKind, value: DimensionValue) -> Self {
        let mut refined = self.clone();
        refined.refinements.push((kind, value));
        refined
    }

    /// Proper prefixes of the refinement chain, most general first. An
    /// ancestor marked crawled subsumes this key.
    pub fn ancestors(&self) -> Vec<PartitionKey> {
        (0..self.refinements.len())
            .map(|depth| Self {
                university: self.university.clone(),
                year: self.year.clone(),
                refinements: self.refinements[..depth].to_vec(),
            })
            .collect()
    }

    pub fn self_and_ancestors(&self) -> Vec<PartitionKey> {
        let mut keys = self.ancestors();
        keys.push(self.clone());
        keys
    }

    /// How many refinement levels have been applied.
    pub fn depth(&self) -> usize {
        self.refinements.len()
    }

    /// Single-line ledger encoding: `[uniId|uniName|year]` extended with
    /// `|tag:valueId|valueName` per refinement. Delimiter characters inside
    /// fields are backslash-escaped.
    pub fn encode(&self) -> String {
        let mut segments = vec![
            escape(&self.university.id),
            escape(&self.university.name),
            escape(&self.year),
        ];
        for (kind, value) in &self.refinements {
            segments.push(format!("{}:{}", kind.tag(), escape(&value.id)));
            segments.push(escape(&value.name));
        }
        format!("[{}]", segments.join("|"))
    }

    /// Inverse of [`encode`]. Rejects anything that is not a well-formed
    /// key line.
    pub fn decode(encoded: &str) -> Result<Self> {
        let inner = encoded
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| malformed(encoded, "missing brackets"))?;

        let segments = split_unescaped(inner);
        if segments.len() < 3 || segments.len() % 2 == 0 {
            return Err(malformed(encoded, "wrong segment count"));
        }

        let mut key = Self {
            university: DimensionValue::new(segments[0].clone(), segments[1].clone()),
            year: segments[2].clone(),
            refinements: Vec::new(),
        };
        for pair in segments[3..].chunks(2) {
            let (tag, id) = pair[0]
                .split_once(':')
                .ok_or_else(|| malformed(encoded, "refinement id missing kind tag"))?;
            let kind = RefinementKind::from_tag(tag)
                .ok_or_else(|| malformed(encoded, "unknown refinement kind"))?;
            key.refinements
                .push((kind, DimensionValue::new(id, pair[1].clone())));
        }
        Ok(key)
    }

    /// Short human-readable form for log lines.
    pub fn describe(&self) -> String {
        let mut parts = vec![self.university.name.clone(), self.year.clone()];
        for (kind, value) in &self.refinements {
            parts.push(format!("{}={}", kind.label(), value.name));
        }
        parts.join(" | ")
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn malformed(encoded: &str, reason: &str) -> HarvestError {
    HarvestError::PageParse(format!("malformed partition key {encoded:?}: {reason}"))
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if matches!(c, '\\' | '|' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Splits on unescaped `|`, unescaping each segment as it goes.
fn split_unescaped(inner: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '|' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uni() -> DimensionValue {
        DimensionValue::new("10", "Example University")
    }

    #[test]
    fn encodes_root_key_grep_ably() {
        let key = PartitionKey::new(uni(), "2020");
        assert_eq!(key.encode(), "[10|Example University|2020]");
    }

    #[test]
    fn encodes_refinement_chain_with_kind_tags() {
        let key = PartitionKey::new(uni(), "2020")
            .refine(RefinementKind::ThesisType, DimensionValue::new("1", "Doktora"))
            .refine(RefinementKind::Institute, DimensionValue::new("5", "Fen Bilimleri"));
        assert_eq!(
            key.encode(),
            "[10|Example University|2020|tur:1|Doktora|ens:5|Fen Bilimleri]"
        );
    }

    #[test]
    fn round_trips_delimiter_heavy_names() {
        let key = PartitionKey::new(DimensionValue::new("7", r"Pipe|And[Bracket]\Uni"), "1999")
            .refine(
                RefinementKind::Subject,
                DimensionValue::new("3", "Fizik | Astronomi"),
            );
        let decoded = PartitionKey::decode(&key.encode()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn distinct_keys_never_collide() {
        // A name containing the delimiter must not be mistaken for a key
        // boundary with a different refinement.
        let tricky = PartitionKey::new(DimensionValue::new("1", "A|2020"), "2021");
        let plain = PartitionKey::new(DimensionValue::new("1", "A"), "2020")
            .refine(RefinementKind::Institute, DimensionValue::new("2", "B"));
        assert_ne!(tricky.encode(), plain.encode());
    }

    #[test]
    fn ancestors_are_proper_prefixes() {
        let key = PartitionKey::new(uni(), "2020")
            .refine(RefinementKind::ThesisType, DimensionValue::new("1", "Doktora"))
            .refine(RefinementKind::Institute, DimensionValue::new("5", "Fen"));
        let ancestors = key.ancestors();
        assert_eq!(ancestors.len(), 2);
        assert_eq!(ancestors[0].depth(), 0);
        assert_eq!(ancestors[1].depth(), 1);
        assert_eq!(ancestors[1].refinements[0].1.name, "Doktora");
    }

    #[test]
    fn rejects_garbage() {
        assert!(PartitionKey::decode("not a key").is_err());
        assert!(PartitionKey::decode("[only|two]").is_err());
        assert!(PartitionKey::decode("[1|U|2020|noTag|X]").is_err());
    }

    fn field() -> impl Strategy<Value = String> {
        // Hostile inputs: delimiter and escape characters mixed with text.
        proptest::string::string_regex(r#"[a-zA-Z0-9 \\\|\[\]:]{0,24}"#).unwrap()
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            uni_id in field(),
            uni_name in field(),
            year in field(),
            inst_name in field(),
        ) {
            let key = PartitionKey::new(DimensionValue::new(uni_id, uni_name), year)
                .refine(RefinementKind::Institute, DimensionValue::new("9", inst_name));
            let decoded = PartitionKey::decode(&key.encode()).unwrap();
            prop_assert_eq!(decoded, key);
        }
    }
}
