//! Typed annotation parsing
//!
//! The platform stores a handful of display values (resource requests,
//! service type, owning workload) as annotation strings keyed by
//! convention. A schema type lists the keys it understands and turns each
//! into a typed field; everything it cannot place is reported, never fatal.

use std::collections::BTreeMap;

/// What a parse pass could not use
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Known keys absent from the record
    pub missing: Vec<&'static str>,
    /// Keys under a schema prefix that the schema does not know
    pub unknown: Vec<String>,
    /// Known keys whose value failed to parse, with the reason
    pub invalid: Vec<(String, String)>,
}

impl AnnotationReport {
    /// True when every known key was present and parsed
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

/// A typed view over a set of annotation keys
pub trait AnnotationSchema: Default {
    /// Key prefixes owned by this schema
    const PREFIXES: &'static [&'static str];

    /// Keys this schema maps to fields
    const KEYS: &'static [&'static str];

    /// Store one known key. Returning `Err` leaves the field unset.
    fn apply(&mut self, key: &str, value: &str) -> Result<(), String>;
}

/// Parse `raw` into `S`, collecting a report of unusable keys
pub fn parse_annotations<S: AnnotationSchema>(raw: &BTreeMap<String, String>) -> (S, AnnotationReport) {
    let mut parsed = S::default();
    let mut report = AnnotationReport::default();

    for (key, value) in raw {
        if S::KEYS.contains(&key.as_str()) {
            if let Err(reason) = parsed.apply(key, value) {
                report.invalid.push((key.clone(), reason));
            }
        } else if S::PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
            report.unknown.push(key.clone());
        }
    }

    report.missing = S::KEYS
        .iter()
        .copied()
        .filter(|key| !raw.contains_key(*key))
        .collect();

    (parsed, report)
}
