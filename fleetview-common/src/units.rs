//! Unit conversion shared by every CPU, memory and pod display
//!
//! Raw values arrive either as plain numbers (metrics, already in base
//! units: bytes or cores) or as Kubernetes quantity strings (annotations,
//! e.g. `"1500m"`, `"7.5Gi"`). Both paths end up in [`to_unit`] so that a
//! figure renders the same way wherever it appears.

use std::fmt;

const KI: f64 = 1024.0;
const MI: f64 = KI * 1024.0;
const GI: f64 = MI * 1024.0;
const TI: f64 = GI * 1024.0;

/// Display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// CPU cores; base values pass through
    Core,
    /// Gibibytes from bytes
    Gi,
    /// Mebibytes from bytes
    Mi,
    /// Unitless count (pods)
    Count,
}

impl Unit {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::Gi => "Gi",
            Self::Mi => "Mi",
            Self::Count => "",
        }
    }

    fn divisor(&self) -> f64 {
        match self {
            Self::Core | Self::Count => 1.0,
            Self::Gi => GI,
            Self::Mi => MI,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// Parse a Kubernetes quantity into base units (bytes or cores).
///
/// Accepts binary (`Ki`..`Ei`) and decimal (`n`, `u`, `m`, `k`..`E`)
/// suffixes as well as plain and exponent notation. Returns `None` for
/// anything else, including empty strings.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    const BINARY: [(&str, f64); 6] = [
        ("Ki", KI),
        ("Mi", MI),
        ("Gi", GI),
        ("Ti", TI),
        ("Pi", TI * KI),
        ("Ei", TI * MI),
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some((number, multiplier)) = BINARY
        .iter()
        .find_map(|(suffix, mult)| raw.strip_suffix(suffix).map(|n| (n, *mult)))
    {
        let value: f64 = number.parse().ok()?;
        return finite(value * multiplier);
    }

    let exponent = match raw.chars().last() {
        Some('n') => -9,
        Some('u') => -6,
        Some('m') => -3,
        Some('k') => 3,
        Some('M') => 6,
        Some('G') => 9,
        Some('T') => 12,
        Some('P') => 15,
        Some('E') => 18,
        _ => return finite(raw.parse().ok()?),
    };

    let value: f64 = raw[..raw.len() - 1].parse().ok()?;
    if exponent < 0 {
        finite(value / 10f64.powi(-exponent))
    } else {
        finite(value * 10f64.powi(exponent))
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Round to two decimals; non-finite input becomes zero
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// Convert a base-unit value to `unit`, rounded to two decimals
pub fn to_unit(base: f64, unit: Unit) -> f64 {
    round2(base / unit.divisor())
}

/// Convert a quantity string to `unit`
pub fn quantity_to_unit(raw: &str, unit: Unit) -> Option<f64> {
    parse_quantity(raw).map(|base| to_unit(base, unit))
}

/// Render a number with at most two decimals and no trailing zeros
pub fn format_number(value: f64) -> String {
    let text = format!("{:.2}", round2(value));
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Render `used/total Unit`, e.g. `3.8/4 Core`
pub fn format_pair(used: f64, total: f64, unit: Unit) -> String {
    match unit {
        Unit::Count => format!("{}/{}", format_number(used), format_number(total)),
        _ => format!(
            "{}/{} {}",
            format_number(used),
            format_number(total),
            unit.suffix()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity_suffixes() {
        assert_eq!(parse_quantity("1500m"), Some(1.5));
        assert_eq!(parse_quantity("2"), Some(2.0));
        assert_eq!(parse_quantity("1Gi"), Some(GI));
        assert_eq!(parse_quantity("512Mi"), Some(512.0 * MI));
        assert_eq!(parse_quantity("1e3"), Some(1000.0));
        assert_eq!(parse_quantity("2k"), Some(2000.0));
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("abc"), None);
        assert_eq!(parse_quantity("12Qi"), None);
    }

    #[test]
    fn test_bytes_to_gi() {
        assert_eq!(to_unit(16.0 * GI, Unit::Gi), 16.0);
        assert_eq!(to_unit(1.5 * GI, Unit::Gi), 1.5);
        assert_eq!(to_unit(3.0, Unit::Core), 3.0);
    }

    #[test]
    fn test_non_finite_rounds_to_zero() {
        assert_eq!(round2(f64::NAN), 0.0);
        assert_eq!(round2(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_format_number_trims() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(3.8), "3.8");
        assert_eq!(format_number(15.634), "15.63");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn test_format_pair() {
        assert_eq!(format_pair(3.8, 4.0, Unit::Core), "3.8/4 Core");
        assert_eq!(format_pair(12.0, 110.0, Unit::Count), "12/110");
    }
}
