//! Display formats for metric values.
//!
//! Callers pass the short format strings they already use for
//! `tabulate`-style tables (`".3f"`, `".2e"`, `"g"`). [`FormatSpec`] parses
//! them, and [`FormatPolicy`] maps metric names to a spec with a documented
//! fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{LogError, LogResult};

/// Precision used when a specifier carries a type but no precision (`"f"`, `"g"`).
pub const DEFAULT_PRECISION: usize = 6;

/// How a single metric value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FormatSpec {
    /// Fixed-point with N decimals (`.Nf`).
    Fixed(usize),
    /// Scientific with N mantissa decimals and a signed two-digit exponent (`.Ne`).
    Exponent(usize),
    /// Shortest of fixed/scientific with N significant digits (`.Ng`).
    General(usize),
    /// Value times 100 with N decimals and a `%` suffix (`.N%`).
    Percent(usize),
    /// Rounded to the nearest integer (`d`).
    Integer,
}

impl FormatSpec {
    /// Render `value` according to this spec.
    pub fn format(&self, value: f64) -> String {
        if value.is_nan() {
            return "nan".to_string();
        }
        if value.is_infinite() {
            return if value > 0.0 { "inf" } else { "-inf" }.to_string();
        }

        match *self {
            Self::Fixed(precision) => format!("{:.*}", precision, value),
            Self::Exponent(precision) => format_exponent(value, precision),
            Self::General(precision) => format_general(value, precision.max(1)),
            Self::Percent(precision) => format!("{:.*}%", precision, value * 100.0),
            Self::Integer => format!("{:.0}", value),
        }
    }
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(p) => write!(f, ".{p}f"),
            Self::Exponent(p) => write!(f, ".{p}e"),
            Self::General(p) => write!(f, ".{p}g"),
            Self::Percent(p) => write!(f, ".{p}%"),
            Self::Integer => write!(f, "d"),
        }
    }
}

impl FromStr for FormatSpec {
    type Err = LogError;

    fn from_str(spec: &str) -> LogResult<Self> {
        let invalid = |message: &str| LogError::InvalidFormat {
            spec: spec.to_string(),
            message: message.to_string(),
        };

        let trimmed = spec.trim();
        let kind = trimmed
            .chars()
            .last()
            .ok_or_else(|| invalid("empty specifier"))?;
        let body = &trimmed[..trimmed.len() - kind.len_utf8()];

        let precision = match body {
            "" => None,
            _ => {
                let digits = body
                    .strip_prefix('.')
                    .ok_or_else(|| invalid("precision must start with '.'"))?;
                let parsed = digits
                    .parse::<usize>()
                    .map_err(|_| invalid("precision is not a number"))?;
                Some(parsed)
            }
        };

        match kind {
            'f' | 'F' => Ok(Self::Fixed(precision.unwrap_or(DEFAULT_PRECISION))),
            'e' | 'E' => Ok(Self::Exponent(precision.unwrap_or(DEFAULT_PRECISION))),
            'g' | 'G' => Ok(Self::General(precision.unwrap_or(DEFAULT_PRECISION))),
            '%' => Ok(Self::Percent(precision.unwrap_or(DEFAULT_PRECISION))),
            'd' if precision.is_none() => Ok(Self::Integer),
            'd' => Err(invalid("integer format takes no precision")),
            other => Err(invalid(format!("unknown format type '{other}'").as_str())),
        }
    }
}

impl TryFrom<String> for FormatSpec {
    type Error = LogError;

    fn try_from(value: String) -> LogResult<Self> {
        value.parse()
    }
}

impl From<FormatSpec> for String {
    fn from(spec: FormatSpec) -> Self {
        spec.to_string()
    }
}

/// Split Rust's `1.5e-3` rendering into mantissa and exponent.
fn split_exponent(rendered: &str) -> Option<(&str, i32)> {
    let (mantissa, exp) = rendered.split_once('e')?;
    Some((mantissa, exp.parse().ok()?))
}

fn join_exponent(mantissa: &str, exp: i32) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

fn format_exponent(value: f64, precision: usize) -> String {
    let rendered = format!("{:.*e}", precision, value);
    match split_exponent(&rendered) {
        Some((mantissa, exp)) => join_exponent(mantissa, exp),
        None => rendered,
    }
}

fn trim_fraction(rendered: &str) -> &str {
    if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.')
    } else {
        rendered
    }
}

fn format_general(value: f64, precision: usize) -> String {
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exp)) = split_exponent(&scientific) else {
        return scientific;
    };

    if exp >= -4 && (exp as i64) < precision as i64 {
        let decimals = (precision as i64 - 1 - exp as i64).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    } else {
        join_exponent(trim_fraction(mantissa), exp)
    }
}

/// Per-metric format overrides with an explicit default.
///
/// Metrics without an override use `default`, which is `.1f` unless the
/// caller configures something else.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatPolicy {
    pub default: FormatSpec,
    pub overrides: HashMap<String, FormatSpec>,
}

impl FormatPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a policy from `(metric, specifier)` string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> LogResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut policy = Self::new();
        for (name, spec) in pairs {
            policy.overrides.insert(name.into(), spec.as_ref().parse()?);
        }
        Ok(policy)
    }

    pub fn with_default(mut self, spec: FormatSpec) -> Self {
        self.default = spec;
        self
    }

    pub fn with_override(mut self, name: impl Into<String>, spec: FormatSpec) -> Self {
        self.overrides.insert(name.into(), spec);
        self
    }

    /// The spec that applies to `name`.
    pub fn resolve(&self, name: &str) -> FormatSpec {
        self.overrides.get(name).copied().unwrap_or(self.default)
    }

    pub fn format(&self, name: &str, value: f64) -> String {
        self.resolve(name).format(value)
    }
}
