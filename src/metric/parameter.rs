//! Metric parameters and ordered parameter mappings

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Largest value accepted for a `Count` parameter.
pub const MAX_COUNT: u32 = 10_000;

/// Primitive a parameter value must coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    /// 8-digit calendar date, `YYYYMMDD`.
    Date,
    /// Small non-negative integer.
    Count,
}

/// Named key parameter of a metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricParameter {
    /// Single day, or open start of a `DATE`..`TO_DATE` range.
    Date,
    /// Start of a range.
    FromDate,
    /// End of a range (inclusive).
    ToDate,
    /// Maximum number of result entries.
    Limit,
}

impl MetricParameter {
    /// Get the parameter name (e.g. `FROM_DATE`).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::FromDate => "FROM_DATE",
            Self::ToDate => "TO_DATE",
            Self::Limit => "LIMIT",
        }
    }

    /// Get the primitive this parameter coerces to.
    #[must_use]
    pub const fn param_type(&self) -> ParameterType {
        match self {
            Self::Date | Self::FromDate | Self::ToDate => ParameterType::Date,
            Self::Limit => ParameterType::Count,
        }
    }

    /// `DATE` and `FROM_DATE` both open a date range.
    #[must_use]
    pub const fn is_range_start(&self) -> bool {
        matches!(self, Self::Date | Self::FromDate)
    }

    /// Whether a caller-supplied name fills this schema slot.
    ///
    /// Range starts are interchangeable, so the two-parameter form
    /// (`DATE`, `TO_DATE`) and the range form (`FROM_DATE`, `TO_DATE`) key
    /// the same kind.
    #[must_use]
    pub fn accepts(&self, supplied: Self) -> bool {
        (self.is_range_start() && supplied.is_range_start()) || *self == supplied
    }

    /// Coerce a raw value to its canonical text form.
    ///
    /// # Errors
    /// Returns `Error::ParameterTypeError` when the value is not a valid
    /// `YYYYMMDD` date (for dates) or a non-negative integer no larger than
    /// [`MAX_COUNT`] (for counts).
    pub fn coerce(&self, raw: &str) -> Result<String> {
        match self.param_type() {
            ParameterType::Date => parse_date(raw)
                .map(|_| raw.to_string())
                .map_err(|reason| self.type_error(raw, reason)),
            ParameterType::Count => match raw.parse::<u32>() {
                Ok(n) if n <= MAX_COUNT => Ok(n.to_string()),
                Ok(_) => Err(self.type_error(raw, format!("must not exceed {MAX_COUNT}"))),
                Err(e) => Err(self.type_error(raw, e.to_string())),
            },
        }
    }

    pub(crate) fn type_error(&self, raw: &str, reason: impl Into<String>) -> Error {
        Error::ParameterTypeError {
            parameter: self.name().to_string(),
            value: raw.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MetricParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricParameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DATE" => Ok(Self::Date),
            "FROM_DATE" => Ok(Self::FromDate),
            "TO_DATE" => Ok(Self::ToDate),
            "LIMIT" => Ok(Self::Limit),
            other => Err(Error::ParameterTypeError {
                parameter: other.to_string(),
                value: String::new(),
                reason: "unknown parameter name".to_string(),
            }),
        }
    }
}

/// Parse an 8-digit `YYYYMMDD` string into a calendar date.
///
/// # Errors
/// Returns a diagnostic if the text is not exactly 8 ASCII digits or does
/// not name a real calendar day.
pub fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected 8 digits YYYYMMDD".to_string());
    }
    let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().unwrap_or_default();
    let year = i32::try_from(field(0..4)).unwrap_or_default();
    NaiveDate::from_ymd_opt(year, field(4..6), field(6..8))
        .ok_or_else(|| "not a calendar date".to_string())
}

/// Format a date as `YYYYMMDD`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Ordered key → value parameters scoping one evaluation or cache lookup.
///
/// Built through a [`MetricKind`](super::MetricKind), so entries are in the
/// kind's schema order. Every value is coerced and every range is ordered,
/// also when the mapping is deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MappingRepr")]
pub struct ParameterMapping {
    metric: String,
    entries: Vec<(MetricParameter, String)>,
}

impl ParameterMapping {
    pub(crate) fn new(metric: impl Into<String>, entries: Vec<(MetricParameter, String)>) -> Self {
        Self {
            metric: metric.into(),
            entries,
        }
    }

    /// Coerce every value and check the range order.
    pub(crate) fn validated(
        metric: impl Into<String>,
        entries: Vec<(MetricParameter, String)>,
    ) -> Result<Self> {
        let entries = entries
            .into_iter()
            .map(|(p, raw)| p.coerce(&raw).map(|canonical| (p, canonical)))
            .collect::<Result<Vec<_>>>()?;

        let mapping = Self::new(metric, entries);
        if let Some((from, to)) = mapping.date_range() {
            if from > to {
                let raw = mapping.get(MetricParameter::ToDate).unwrap_or_default();
                return Err(MetricParameter::ToDate.type_error(raw, "range ends before it starts"));
            }
        }
        Ok(mapping)
    }

    /// Identifier of the metric kind this mapping was built for.
    #[must_use]
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, parameter: MetricParameter) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| *p == parameter)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate `(parameter, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricParameter, &str)> {
        self.entries.iter().map(|(p, v)| (*p, v.as_str()))
    }

    /// Values in schema order.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inclusive date range `[DATE|FROM_DATE, TO_DATE]`.
    ///
    /// Both ends are validated at construction, so `None` only means the
    /// kind has no date range.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let from = self
            .entries
            .iter()
            .find(|(p, _)| p.is_range_start())
            .and_then(|(_, v)| parse_date(v).ok())?;
        let to = self
            .get(MetricParameter::ToDate)
            .and_then(|v| parse_date(v).ok())?;
        Some((from, to))
    }

    /// Get a `Count` parameter as an integer.
    #[must_use]
    pub fn count(&self, parameter: MetricParameter) -> Option<u32> {
        self.get(parameter).and_then(|v| v.parse().ok())
    }
}

#[derive(Deserialize)]
struct MappingRepr {
    metric: String,
    entries: Vec<(MetricParameter, String)>,
}

impl TryFrom<MappingRepr> for ParameterMapping {
    type Error = Error;

    fn try_from(repr: MappingRepr) -> Result<Self> {
        Self::validated(repr.metric, repr.entries)
    }
}

impl fmt::Display for ParameterMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.metric)?;
        for (idx, (p, v)) in self.entries.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}={v}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_valid() {
        assert_eq!(
            parse_date("20100203").unwrap(),
            NaiveDate::from_ymd_opt(2010, 2, 3).unwrap()
        );
        assert_eq!(format_date(parse_date("20101005").unwrap()), "20101005");
    }

    #[test]
    fn test_parse_date_rejects_malformed() {
        assert!(parse_date("2010-10-01").is_err());
        assert!(parse_date("2010101").is_err());
        assert!(parse_date("201010011").is_err());
        assert!(parse_date("20101301").is_err());
        assert!(parse_date("20100230").is_err());
        assert!(parse_date("２０１０１００１").is_err());
    }

    #[test]
    fn test_coerce_count_normalizes() {
        assert_eq!(MetricParameter::Limit.coerce("007").unwrap(), "7");
        assert_eq!(MetricParameter::Limit.coerce("0").unwrap(), "0");
        assert!(MetricParameter::Limit.coerce("-1").is_err());
        assert!(MetricParameter::Limit.coerce("10001").is_err());
    }

    #[test]
    fn test_coerce_date_error_names_parameter() {
        let err = MetricParameter::ToDate.coerce("yesterday").unwrap_err();
        match err {
            Error::ParameterTypeError { parameter, value, .. } => {
                assert_eq!(parameter, "TO_DATE");
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_range_start_aliases() {
        assert!(MetricParameter::Date.accepts(MetricParameter::FromDate));
        assert!(MetricParameter::FromDate.accepts(MetricParameter::Date));
        assert!(MetricParameter::ToDate.accepts(MetricParameter::ToDate));
        assert!(!MetricParameter::ToDate.accepts(MetricParameter::Date));
        assert!(!MetricParameter::Limit.accepts(MetricParameter::ToDate));
    }

    #[test]
    fn test_parameter_names_roundtrip() {
        for p in [
            MetricParameter::Date,
            MetricParameter::FromDate,
            MetricParameter::ToDate,
            MetricParameter::Limit,
        ] {
            assert_eq!(p.name().parse::<MetricParameter>().unwrap(), p);
        }
        assert!("WHEN".parse::<MetricParameter>().is_err());
    }

    #[test]
    fn test_mapping_accessors() {
        let mapping = ParameterMapping::new(
            "m",
            vec![
                (MetricParameter::Date, "20101001".to_string()),
                (MetricParameter::ToDate, "20101005".to_string()),
            ],
        );
        assert_eq!(mapping.get(MetricParameter::Date), Some("20101001"));
        assert_eq!(mapping.values(), vec!["20101001", "20101005"]);
        let (from, to) = mapping.date_range().unwrap();
        assert!(from < to);
        assert_eq!(mapping.to_string(), "m(DATE=20101001, TO_DATE=20101005)");
    }

    #[test]
    fn test_deserialize_coerces_values() {
        let json = r#"{"metric":"m","entries":[["DATE","20101001"],["TO_DATE","20101005"],["LIMIT","007"]]}"#;
        let mapping: ParameterMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.get(MetricParameter::Limit), Some("7"));

        for bad in [
            r#"{"metric":"m","entries":[["DATE","x"],["TO_DATE","20101005"]]}"#,
            r#"{"metric":"m","entries":[["DATE","20101001"],["TO_DATE","../../../escaped"]]}"#,
            r#"{"metric":"m","entries":[["DATE","20101005"],["TO_DATE","20101001"]]}"#,
        ] {
            assert!(serde_json::from_str::<ParameterMapping>(bad).is_err(), "accepted {bad}");
        }
    }
}
