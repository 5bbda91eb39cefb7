use crate::error::MetricError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value agents send when they want to address a metric without supplying
/// a value (lookups) or a hash.
pub const NO_VALUE: &str = "none";

/// How updates to a metric merge into the stored state.
///
/// # Examples
///
/// ```
/// use pulse_common::MetricKind;
///
/// let kind: MetricKind = "counter".parse().unwrap();
/// assert_eq!(kind, MetricKind::Counter);
/// assert_eq!(kind.to_string(), "counter");
/// assert!("histogram".parse::<MetricKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Absolute measurement, each update replaces the previous value.
    Gauge,
    /// Cumulative measurement, each update adds to the stored total.
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gauge" => Ok(MetricKind::Gauge),
            "counter" => Ok(MetricKind::Counter),
            other => Err(MetricError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Untyped input for a metric value, as it arrives from a URL segment or a
/// sampled statistic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(value: &'a str) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue<'_> {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<u64> for RawValue<'_> {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => RawValue::Int(v),
            Err(_) => RawValue::Float(value as f64),
        }
    }
}

impl From<f64> for RawValue<'_> {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl fmt::Display for RawValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Int(v) => write!(f, "{v}"),
            RawValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A metric payload: exactly one number, typed by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Gauge(f64),
    Counter(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
        }
    }

    /// Interprets `raw` as a value of `kind`.
    ///
    /// Returns `Ok(None)` for the [`NO_VALUE`] sentinel. Counters accept
    /// integral floats only; gauges must be finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_common::{MetricKind, MetricValue, RawValue};
    ///
    /// let v = MetricValue::parse(MetricKind::Counter, RawValue::Text("42")).unwrap();
    /// assert_eq!(v, Some(MetricValue::Counter(42)));
    /// assert!(MetricValue::parse(MetricKind::Counter, RawValue::Text("4.2")).is_err());
    /// assert_eq!(MetricValue::parse(MetricKind::Gauge, RawValue::Text("none")).unwrap(), None);
    /// ```
    pub fn parse(kind: MetricKind, raw: RawValue<'_>) -> Result<Option<Self>, MetricError> {
        let invalid = || MetricError::Parse {
            kind,
            raw: raw.to_string(),
        };

        let value = match (kind, raw) {
            (_, RawValue::Text(NO_VALUE)) => return Ok(None),
            (MetricKind::Counter, RawValue::Text(s)) => {
                MetricValue::Counter(s.parse().map_err(|_| invalid())?)
            }
            (MetricKind::Counter, RawValue::Int(v)) => MetricValue::Counter(v),
            (MetricKind::Counter, RawValue::Float(v)) => {
                MetricValue::Counter(integral(v).ok_or_else(invalid)?)
            }
            (MetricKind::Gauge, RawValue::Text(s)) => {
                MetricValue::Gauge(s.parse().map_err(|_| invalid())?)
            }
            (MetricKind::Gauge, RawValue::Int(v)) => MetricValue::Gauge(v as f64),
            (MetricKind::Gauge, RawValue::Float(v)) => MetricValue::Gauge(v),
        };

        match value {
            MetricValue::Gauge(v) if !v.is_finite() => Err(invalid()),
            _ => Ok(Some(value)),
        }
    }

    /// Applies `incoming` on top of the stored value.
    ///
    /// Counters add to a stored counter (saturating at the `i64` bounds);
    /// everything else replaces what was there.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_common::MetricValue;
    ///
    /// let merged = MetricValue::merge(Some(MetricValue::Counter(5)), MetricValue::Counter(7));
    /// assert_eq!(merged, MetricValue::Counter(12));
    /// let merged = MetricValue::merge(Some(MetricValue::Gauge(1.5)), MetricValue::Gauge(0.25));
    /// assert_eq!(merged, MetricValue::Gauge(0.25));
    /// ```
    pub fn merge(existing: Option<MetricValue>, incoming: MetricValue) -> MetricValue {
        match (existing, incoming) {
            (Some(MetricValue::Counter(stored)), MetricValue::Counter(delta)) => {
                MetricValue::Counter(stored.saturating_add(delta))
            }
            (_, value) => value,
        }
    }

    /// Fixed formatting fed to the integrity hash: six decimals for gauges,
    /// plain integers for counters.
    pub fn canonical(&self) -> String {
        match self {
            MetricValue::Gauge(v) => format!("{v:.6}"),
            MetricValue::Counter(d) => d.to_string(),
        }
    }
}

/// Plain-text rendering used by the path-addressed query endpoint.
impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Gauge(v) => write!(f, "{v}"),
            MetricValue::Counter(d) => write!(f, "{d}"),
        }
    }
}

fn integral(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// A named metric with its current value and optional integrity hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MetricDto", into = "MetricDto")]
pub struct Metric {
    pub id: String,
    pub value: MetricValue,
    pub hash: Option<String>,
}

impl Metric {
    pub fn new(id: impl Into<String>, value: MetricValue) -> Self {
        Self {
            id: id.into(),
            value,
            hash: None,
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, MetricValue::Gauge(value))
    }

    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self::new(id, MetricValue::Counter(delta))
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Builds a metric from an id, a kind name and an optional raw value.
    ///
    /// The kind is checked first, so an unknown kind is reported even when
    /// the value is garbage too. An absent value (or `"none"`) yields an
    /// input without a value, which is enough to address a stored metric.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_common::{Metric, MetricError, RawValue};
    ///
    /// let input = Metric::parse("Alloc", "gauge", Some(RawValue::Text("12.5"))).unwrap();
    /// assert_eq!(input.into_metric().unwrap(), Metric::gauge("Alloc", 12.5));
    ///
    /// let err = Metric::parse("Alloc", "summary", Some(RawValue::Text("1"))).unwrap_err();
    /// assert_eq!(err, MetricError::UnsupportedKind("summary".into()));
    /// ```
    pub fn parse(
        id: &str,
        kind: &str,
        raw: Option<RawValue<'_>>,
    ) -> Result<MetricInput, MetricError> {
        let kind: MetricKind = kind.parse()?;
        let value = match raw {
            Some(raw) => MetricValue::parse(kind, raw)?,
            None => None,
        };
        Ok(MetricInput {
            id: id.to_string(),
            kind,
            value,
        })
    }
}

/// Result of [`Metric::parse`]: a typed address that may or may not carry a
/// value yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricInput {
    pub id: String,
    pub kind: MetricKind,
    pub value: Option<MetricValue>,
}

impl MetricInput {
    pub fn into_metric(self) -> Result<Metric, MetricError> {
        match self.value {
            Some(value) => Ok(Metric::new(self.id, value)),
            None => Err(MetricError::MissingValue {
                id: self.id,
                kind: self.kind,
            }),
        }
    }
}

/// JSON shape of a metric on the wire and in snapshot files.
///
/// Fields are deliberately loose (`type` is a free string, both numbers are
/// optional) so that a malformed submission can be rejected with a precise
/// error by [`MetricDto::validate`] instead of a generic decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDto {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl MetricDto {
    /// Checks kind, then id, then value presence, stopping at the first
    /// failure. An empty or `"none"` hash is treated as absent.
    pub fn validate(self) -> Result<Metric, MetricError> {
        let kind = self.lookup_kind()?;
        let value = match kind {
            MetricKind::Gauge => self.value.map(MetricValue::Gauge),
            MetricKind::Counter => self.delta.map(MetricValue::Counter),
        };
        let Some(value) = value else {
            return Err(MetricError::MissingValue { id: self.id, kind });
        };
        let hash = self.hash.filter(|h| !h.is_empty() && h != NO_VALUE);
        Ok(Metric {
            id: self.id,
            value,
            hash,
        })
    }

    /// Kind and id checks only, for requests that address a stored metric.
    pub fn lookup_kind(&self) -> Result<MetricKind, MetricError> {
        let kind: MetricKind = self.kind.parse()?;
        if self.id.is_empty() {
            return Err(MetricError::MissingId);
        }
        Ok(kind)
    }
}

impl TryFrom<MetricDto> for Metric {
    type Error = MetricError;

    fn try_from(dto: MetricDto) -> Result<Self, Self::Error> {
        dto.validate()
    }
}

impl From<Metric> for MetricDto {
    fn from(metric: Metric) -> Self {
        let (delta, value) = match metric.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        Self {
            kind: metric.kind().to_string(),
            id: metric.id,
            delta,
            value,
            hash: metric.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_values_parse_per_kind() {
        assert_eq!(
            MetricValue::parse(MetricKind::Gauge, RawValue::Text("0.125")).unwrap(),
            Some(MetricValue::Gauge(0.125))
        );
        assert_eq!(
            MetricValue::parse(MetricKind::Counter, RawValue::Text("-3")).unwrap(),
            Some(MetricValue::Counter(-3))
        );
        assert!(matches!(
            MetricValue::parse(MetricKind::Gauge, RawValue::Text("abc")),
            Err(MetricError::Parse { kind: MetricKind::Gauge, .. })
        ));
    }

    #[test]
    fn non_finite_gauges_are_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            assert!(
                MetricValue::parse(MetricKind::Gauge, RawValue::Text(raw)).is_err(),
                "{raw} should be rejected"
            );
        }
        assert!(MetricValue::parse(MetricKind::Gauge, RawValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn numeric_inputs_coerce_deterministically() {
        assert_eq!(
            MetricValue::parse(MetricKind::Gauge, RawValue::Int(7)).unwrap(),
            Some(MetricValue::Gauge(7.0))
        );
        assert_eq!(
            MetricValue::parse(MetricKind::Counter, RawValue::Float(3.0)).unwrap(),
            Some(MetricValue::Counter(3))
        );
        assert!(MetricValue::parse(MetricKind::Counter, RawValue::Float(3.5)).is_err());
        assert!(MetricValue::parse(MetricKind::Counter, RawValue::Float(1e20)).is_err());
        assert_eq!(RawValue::from(u64::MAX), RawValue::Float(u64::MAX as f64));
    }

    #[test]
    fn absent_value_yields_lookup_input() {
        let input = Metric::parse("PollCount", "counter", None).unwrap();
        assert_eq!(input.value, None);
        assert_eq!(
            input.into_metric().unwrap_err(),
            MetricError::MissingValue {
                id: "PollCount".into(),
                kind: MetricKind::Counter
            }
        );
    }

    #[test]
    fn counter_merge_saturates() {
        let merged = MetricValue::merge(
            Some(MetricValue::Counter(i64::MAX - 1)),
            MetricValue::Counter(10),
        );
        assert_eq!(merged, MetricValue::Counter(i64::MAX));
    }

    #[test]
    fn counter_replaces_a_stored_gauge() {
        let merged = MetricValue::merge(Some(MetricValue::Gauge(2.0)), MetricValue::Counter(3));
        assert_eq!(merged, MetricValue::Counter(3));
    }

    #[test]
    fn canonical_formatting_is_fixed_point() {
        assert_eq!(MetricValue::Gauge(1.0).canonical(), "1.000000");
        assert_eq!(MetricValue::Gauge(0.1234567).canonical(), "0.123457");
        assert_eq!(MetricValue::Counter(-12).canonical(), "-12");
    }

    #[test]
    fn display_uses_shortest_form() {
        assert_eq!(MetricValue::Gauge(3.5).to_string(), "3.5");
        assert_eq!(MetricValue::Gauge(2.0).to_string(), "2");
        assert_eq!(MetricValue::Counter(12).to_string(), "12");
    }

    #[test]
    fn dto_validation_order() {
        let dto = MetricDto {
            id: String::new(),
            kind: "timer".into(),
            ..Default::default()
        };
        assert_eq!(
            dto.validate().unwrap_err(),
            MetricError::UnsupportedKind("timer".into())
        );

        let dto = MetricDto {
            kind: "gauge".into(),
            ..Default::default()
        };
        assert_eq!(dto.validate().unwrap_err(), MetricError::MissingId);

        let dto = MetricDto {
            id: "Alloc".into(),
            kind: "gauge".into(),
            delta: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            dto.validate().unwrap_err(),
            MetricError::MissingValue { .. }
        ));
    }

    #[test]
    fn dto_hash_sentinels_are_dropped() {
        for hash in ["", "none"] {
            let dto = MetricDto {
                id: "Alloc".into(),
                kind: "gauge".into(),
                value: Some(1.0),
                hash: Some(hash.into()),
                ..Default::default()
            };
            assert_eq!(dto.validate().unwrap().hash, None);
        }
    }

    #[test]
    fn json_shape_matches_wire_format() {
        let mut metric = Metric::counter("PollCount", 5);
        metric.hash = Some("ab".into());
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "PollCount", "type": "counter", "delta": 5, "hash": "ab"})
        );

        let parsed: Metric =
            serde_json::from_str(r#"{"id":"Alloc","type":"gauge","delta":null,"value":2.5,"hash":null}"#)
                .unwrap();
        assert_eq!(parsed, Metric::gauge("Alloc", 2.5));

        assert!(serde_json::from_str::<Metric>(r#"{"id":"Alloc","type":"gauge"}"#).is_err());
    }
}
