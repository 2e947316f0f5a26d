//! Translation of walked SNMP variables into metric samples.
//!
//! The mapper is pure: it sees one variable at a time as a path suffix
//! (relative to the device family subtree) plus its wire value, and either
//! classifies it into a metric or ignores it. Unknown suffixes are not an
//! error; newer firmware exposes more variables than we map.

use snmp2::Value;
use thiserror::Error;

use crate::registry::{Feed, MetricId};

/// Wire signedness expected for a telemetry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Unsigned,
    Signed,
}

impl Signedness {
    fn as_str(&self) -> &'static str {
        match self {
            Signedness::Unsigned => "unsigned",
            Signedness::Signed => "signed",
        }
    }
}

/// Path suffix (channel marker stripped) to metric mapping.
///
/// Active power is the only field the devices report as a signed integer;
/// everything else comes as an unsigned type.
const TELEMETRY_TABLE: &[(&str, MetricId, Signedness)] = &[
    ("1.5.1.2.1.3", MetricId::TotalEnergy, Signedness::Unsigned),
    ("1.5.1.2.1.4", MetricId::ActivePower, Signedness::Signed),
    ("1.5.1.2.1.5", MetricId::ActualCurrent, Signedness::Unsigned),
    ("1.5.1.2.1.6", MetricId::ActualVoltage, Signedness::Unsigned),
    ("1.5.1.2.1.7", MetricId::Frequency, Signedness::Unsigned),
];

/// Trailing path marker of the second power feed.
const FEED_B_MARKER: &str = ".2";

/// Outcome of mapping one walked variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped {
    /// The variable is one of the known telemetry fields.
    Telemetry {
        metric: MetricId,
        feed: Feed,
        value: f64,
    },
    /// Not a variable we map; dropped silently.
    Ignored,
}

/// A matched telemetry field carried an unexpected wire type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{metric:?} expects an {} integer, got {got}", .expected.as_str())]
pub struct ValueConversionError {
    pub metric: MetricId,
    pub expected: Signedness,
    pub got: &'static str,
}

/// Map one variable into a metric sample, an ignore, or a conversion error.
///
/// The feed is encoded as the final path segment: the two-character marker
/// `.2` means feed B, anything else feed A. The marker is stripped before
/// the suffix is matched against the telemetry table.
pub fn map_variable(suffix: &str, value: &Value<'_>) -> Result<Mapped, ValueConversionError> {
    let feed = if suffix.ends_with(FEED_B_MARKER) {
        Feed::B
    } else {
        Feed::A
    };

    let Some(base) = suffix.get(..suffix.len().saturating_sub(FEED_B_MARKER.len())) else {
        return Ok(Mapped::Ignored);
    };

    let Some((_, metric, expected)) = TELEMETRY_TABLE.iter().find(|(s, _, _)| *s == base) else {
        return Ok(Mapped::Ignored);
    };

    let value = convert(*metric, *expected, value)?;

    Ok(Mapped::Telemetry {
        metric: *metric,
        feed,
        value,
    })
}

/// Convert a wire value to a metric value, honoring the field's signedness.
fn convert(
    metric: MetricId,
    expected: Signedness,
    value: &Value<'_>,
) -> Result<f64, ValueConversionError> {
    match (expected, value) {
        (Signedness::Unsigned, Value::Counter32(n)) => Ok(f64::from(*n)),
        (Signedness::Unsigned, Value::Unsigned32(n)) => Ok(f64::from(*n)),
        (Signedness::Unsigned, Value::Counter64(n)) => Ok(*n as f64),
        (Signedness::Signed, Value::Integer(n)) => Ok(*n as f64),
        _ => Err(ValueConversionError {
            metric,
            expected,
            got: value_type_name(value),
        }),
    }
}

fn value_type_name(value: &Value<'_>) -> &'static str {
    match value {
        Value::Boolean(_) => "Boolean",
        Value::Integer(_) => "Integer",
        Value::OctetString(_) => "OctetString",
        Value::ObjectIdentifier(_) => "ObjectIdentifier",
        Value::IpAddress(_) => "IpAddress",
        Value::Counter32(_) => "Counter32",
        Value::Unsigned32(_) => "Unsigned32",
        Value::Timeticks(_) => "Timeticks",
        Value::Counter64(_) => "Counter64",
        Value::Null => "Null",
        Value::NoSuchObject => "NoSuchObject",
        Value::NoSuchInstance => "NoSuchInstance",
        Value::EndOfMibView => "EndOfMibView",
        _ => "unsupported",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_suffixes_map_to_metrics() {
        let cases = [
            ("1.5.1.2.1.3.1", MetricId::TotalEnergy),
            ("1.5.1.2.1.5.1", MetricId::ActualCurrent),
            ("1.5.1.2.1.6.1", MetricId::ActualVoltage),
            ("1.5.1.2.1.7.1", MetricId::Frequency),
        ];

        for (suffix, expected) in cases {
            let mapped = map_variable(suffix, &Value::Unsigned32(230)).unwrap();
            assert_eq!(
                mapped,
                Mapped::Telemetry {
                    metric: expected,
                    feed: Feed::A,
                    value: 230.0,
                }
            );
        }
    }

    #[test]
    fn test_active_power_is_signed() {
        let mapped = map_variable("1.5.1.2.1.4.2", &Value::Integer(150)).unwrap();
        assert_eq!(
            mapped,
            Mapped::Telemetry {
                metric: MetricId::ActivePower,
                feed: Feed::B,
                value: 150.0,
            }
        );

        // Negative active power (feeding back into the grid) is valid.
        let mapped = map_variable("1.5.1.2.1.4.1", &Value::Integer(-42)).unwrap();
        assert_eq!(
            mapped,
            Mapped::Telemetry {
                metric: MetricId::ActivePower,
                feed: Feed::A,
                value: -42.0,
            }
        );
    }

    #[test]
    fn test_channel_two_marker_selects_feed_b() {
        for (suffix, feed) in [
            ("1.5.1.2.1.6.1", Feed::A),
            ("1.5.1.2.1.6.2", Feed::B),
        ] {
            match map_variable(suffix, &Value::Unsigned32(229)).unwrap() {
                Mapped::Telemetry { feed: got, .. } => assert_eq!(got, feed),
                other => panic!("expected telemetry, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_suffix_is_ignored() {
        for suffix in ["1.5.1.2.1.8.1", "2.1.1.0", "1.5.1.2.1.3", ""] {
            assert_eq!(
                map_variable(suffix, &Value::Unsigned32(1)).unwrap(),
                Mapped::Ignored
            );
        }
    }

    #[test]
    fn test_unsigned_field_accepts_counter_types() {
        for value in [
            Value::Counter32(7),
            Value::Unsigned32(7),
            Value::Counter64(7),
        ] {
            let mapped = map_variable("1.5.1.2.1.3.1", &value).unwrap();
            assert!(matches!(
                mapped,
                Mapped::Telemetry {
                    metric: MetricId::TotalEnergy,
                    value: v,
                    ..
                } if v == 7.0
            ));
        }
    }

    #[test]
    fn test_signedness_mismatch_is_an_error() {
        // A signed Integer where an unsigned type is expected.
        let err = map_variable("1.5.1.2.1.3.1", &Value::Integer(5)).unwrap_err();
        assert_eq!(err.metric, MetricId::TotalEnergy);
        assert_eq!(err.expected, Signedness::Unsigned);
        assert_eq!(err.got, "Integer");

        // An unsigned type where active power expects a signed Integer.
        let err = map_variable("1.5.1.2.1.4.1", &Value::Counter32(5)).unwrap_err();
        assert_eq!(err.metric, MetricId::ActivePower);
        assert_eq!(err.expected, Signedness::Signed);
        assert_eq!(err.got, "Counter32");
    }

    #[test]
    fn test_non_numeric_value_is_an_error() {
        let err = map_variable("1.5.1.2.1.6.1", &Value::OctetString(b"230V")).unwrap_err();
        assert_eq!(err.got, "OctetString");
        assert!(err.to_string().contains("unsigned"));
    }
}
