//! The fixed set of metrics this exporter emits.
//!
//! The registry is built once at startup and shared read-only across all
//! collection cycles; nothing in it is mutated afterwards.

use std::fmt;
use std::sync::Arc;

/// Name prefix shared by every emitted metric.
pub const METRIC_PREFIX: &str = "gude_pdu_";

/// Identifies one of the six metrics in the registry.
///
/// Declaration order is the registry order and the order metrics appear in
/// the rendered exposition output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    /// Up/down status of the last poll of a target.
    Up,
    /// Accumulated active energy of a power channel.
    TotalEnergy,
    /// Instantaneous active power.
    ActivePower,
    /// Instantaneous current on a power channel.
    ActualCurrent,
    /// Instantaneous voltage on a power channel.
    ActualVoltage,
    /// Line frequency of a power channel.
    Frequency,
}

impl MetricId {
    /// All metrics, in registry order.
    pub const ALL: [MetricId; 6] = [
        MetricId::Up,
        MetricId::TotalEnergy,
        MetricId::ActivePower,
        MetricId::ActualCurrent,
        MetricId::ActualVoltage,
        MetricId::Frequency,
    ];

    fn name_suffix(self) -> &'static str {
        match self {
            MetricId::Up => "up",
            MetricId::TotalEnergy => "total",
            MetricId::ActivePower => "active_power",
            MetricId::ActualCurrent => "actual_current",
            MetricId::ActualVoltage => "actual_voltage",
            MetricId::Frequency => "frequency",
        }
    }

    fn help(self) -> &'static str {
        match self {
            MetricId::Up => "Scrape of target was successful",
            MetricId::TotalEnergy => "Total accumulated Active Energy of Power Channel",
            MetricId::ActivePower => "Active Power",
            MetricId::ActualCurrent => "Actual Current on Power Channel",
            MetricId::ActualVoltage => "Actual Voltage on Power Channel",
            MetricId::Frequency => "Frequency of Power Channel",
        }
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            MetricId::Up => &["target"],
            _ => &["target", "feed"],
        }
    }
}

/// One of the two monitored power feeds of a measurement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    A,
    B,
}

impl Feed {
    /// Label value used in emitted samples.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::A => "A",
            Feed::B => "B",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable description of one metric: name, help text and label schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub id: MetricId,
    pub name: String,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// The six metric descriptors, constructed once at process start.
#[derive(Debug)]
pub struct MetricRegistry {
    descriptors: [MetricDescriptor; 6],
}

impl MetricRegistry {
    pub fn new() -> Self {
        let descriptors = MetricId::ALL.map(|id| MetricDescriptor {
            id,
            name: format!("{METRIC_PREFIX}{}", id.name_suffix()),
            help: id.help(),
            labels: id.labels(),
        });

        Self { descriptors }
    }

    /// All descriptors, in registry order.
    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// Descriptor for a single metric.
    pub fn get(&self, id: MetricId) -> &MetricDescriptor {
        // ALL order matches declaration order, so the discriminant indexes.
        &self.descriptors[id as usize]
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shareable registry handle.
pub type SharedRegistry = Arc<MetricRegistry>;

/// A single labeled measurement produced during a collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: MetricId,
    pub target: String,
    pub feed: Option<Feed>,
    pub value: f64,
}

impl Sample {
    /// The per-target up/down indicator, emitted exactly once per cycle.
    pub fn status(target: &str, up: bool) -> Self {
        Self {
            metric: MetricId::Up,
            target: target.to_string(),
            feed: None,
            value: if up { 1.0 } else { 0.0 },
        }
    }

    /// A telemetry measurement for one feed of a power channel.
    pub fn telemetry(target: &str, metric: MetricId, feed: Feed, value: f64) -> Self {
        Self {
            metric,
            target: target.to_string(),
            feed: Some(feed),
            value,
        }
    }

    /// Label values in schema order.
    pub fn labels(&self) -> Vec<(&'static str, &str)> {
        let mut labels = vec![("target", self.target.as_str())];
        if let Some(feed) = self.feed {
            labels.push(("feed", feed.as_str()));
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_six_descriptors() {
        let registry = MetricRegistry::new();
        assert_eq!(registry.descriptors().len(), 6);
    }

    #[test]
    fn test_metric_names() {
        let registry = MetricRegistry::new();
        let names: Vec<&str> = registry
            .descriptors()
            .iter()
            .map(|d| d.name.as_str())
            .collect();

        assert_eq!(
            names,
            vec![
                "gude_pdu_up",
                "gude_pdu_total",
                "gude_pdu_active_power",
                "gude_pdu_actual_current",
                "gude_pdu_actual_voltage",
                "gude_pdu_frequency",
            ]
        );
    }

    #[test]
    fn test_label_schemas() {
        let registry = MetricRegistry::new();

        assert_eq!(registry.get(MetricId::Up).labels, &["target"]);
        for id in [
            MetricId::TotalEnergy,
            MetricId::ActivePower,
            MetricId::ActualCurrent,
            MetricId::ActualVoltage,
            MetricId::Frequency,
        ] {
            assert_eq!(registry.get(id).labels, &["target", "feed"]);
        }
    }

    #[test]
    fn test_get_matches_id() {
        let registry = MetricRegistry::new();
        for id in MetricId::ALL {
            assert_eq!(registry.get(id).id, id);
        }
    }

    #[test]
    fn test_status_sample() {
        let up = Sample::status("10.0.0.5", true);
        assert_eq!(up.metric, MetricId::Up);
        assert_eq!(up.value, 1.0);
        assert_eq!(up.labels(), vec![("target", "10.0.0.5")]);

        let down = Sample::status("10.0.0.9", false);
        assert_eq!(down.value, 0.0);
    }

    #[test]
    fn test_telemetry_sample_labels() {
        let sample = Sample::telemetry("pdu01", MetricId::ActivePower, Feed::B, 150.0);
        assert_eq!(
            sample.labels(),
            vec![("target", "pdu01"), ("feed", "B")]
        );
    }
}
