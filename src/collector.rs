//! Concurrent collection across all configured targets, and the text
//! exposition of the result.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::warn;

use crate::config::SnmpConfig;
use crate::poller::TargetPoller;
use crate::registry::{MetricDescriptor, MetricId, MetricRegistry, Sample};

/// Statistics over completed collection cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeStats {
    /// Collection cycles completed since startup.
    pub cycles: u64,
    /// Samples emitted by the most recent cycle.
    pub samples_last_cycle: u64,
    /// Targets that ended the most recent cycle with status 1.
    pub targets_up_last_cycle: u64,
    /// Targets that ended the most recent cycle with status 0.
    pub targets_down_last_cycle: u64,
}

/// Runs one poller per target per cycle and merges their samples.
pub struct PduCollector {
    registry: Arc<MetricRegistry>,
    targets: Vec<String>,
    community: String,
    port: u16,
    request_timeout: Duration,
    stats: RwLock<ScrapeStats>,
}

impl PduCollector {
    pub fn new(registry: Arc<MetricRegistry>, config: &SnmpConfig) -> Self {
        Self {
            registry,
            targets: config.targets.clone(),
            community: config.community.clone(),
            port: config.port,
            request_timeout: Duration::from_secs(config.timeout_secs),
            stats: RwLock::new(ScrapeStats::default()),
        }
    }

    /// The descriptors this collector can ever emit.
    pub fn descriptors(&self) -> &[MetricDescriptor] {
        self.registry.descriptors()
    }

    /// Run one full collection cycle.
    ///
    /// One task per target, all joined before this returns. Per-target
    /// sample lists are merged in configured target order; within a
    /// target, emission order (telemetry first, status last) is kept.
    pub async fn collect(&self) -> Vec<Sample> {
        let mut handles = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            let poller = TargetPoller::new(
                target.clone(),
                self.community.clone(),
                self.port,
                self.request_timeout,
            );
            handles.push((target.clone(), tokio::spawn(async move { poller.poll().await })));
        }

        let mut samples = Vec::new();
        for (target, handle) in handles {
            match handle.await {
                Ok(target_samples) => samples.extend(target_samples),
                Err(e) => {
                    // A panicked poller still owes its status sample.
                    warn!(target = %target, error = %e, "poller task failed");
                    samples.push(Sample::status(&target, false));
                }
            }
        }

        self.record_cycle(&samples);
        samples
    }

    /// Collect once and render the result.
    pub async fn scrape(&self) -> String {
        let samples = self.collect().await;
        self.render(&samples)
    }

    /// Snapshot of the scrape statistics.
    pub fn stats(&self) -> ScrapeStats {
        *self.stats.read()
    }

    fn record_cycle(&self, samples: &[Sample]) {
        let mut up = 0;
        let mut down = 0;
        for sample in samples {
            if sample.metric == MetricId::Up {
                if sample.value == 1.0 {
                    up += 1;
                } else {
                    down += 1;
                }
            }
        }

        let mut stats = self.stats.write();
        stats.cycles += 1;
        stats.samples_last_cycle = samples.len() as u64;
        stats.targets_up_last_cycle = up;
        stats.targets_down_last_cycle = down;
    }

    /// Render samples in Prometheus text exposition format.
    pub fn render(&self, samples: &[Sample]) -> String {
        let mut output = Vec::with_capacity(samples.len() * 64);

        for descriptor in self.registry.descriptors() {
            let series: Vec<&Sample> =
                samples.iter().filter(|s| s.metric == descriptor.id).collect();
            if series.is_empty() {
                continue;
            }

            writeln!(output, "# HELP {} {}", descriptor.name, descriptor.help).ok();
            writeln!(output, "# TYPE {} gauge", descriptor.name).ok();

            for sample in series {
                writeln!(
                    output,
                    "{}{} {}",
                    descriptor.name,
                    format_labels(&sample.labels()),
                    format_value(sample.value)
                )
                .ok();
            }
        }

        // Exporter self-metrics.
        let stats = self.stats();
        writeln!(output).ok();
        writeln!(output, "# TYPE gude_pdu_exporter_cycles_total counter").ok();
        writeln!(output, "gude_pdu_exporter_cycles_total {}", stats.cycles).ok();
        writeln!(output, "# TYPE gude_pdu_exporter_samples_last_cycle gauge").ok();
        writeln!(
            output,
            "gude_pdu_exporter_samples_last_cycle {}",
            stats.samples_last_cycle
        )
        .ok();
        writeln!(output, "# TYPE gude_pdu_exporter_targets_up_last_cycle gauge").ok();
        writeln!(
            output,
            "gude_pdu_exporter_targets_up_last_cycle {}",
            stats.targets_up_last_cycle
        )
        .ok();

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Shareable collector handle.
pub type SharedCollector = Arc<PduCollector>;

/// Format labels for the exposition format, in schema order.
fn format_labels(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for the exposition format.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Feed;

    fn make_collector(targets: &[&str]) -> PduCollector {
        let config = SnmpConfig {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        PduCollector::new(Arc::new(MetricRegistry::new()), &config)
    }

    #[test]
    fn test_descriptors_delegate_to_registry() {
        let collector = make_collector(&[]);
        assert_eq!(collector.descriptors().len(), 6);
    }

    #[test]
    fn test_render_groups_by_metric_in_registry_order() {
        let collector = make_collector(&[]);
        let samples = vec![
            Sample::telemetry("pdu01", MetricId::ActivePower, Feed::B, 150.0),
            Sample::telemetry("pdu01", MetricId::TotalEnergy, Feed::A, 12345.0),
            Sample::status("pdu01", true),
        ];

        let output = collector.render(&samples);

        let total_pos = output.find("gude_pdu_total{").unwrap();
        let power_pos = output.find("gude_pdu_active_power{").unwrap();
        let up_pos = output.find("gude_pdu_up{").unwrap();
        assert!(up_pos < total_pos);
        assert!(total_pos < power_pos);

        assert!(output.contains("# HELP gude_pdu_active_power Active Power"));
        assert!(output.contains("# TYPE gude_pdu_active_power gauge"));
        assert!(output.contains("gude_pdu_active_power{target=\"pdu01\",feed=\"B\"} 150"));
        assert!(output.contains("gude_pdu_up{target=\"pdu01\"} 1"));
    }

    #[test]
    fn test_render_skips_metrics_without_samples() {
        let collector = make_collector(&[]);
        let samples = vec![Sample::status("pdu01", false)];

        let output = collector.render(&samples);

        assert!(output.contains("gude_pdu_up{target=\"pdu01\"} 0"));
        assert!(!output.contains("# TYPE gude_pdu_frequency"));
    }

    #[test]
    fn test_render_includes_self_metrics() {
        let collector = make_collector(&[]);
        let output = collector.render(&[]);

        assert!(output.contains("# TYPE gude_pdu_exporter_cycles_total counter"));
        assert!(output.contains("gude_pdu_exporter_cycles_total 0"));
    }

    #[tokio::test]
    async fn test_collect_with_no_targets_counts_cycle() {
        let collector = make_collector(&[]);

        let samples = collector.collect().await;
        assert!(samples.is_empty());

        let stats = collector.stats();
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.samples_last_cycle, 0);
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(format_labels(&[]), "");
        assert_eq!(
            format_labels(&[("target", "10.0.0.5"), ("feed", "A")]),
            "{target=\"10.0.0.5\",feed=\"A\"}"
        );
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(150.0), "150");
        assert_eq!(format_value(49.8), "49.8");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
