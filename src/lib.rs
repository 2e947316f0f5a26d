//! Prometheus exporter for Gude PDU power telemetry.
//!
//! On every scrape the exporter polls each configured PDU over SNMP v2c,
//! maps the device's power-channel variables to gauge metrics (accumulated
//! energy, active power, current, voltage, frequency) and reports an
//! up/down status per target.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ HTTP /metrics │────>│  PduCollector  │────>│ TargetPoller │──SNMP──> PDUs
//! │    (axum)     │     │ (fan-out/join) │  xN │ (one/target) │
//! └───────────────┘     └────────────────┘     └──────────────┘
//! ```
//!
//! Each scrape is one collection cycle: the collector spawns one poller
//! task per target, joins them all, and renders the merged samples. No
//! state is carried between cycles except the immutable metric registry.
//!
//! # Usage
//!
//! ```bash
//! gude-pdu-exporter --targets 10.0.0.5,10.0.0.6 --community public
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for the JSON5 configuration file format.

pub mod collector;
pub mod config;
pub mod http;
pub mod mapping;
pub mod oid;
pub mod poller;
pub mod registry;

pub use collector::{PduCollector, ScrapeStats, SharedCollector};
pub use config::ExporterConfig;
pub use http::HttpServer;
pub use poller::{PollError, TargetPoller};
pub use registry::{Feed, MetricDescriptor, MetricId, MetricRegistry, Sample, SharedRegistry};
