//! One SNMP poll pass against a single PDU target.
//!
//! A pass is a terminal state machine: connect, identify the device family,
//! walk its telemetry subtree, then emit the status sample. Any phase
//! failure ends the pass with status 0; telemetry already collected before
//! a walk failure is kept.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use snmp2::{AsyncSession, Value};
use thiserror::Error;
use tokio::time::timeout;

use crate::mapping::{self, Mapped};
use crate::oid::{oid_starts_with, oid_suffix, oid_to_string, parse_oid};
use crate::registry::Sample;

/// Enterprise subtree shared by all supported devices; family
/// identification and telemetry both live below it.
const ENTERPRISE_ROOT: &str = "1.3.6.1.4.1.28507";

/// Supported device families, in identification order.
const DEVICE_FAMILIES: &[DeviceFamily] = &[
    DeviceFamily { id: "27" },
    DeviceFamily { id: "38" },
    DeviceFamily { id: "62" },
];

/// One of the supported PDU hardware families.
///
/// Re-derived on every poll pass; never cached across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFamily {
    id: &'static str,
}

impl DeviceFamily {
    /// The variable only devices of this family answer on.
    fn identification_oid(&self) -> String {
        format!("{ENTERPRISE_ROOT}.{}.1.1.1.1.0", self.id)
    }

    /// Root of this family's subtree.
    fn subtree(&self) -> String {
        format!("{ENTERPRISE_ROOT}.{}", self.id)
    }

    pub fn id(&self) -> &'static str {
        self.id
    }
}

/// Why a poll pass failed. Every variant results in status 0 for the
/// target; other targets in the same cycle are unaffected.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("connect failed: {0}")]
    Connect(anyhow::Error),

    #[error("identification failed: {0}")]
    Identify(anyhow::Error),

    #[error("telemetry walk failed: {0}")]
    Traverse(anyhow::Error),
}

/// Polls a single PDU target, one pass per collection cycle.
pub struct TargetPoller {
    target: String,
    community: String,
    port: u16,
    request_timeout: Duration,
}

impl TargetPoller {
    pub fn new(
        target: impl Into<String>,
        community: impl Into<String>,
        port: u16,
        request_timeout: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            community: community.into(),
            port,
            request_timeout,
        }
    }

    /// Run one poll pass.
    ///
    /// Always returns the samples to publish for this target: telemetry in
    /// traversal order, the status sample last.
    pub async fn poll(&self) -> Vec<Sample> {
        let mut samples = Vec::new();

        match self.poll_inner(&mut samples).await {
            Ok(()) => {
                tracing::debug!(target = %self.target, samples = samples.len(), "poll succeeded");
                samples.push(Sample::status(&self.target, true));
            }
            Err(e) => {
                tracing::warn!(target = %self.target, error = %e, "poll failed");
                samples.push(Sample::status(&self.target, false));
            }
        }

        samples
    }

    async fn poll_inner(&self, samples: &mut Vec<Sample>) -> Result<(), PollError> {
        let mut session = self.connect().await.map_err(PollError::Connect)?;

        let family = self
            .identify(&mut session)
            .await
            .map_err(PollError::Identify)?;

        let Some(family) = family else {
            // No known family answered; there is no subtree to walk, but
            // the target itself responded, so the pass still counts as up.
            tracing::debug!(target = %self.target, "no known device family identified");
            return Ok(());
        };

        self.traverse(&mut session, family, samples)
            .await
            .map_err(PollError::Traverse)?;

        Ok(())
    }

    /// Open an SNMPv2c session to the target.
    async fn connect(&self) -> Result<AsyncSession> {
        let address = self.address();

        AsyncSession::new_v2c(&address, self.community.as_bytes(), 0)
            .await
            .with_context(|| format!("SNMPv2c session to {address}"))
    }

    fn address(&self) -> String {
        if self.target.contains(':') {
            self.target.clone()
        } else {
            format!("{}:{}", self.target, self.port)
        }
    }

    /// Determine the device family: the first identification variable that
    /// returns a non-empty value wins.
    async fn identify(&self, session: &mut AsyncSession) -> Result<Option<DeviceFamily>> {
        for family in DEVICE_FAMILIES {
            let oid = parse_oid(&family.identification_oid())?;

            let response = timeout(self.request_timeout, session.get(&oid))
                .await
                .map_err(|_| anyhow!("identification GET timed out"))?
                .context("identification GET failed")?;

            if let Some((_, value)) = response.varbinds.into_iter().next()
                && !matches!(
                    value,
                    Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
                )
            {
                return Ok(Some(*family));
            }
        }

        Ok(None)
    }

    /// Walk the family subtree with GETNEXT, mapping every variable.
    async fn traverse(
        &self,
        session: &mut AsyncSession,
        family: DeviceFamily,
        samples: &mut Vec<Sample>,
    ) -> Result<()> {
        let subtree = parse_oid(&family.subtree())?;
        let mut current = subtree.clone();

        loop {
            let response = timeout(self.request_timeout, session.getnext(&current))
                .await
                .map_err(|_| anyhow!("walk GETNEXT timed out"))?
                .context("walk GETNEXT failed")?;

            let Some((oid, value)) = response.varbinds.into_iter().next() else {
                break;
            };

            if !oid_starts_with(&oid, &subtree) {
                break;
            }

            if matches!(value, Value::EndOfMibView) {
                break;
            }

            if let Some(suffix) = oid_suffix(&oid, &subtree) {
                match mapping::map_variable(&suffix, &value) {
                    Ok(Mapped::Telemetry {
                        metric,
                        feed,
                        value,
                    }) => {
                        samples.push(Sample::telemetry(&self.target, metric, feed, value));
                    }
                    Ok(Mapped::Ignored) => {}
                    Err(e) => {
                        // Unexpected wire data; skip the variable and keep
                        // walking the rest of the subtree.
                        tracing::warn!(
                            target = %self.target,
                            oid = %oid_to_string(&oid),
                            error = %e,
                            "value conversion failed"
                        );
                    }
                }
            }

            current = oid.to_owned();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_oids() {
        let ids: Vec<&str> = DEVICE_FAMILIES.iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["27", "38", "62"]);

        let family = DEVICE_FAMILIES[0];
        assert_eq!(
            family.identification_oid(),
            "1.3.6.1.4.1.28507.27.1.1.1.1.0"
        );
        assert_eq!(family.subtree(), "1.3.6.1.4.1.28507.27");
    }

    #[test]
    fn test_address_appends_default_port() {
        let poller = TargetPoller::new("10.0.0.5", "public", 161, Duration::from_secs(2));
        assert_eq!(poller.address(), "10.0.0.5:161");
    }

    #[test]
    fn test_address_keeps_explicit_port() {
        let poller = TargetPoller::new("10.0.0.5:1161", "public", 161, Duration::from_secs(2));
        assert_eq!(poller.address(), "10.0.0.5:1161");
    }
}
