use crate::{
    client::{TelemetrySource, CHASSIS_COLLECTION_PATH},
    config::MAX_SCRAPE_TIMEOUT,
    error::Result,
    model::{PowerResource, PowerSample, ScrapeOutcome},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Prefix that marks a chassis override as a full resource path
pub const REDFISH_ROOT_PREFIX: &str = "/redfish/";

/// Settings for one collection cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Deadline shared by every request of a cycle
    pub scrape_timeout: Duration,

    /// Restrict collection to one chassis instead of discovering all of them
    pub chassis_id: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(10),
            chassis_id: None,
        }
    }
}

/// Runs collection cycles against a telemetry source.
///
/// Holds no per-cycle state, so concurrent scrapes can share one instance.
pub struct RedfishCollector<S> {
    source: S,
    config: CollectorConfig,
}

impl<S: TelemetrySource> RedfishCollector<S> {
    pub fn new(source: S, config: CollectorConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one cycle bounded by the configured scrape timeout
    pub async fn collect(&self) -> ScrapeOutcome {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.scrape_timeout)
            .unwrap_or_else(|| now + MAX_SCRAPE_TIMEOUT);
        self.collect_until(deadline).await
    }

    /// Run one cycle; every request in it aborts once `deadline` passes
    pub async fn collect_until(&self, deadline: Instant) -> ScrapeOutcome {
        let targets = match self.resolve_targets(deadline).await {
            Ok(targets) => targets,
            Err(e) => {
                tracing::warn!(error = %e, "error listing chassis");
                return ScrapeOutcome::default();
            }
        };

        let mut outcome = ScrapeOutcome {
            discovery_ok: true,
            chassis_total: targets.len(),
            ..ScrapeOutcome::default()
        };

        for chassis in &targets {
            match self.source.chassis_power(chassis, deadline).await {
                Ok(power) => push_samples(&mut outcome.samples, chassis, &power),
                Err(e) => {
                    tracing::warn!(chassis = %chassis, error = %e, "error getting chassis power");
                    outcome.chassis_failed += 1;
                }
            }
        }

        tracing::debug!(
            chassis = outcome.chassis_total,
            failed = outcome.chassis_failed,
            samples = outcome.samples.len(),
            "collection cycle finished"
        );
        outcome
    }

    /// Chassis references to fetch this cycle
    pub async fn resolve_targets(&self, deadline: Instant) -> Result<Vec<String>> {
        match self.config.chassis_id.as_deref().and_then(chassis_override) {
            Some(chassis) => Ok(vec![chassis]),
            None => self.source.list_chassis(deadline).await,
        }
    }
}

/// Full resource path for a configured chassis override, `None` when unset
pub fn chassis_override(chassis_id: &str) -> Option<String> {
    let chassis_id = chassis_id.trim();
    if chassis_id.is_empty() {
        None
    } else if chassis_id.starts_with(REDFISH_ROOT_PREFIX) {
        Some(chassis_id.to_string())
    } else {
        Some(format!("{}/{}", CHASSIS_COLLECTION_PATH, chassis_id))
    }
}

/// Last path segment of a chassis reference, used as the `chassis` label
pub fn chassis_label(chassis: &str) -> &str {
    let trimmed = chassis.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

fn push_samples(samples: &mut Vec<PowerSample>, chassis: &str, power: &PowerResource) {
    let label = chassis_label(chassis);
    for control in &power.power_control {
        for (kind, value) in control.readings() {
            samples.push(PowerSample {
                kind,
                chassis: label.to_string(),
                control_name: control.control_name().to_string(),
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chassis_label() {
        assert_eq!(chassis_label("/redfish/v1/Chassis/1"), "1");
        assert_eq!(chassis_label("/redfish/v1/Chassis/System.Embedded.1/"), "System.Embedded.1");
        assert_eq!(chassis_label("/redfish/v1/Chassis/Enclosure//"), "Enclosure");
        assert_eq!(chassis_label("Self"), "Self");
        assert_eq!(chassis_label(""), "");
        assert_eq!(chassis_label("/"), "");
    }

    #[test]
    fn test_chassis_override_bare_id() {
        assert_eq!(chassis_override("1").as_deref(), Some("/redfish/v1/Chassis/1"));
    }

    #[test]
    fn test_chassis_override_full_path() {
        assert_eq!(
            chassis_override("/redfish/v1/Chassis/1").as_deref(),
            Some("/redfish/v1/Chassis/1")
        );
    }

    #[test]
    fn test_chassis_override_blank() {
        assert_eq!(chassis_override(""), None);
        assert_eq!(chassis_override("   "), None);
    }

    #[test]
    fn test_collector_config_default() {
        let config = CollectorConfig::default();
        assert_eq!(config.scrape_timeout, Duration::from_secs(10));
        assert!(config.chassis_id.is_none());
    }
}
