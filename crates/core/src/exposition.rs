//! Prometheus text rendering of a collection cycle.
//!
//! Each scrape gets its own registry so concurrent scrapes never see each
//! other's samples.

use crate::{
    error::Result,
    model::{PowerMetricKind, ScrapeOutcome, POWER_LABELS},
};
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

pub const UP_METRIC: &str = "redfish_up";
const UP_HELP: &str = "Whether the chassis set could be resolved during the last scrape (1 = yes)";

/// Content type of the rendered body
pub fn content_type() -> &'static str {
    prometheus::TEXT_FORMAT
}

/// Registry holding every family of one scrape
pub fn registry_for(outcome: &ScrapeOutcome) -> Result<Registry> {
    let registry = Registry::new();

    let up = Gauge::with_opts(Opts::new(UP_METRIC, UP_HELP))?;
    up.set(if outcome.discovery_ok { 1.0 } else { 0.0 });
    registry.register(Box::new(up))?;

    for kind in PowerMetricKind::ALL {
        let gauge = GaugeVec::new(Opts::new(kind.metric_name(), kind.help()), &POWER_LABELS)?;
        for sample in outcome.samples_of(kind) {
            gauge
                .get_metric_with_label_values(&[sample.chassis.as_str(), sample.control_name.as_str()])?
                .set(sample.value);
        }
        registry.register(Box::new(gauge))?;
    }

    Ok(registry)
}

/// Render a cycle as Prometheus text exposition
pub fn encode(outcome: &ScrapeOutcome) -> Result<String> {
    let families = registry_for(outcome)?.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
