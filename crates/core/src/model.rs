use serde::{Deserialize, Deserializer, Serialize};

/// Redfish resource link (`{ "@odata.id": "/redfish/v1/..." }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ODataLink {
    #[serde(rename = "@odata.id", default, deserialize_with = "null_as_default")]
    pub odata_id: String,
}

/// `/redfish/v1/Chassis` collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChassisCollection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<ODataLink>,
}

/// `<chassis>/Power` resource, reduced to the power control entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerResource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub power_control: Vec<PowerControl>,
}

/// Treat an explicit JSON `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One power rail or controller within a chassis.
///
/// Every reading is optional: a missing key and an explicit `null` both
/// decode to `None`, and `None` never turns into a sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerControl {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub member_id: Option<String>,

    #[serde(default)]
    pub power_consumed_watts: Option<f64>,

    #[serde(default)]
    pub power_metrics: Option<PowerMetrics>,
}

/// Statistics the controller computes over `interval_in_min`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerMetrics {
    #[serde(default)]
    pub average_consumed_watts: Option<f64>,

    #[serde(default)]
    pub min_consumed_watts: Option<f64>,

    #[serde(default)]
    pub max_consumed_watts: Option<f64>,

    #[serde(default)]
    pub interval_in_min: Option<f64>,
}

impl PowerControl {
    /// Label value for this control: `Name`, then `MemberId`, then empty
    pub fn control_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.member_id.as_deref())
            .unwrap_or("")
    }

    /// Present readings only, in `PowerMetricKind::ALL` order
    pub fn readings(&self) -> Vec<(PowerMetricKind, f64)> {
        let metrics = self.power_metrics.as_ref();
        let candidates = [
            (PowerMetricKind::Consumed, self.power_consumed_watts),
            (
                PowerMetricKind::Average,
                metrics.and_then(|m| m.average_consumed_watts),
            ),
            (PowerMetricKind::Min, metrics.and_then(|m| m.min_consumed_watts)),
            (PowerMetricKind::Max, metrics.and_then(|m| m.max_consumed_watts)),
        ];

        candidates
            .into_iter()
            .filter_map(|(kind, value)| value.map(|v| (kind, v)))
            .collect()
    }
}

/// Gauge families exported per power control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerMetricKind {
    Consumed,
    Average,
    Min,
    Max,
}

impl PowerMetricKind {
    pub const ALL: [PowerMetricKind; 4] = [
        Self::Consumed,
        Self::Average,
        Self::Min,
        Self::Max,
    ];

    pub fn metric_name(self) -> &'static str {
        match self {
            Self::Consumed => "redfish_power_consumed_watts",
            Self::Average => "redfish_power_average_watts",
            Self::Min => "redfish_power_min_watts",
            Self::Max => "redfish_power_max_watts",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Self::Consumed => "Instantaneous power consumption in watts",
            Self::Average => {
                "Average power consumption over the controller-provided interval in watts"
            }
            Self::Min => "Minimum power consumption over the controller-provided interval in watts",
            Self::Max => "Maximum power consumption over the controller-provided interval in watts",
        }
    }
}

/// Label names shared by every power gauge
pub const POWER_LABELS: [&str; 2] = ["chassis", "control_name"];

/// One gauge value ready for exposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub kind: PowerMetricKind,
    pub chassis: String,
    pub control_name: String,
    pub value: f64,
}

/// Result of one collection cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub samples: Vec<PowerSample>,

    /// False when chassis discovery failed and nothing could be fetched
    pub discovery_ok: bool,

    pub chassis_total: usize,
    pub chassis_failed: usize,
}

impl ScrapeOutcome {
    pub fn samples_of(&self, kind: PowerMetricKind) -> impl Iterator<Item = &PowerSample> {
        self.samples.iter().filter(move |s| s.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_member_id_is_empty() {
        let collection: ChassisCollection = serde_json::from_str(
            r#"{"Members": [{"@odata.id": null}, {"@odata.id": "/redfish/v1/Chassis/1"}]}"#,
        )
        .unwrap();
        assert_eq!(collection.members.len(), 2);
        assert_eq!(collection.members[0].odata_id, "");
        assert_eq!(collection.members[1].odata_id, "/redfish/v1/Chassis/1");
    }

    #[test]
    fn test_null_members() {
        let collection: ChassisCollection = serde_json::from_str(r#"{"Members": null}"#).unwrap();
        assert!(collection.members.is_empty());
    }

    #[test]
    fn test_null_power_control() {
        let power: PowerResource = serde_json::from_str(r#"{"PowerControl": null}"#).unwrap();
        assert!(power.power_control.is_empty());
    }

    #[test]
    fn test_null_still_rejects_wrong_types() {
        let result: Result<ChassisCollection, _> = serde_json::from_str(r#"{"Members": {"@odata.id": "x"}}"#);
        assert!(result.is_err());

        let result: Result<ChassisCollection, _> = serde_json::from_str(r#"{"Members": [{"@odata.id": 5}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_budget_fields_are_not_readings() {
        let control: PowerControl = serde_json::from_str(
            r#"{"Name": "Chassis Power", "PowerRequestedWatts": 500, "PowerAvailableWatts": 250,
                "PowerCapacityWatts": 750, "PowerConsumedWatts": 320}"#,
        )
        .unwrap();
        assert_eq!(control.readings(), vec![(PowerMetricKind::Consumed, 320.0)]);
    }

    #[test]
    fn test_exactly_four_series() {
        let names: Vec<_> = PowerMetricKind::ALL.iter().map(|k| k.metric_name()).collect();
        assert_eq!(
            names,
            vec![
                "redfish_power_consumed_watts",
                "redfish_power_average_watts",
                "redfish_power_min_watts",
                "redfish_power_max_watts"
            ]
        );
    }
}
