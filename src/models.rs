use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Everything the probe learned about one DRM card.
///
/// Exactly one record is emitted per enumerated card. When identity or sensor
/// data could not be gathered the record is still emitted, with `error`
/// explaining what is missing and the metric maps left empty.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceRecord {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pci_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// Label -> degrees Celsius.
    pub temperatures: BTreeMap<String, f64>,
    /// Label -> Watts.
    pub powers: BTreeMap<String, f64>,
    /// Label -> RPM.
    pub fans: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: OffsetDateTime::now_utc(),
            pci_path: None,
            vendor: None,
            device_id: None,
            driver: None,
            temperatures: BTreeMap::new(),
            powers: BTreeMap::new(),
            fans: BTreeMap::new(),
            error: None,
        }
    }

    /// Record for a card whose probing failed outright.
    pub fn error_only(name: impl Into<String>, error: impl Into<String>) -> Self {
        let mut record = Self::new(name);
        record.error = Some(error.into());
        record
    }
}

/// One complete, timestamped pass of the discovery pipeline.
///
/// Recomputed fresh on every request or invocation; nothing is cached, so a
/// sensor disappearing between polls is visible in the next snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub cards: Vec<DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetricsSnapshot {
    /// Health predicate for the HTTP endpoint: the snapshot itself carries no
    /// error and at least one card read clean.
    pub fn healthy(&self) -> bool {
        self.error.is_none() && self.cards.iter().any(|c| c.error.is_none())
    }
}
