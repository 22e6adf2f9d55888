//! Discovery-and-normalization pipeline.
//!
//! Strict call order: enumerate DRM cards, locate each card's hwmon sensor
//! groups, parse and merge the groups into one record per card. Failures are
//! contained at the smallest applicable scope (sensor < device < snapshot)
//! and converted into `error` fields, never into a process failure.

mod drm;
mod hwmon;

pub use hwmon::HwmonMetrics;

use crate::models::{DeviceRecord, MetricsSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Diagnostic for a card that resolved fine but exposed nothing parseable.
const NO_METRICS_ERROR: &str = "no hwmon metrics found; kernel/driver may not expose sensors";

/// Per-card resolution failures. These become the record's `error` string;
/// the card stays in the snapshot.
#[derive(Debug, Error)]
enum ProbeError {
    #[error("no device link")]
    NoDeviceLink,
    #[error("failed to resolve device: {0}")]
    ResolveDevice(#[source] std::io::Error),
}

/// Filesystem roots the pipeline reads from.
///
/// Production uses the kernel defaults; tests point these at a fixture tree.
/// Everything is read-only and recomputed per call, so one `Probe` can serve
/// concurrent requests without any locking.
#[derive(Debug, Clone)]
pub struct Probe {
    pub drm_root: PathBuf,
    pub hwmon_root: PathBuf,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            drm_root: PathBuf::from("/sys/class/drm"),
            hwmon_root: PathBuf::from("/sys/class/hwmon"),
        }
    }
}

impl Probe {
    /// Runs the full pipeline once and returns a fresh snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let timestamp = OffsetDateTime::now_utc();
        if !self.drm_root.exists() {
            return MetricsSnapshot {
                timestamp,
                cards: Vec::new(),
                error: Some(format!("{} not present", self.drm_root.display())),
            };
        }

        let mut cards = Vec::new();
        for name in drm::enumerate_cards(&self.drm_root) {
            let record = match self.probe_card(&name) {
                Ok(record) => record,
                Err(e) => {
                    warn!(card = %name, "probe failed: {e}");
                    DeviceRecord::error_only(name.as_str(), e.to_string())
                }
            };
            cards.push(record);
        }

        let error = cards.is_empty().then(|| "no drm cards found".to_string());
        MetricsSnapshot {
            timestamp,
            cards,
            error,
        }
    }

    /// Builds the record for one card. `Err` means the card's physical-bus
    /// identity could not be resolved at all; partial sensor data is not an
    /// error here.
    fn probe_card(&self, name: &str) -> Result<DeviceRecord, ProbeError> {
        let mut record = DeviceRecord::new(name);

        let device_link = self.drm_root.join(name).join("device");
        if !device_link.exists() {
            return Err(ProbeError::NoDeviceLink);
        }
        let pci_dev = fs::canonicalize(&device_link).map_err(ProbeError::ResolveDevice)?;
        record.pci_path = Some(pci_dev.display().to_string());

        // Identity reads are each independently best-effort.
        record.vendor = hwmon::read_trimmed(&pci_dev.join("vendor"));
        record.device_id = hwmon::read_trimmed(&pci_dev.join("device"));
        record.driver = driver_name(&pci_dev);

        let groups = hwmon::locate_groups(&pci_dev, &self.hwmon_root);
        let mut metrics = HwmonMetrics::default();
        for group in &groups {
            metrics.merge(hwmon::parse_group(group));
        }
        debug!(
            card = name,
            temperatures = metrics.temperatures.len(),
            powers = metrics.powers.len(),
            fans = metrics.fans.len(),
            "card probed"
        );

        if metrics.is_empty() {
            record.error = Some(NO_METRICS_ERROR.to_string());
        }
        record.temperatures = metrics.temperatures;
        record.powers = metrics.powers;
        record.fans = metrics.fans;
        Ok(record)
    }
}

/// The `driver` entry is a symlink into the bus's drivers directory; its
/// basename names the bound driver.
fn driver_name(pci_dev: &Path) -> Option<String> {
    let target = fs::canonicalize(pci_dev.join("driver")).ok()?;
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    /// Minimal sysfs-shaped fixture: one PCI device bound to the `xe`
    /// driver, with a DRM card entry pointing at it.
    struct Fixture {
        _root: TempDir,
        probe: Probe,
        pci_dev: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let pci_dev = root.path().join("devices/pci0000:00/0000:03:00.0");
        fs::create_dir_all(&pci_dev).unwrap();
        fs::write(pci_dev.join("vendor"), "0x8086\n").unwrap();
        fs::write(pci_dev.join("device"), "0xe20b\n").unwrap();

        let drivers = root.path().join("bus/pci/drivers/xe");
        fs::create_dir_all(&drivers).unwrap();
        symlink(&drivers, pci_dev.join("driver")).unwrap();

        let drm_root = root.path().join("class/drm");
        fs::create_dir_all(drm_root.join("card0")).unwrap();
        symlink(&pci_dev, drm_root.join("card0/device")).unwrap();

        let hwmon_root = root.path().join("class/hwmon");
        fs::create_dir_all(&hwmon_root).unwrap();

        Fixture {
            probe: Probe {
                drm_root,
                hwmon_root,
            },
            pci_dev,
            _root: root,
        }
    }

    fn write_sensor(group: &Path, file: &str, value: &str) {
        fs::create_dir_all(group).unwrap();
        fs::write(group.join(file), value).unwrap();
    }

    #[test]
    fn absent_drm_root_short_circuits_with_snapshot_error() {
        let root = tempfile::tempdir().unwrap();
        let probe = Probe {
            drm_root: root.path().join("gone"),
            hwmon_root: root.path().join("hwmon"),
        };
        let snapshot = probe.snapshot();
        assert!(snapshot.cards.is_empty());
        assert!(snapshot.error.as_deref().unwrap().contains("not present"));
    }

    #[test]
    fn zero_cards_still_yields_well_formed_snapshot() {
        let root = tempfile::tempdir().unwrap();
        let probe = Probe {
            drm_root: root.path().to_path_buf(),
            hwmon_root: root.path().join("hwmon"),
        };
        let snapshot = probe.snapshot();
        assert!(snapshot.cards.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some("no drm cards found"));
    }

    #[test]
    fn missing_device_link_yields_error_record_still_listed() {
        let fix = fixture();
        fs::create_dir(fix.probe.drm_root.join("card1")).unwrap();

        let snapshot = fix.probe.snapshot();
        assert_eq!(snapshot.cards.len(), 2);
        let card1 = &snapshot.cards[1];
        assert_eq!(card1.name, "card1");
        assert_eq!(card1.error.as_deref(), Some("no device link"));
        assert!(card1.pci_path.is_none());
        assert!(card1.temperatures.is_empty());
    }

    #[test]
    fn resolved_card_carries_identity_fields() {
        let fix = fixture();
        write_sensor(&fix.pci_dev.join("hwmon/hwmon0"), "temp1_input", "42000\n");

        let snapshot = fix.probe.snapshot();
        let card = &snapshot.cards[0];
        assert_eq!(card.vendor.as_deref(), Some("0x8086"));
        assert_eq!(card.device_id.as_deref(), Some("0xe20b"));
        assert_eq!(card.driver.as_deref(), Some("xe"));
        assert_eq!(
            card.pci_path.as_deref(),
            Some(fs::canonicalize(&fix.pci_dev).unwrap().to_str().unwrap())
        );
        assert_eq!(card.temperatures["temp1_input"], 42.0);
        assert!(card.error.is_none());
    }

    #[test]
    fn card_without_parseable_sensors_gets_fixed_diagnostic() {
        let fix = fixture();
        let snapshot = fix.probe.snapshot();
        let card = &snapshot.cards[0];
        assert_eq!(card.error.as_deref(), Some(NO_METRICS_ERROR));
        assert!(card.temperatures.is_empty());
        assert!(card.powers.is_empty());
        assert!(card.fans.is_empty());
        // Identity was still gathered.
        assert_eq!(card.driver.as_deref(), Some("xe"));
    }

    #[test]
    fn later_group_overwrites_earlier_on_label_collision() {
        let fix = fixture();
        let hwmon = fix.pci_dev.join("hwmon");
        write_sensor(&hwmon.join("hwmon0"), "temp1_input", "40000\n");
        write_sensor(&hwmon.join("hwmon0"), "temp1_label", "pkg\n");
        write_sensor(&hwmon.join("hwmon1"), "temp1_input", "70000\n");
        write_sensor(&hwmon.join("hwmon1"), "temp1_label", "pkg\n");

        let snapshot = fix.probe.snapshot();
        assert_eq!(snapshot.cards[0].temperatures["pkg"], 70.0);
    }

    #[test]
    fn global_scan_groups_merge_after_device_local_ones() {
        let fix = fixture();
        write_sensor(&fix.pci_dev.join("hwmon/hwmon0"), "power1_input", "5000\n");
        write_sensor(
            &fix.pci_dev.join("hwmon/hwmon0"),
            "power1_label",
            "card\n",
        );

        let global = fix.probe.hwmon_root.join("hwmon7");
        write_sensor(&global, "power1_input", "9000000\n");
        write_sensor(&global, "power1_label", "card\n");
        fs::write(global.join("name"), "intel_gpu_extra\n").unwrap();

        let snapshot = fix.probe.snapshot();
        assert_eq!(snapshot.cards[0].powers["card"], 9.0);
    }

    #[test]
    fn consecutive_snapshots_are_identical_modulo_timestamps() {
        let fix = fixture();
        write_sensor(&fix.pci_dev.join("hwmon/hwmon0"), "temp1_input", "42000\n");
        write_sensor(&fix.pci_dev.join("hwmon/hwmon0"), "fan1_input", "1200\n");

        let strip = |snapshot: &MetricsSnapshot| {
            let mut v = serde_json::to_value(snapshot).unwrap();
            v.as_object_mut().unwrap().remove("timestamp");
            for card in v["cards"].as_array_mut().unwrap() {
                card.as_object_mut().unwrap().remove("timestamp");
            }
            v
        };
        let a = fix.probe.snapshot();
        let b = fix.probe.snapshot();
        assert_eq!(strip(&a), strip(&b));
    }
}
