//! hwmon sensor-group discovery and parsing.
//!
//! Where a driver attaches its hwmon interface relative to the PCI function
//! is not consistent across kernel versions, so discovery unions three
//! strategies and deduplicates rather than trusting any single lookup:
//! 1. hwmon directories directly under the card's PCI device
//! 2. hwmon directories on a sibling PCI function (some drivers register
//!    sensors on a companion function instead of the primary one)
//! 3. a global scan of the hwmon class root, cross-checked by the group's
//!    `device` back-reference, falling back to a name heuristic

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Chip names that tie an otherwise unattributed hwmon group to a GPU.
const GPU_NAME_TOKENS: [&str; 3] = ["gpu", "intel", "i915"];

/// Metric maps parsed out of one or more hwmon groups.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HwmonMetrics {
    pub temperatures: BTreeMap<String, f64>,
    pub powers: BTreeMap<String, f64>,
    pub fans: BTreeMap<String, u64>,
}

impl HwmonMetrics {
    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty() && self.powers.is_empty() && self.fans.is_empty()
    }

    /// Folds `other` in; on label collision the incoming value wins, so the
    /// caller controls precedence through merge order.
    pub fn merge(&mut self, other: HwmonMetrics) {
        self.temperatures.extend(other.temperatures);
        self.powers.extend(other.powers);
        self.fans.extend(other.fans);
    }
}

/// Reads a small sysfs text file, trimmed. `None` on any failure.
pub fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Gathers every hwmon group plausibly belonging to the PCI device at
/// `pci_dev`, order-stable and deduplicated by canonical directory identity.
///
/// All three strategies always run; recall is preferred over a single
/// authoritative path. Individual resolution failures (unreadable links,
/// permissions, device removal races) are skipped, never propagated.
pub fn locate_groups(pci_dev: &Path, hwmon_root: &Path) -> Vec<PathBuf> {
    let candidates = groups_under_device(pci_dev)
        .into_iter()
        .chain(groups_under_siblings(pci_dev))
        .chain(groups_from_global_scan(hwmon_root, pci_dev));

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut groups = Vec::new();
    for dir in candidates {
        let identity = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if seen.insert(identity) {
            groups.push(dir);
        }
    }
    debug!(device = %pci_dev.display(), groups = groups.len(), "hwmon groups located");
    groups
}

/// Strategy 1: `<pci_dev>/hwmon/hwmon*`.
fn groups_under_device(pci_dev: &Path) -> Vec<PathBuf> {
    hwmon_dirs_in(&pci_dev.join("hwmon"))
}

/// Strategy 2: `<pci_dev>/../<sibling>/hwmon/hwmon*`. The device itself is
/// among the scanned entries; deduplication removes the repeats.
fn groups_under_siblings(pci_dev: &Path) -> Vec<PathBuf> {
    let Some(parent) = pci_dev.parent() else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };
    let mut siblings: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    siblings.sort();
    siblings
        .iter()
        .flat_map(|sib| hwmon_dirs_in(&sib.join("hwmon")))
        .collect()
}

/// Strategy 3: scan the hwmon class root. A group is included when its
/// `device` back-reference resolves inside the card's PCI path (or the other
/// way round, for "device under sensor group" topologies); failing that, a
/// last-resort heuristic on the declared chip name.
fn groups_from_global_scan(hwmon_root: &Path, pci_dev: &Path) -> Vec<PathBuf> {
    hwmon_dirs_in(hwmon_root)
        .into_iter()
        .filter(|hw| back_reference_matches(hw, pci_dev) || name_looks_gpu(hw))
        .collect()
}

fn back_reference_matches(hw: &Path, pci_dev: &Path) -> bool {
    let Ok(target) = fs::canonicalize(hw.join("device")) else {
        return false;
    };
    target.starts_with(pci_dev) || pci_dev.starts_with(&target)
}

fn name_looks_gpu(hw: &Path) -> bool {
    let Some(name) = read_trimmed(&hw.join("name")) else {
        return false;
    };
    let name = name.to_lowercase();
    let matched = GPU_NAME_TOKENS.iter().any(|t| name.contains(t));
    if matched {
        trace!(group = %hw.display(), name = %name, "included hwmon group by name heuristic");
    }
    matched
}

/// `hwmon*` child directories of `dir`, sorted for a reproducible merge order.
fn hwmon_dirs_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("hwmon"))
        })
        .collect();
    dirs.sort();
    dirs
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SensorKind {
    Temp,
    Power,
    Fan,
}

/// Parses one hwmon group: every `{temp|power|fan}<N>_input` file it exposes.
///
/// Files that are unreadable or do not hold an integer are skipped silently;
/// whatever else the group exposes is still returned.
pub fn parse_group(hw: &Path) -> HwmonMetrics {
    let mut metrics = HwmonMetrics::default();
    let Ok(entries) = fs::read_dir(hw) else {
        return metrics;
    };
    let mut inputs: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    inputs.sort();

    for input in inputs {
        let Some(file_name) = input.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(kind) = sensor_kind(file_name) else {
            continue;
        };
        let Some(raw) = read_trimmed(&input).and_then(|s| s.parse::<i64>().ok()) else {
            continue;
        };
        let label = sensor_label(&input, file_name);
        match kind {
            SensorKind::Temp => {
                metrics.temperatures.insert(label, normalize_temp(raw));
            }
            SensorKind::Power => {
                metrics.powers.insert(label, normalize_power(raw));
            }
            SensorKind::Fan => {
                // RPM is reported as-is; a negative reading is garbage.
                if raw >= 0 {
                    metrics.fans.insert(label, raw as u64);
                }
            }
        }
    }
    metrics
}

/// Classifies `<kind><N>_input` file names, `None` for anything else.
fn sensor_kind(file_name: &str) -> Option<SensorKind> {
    let prefixed = file_name.strip_suffix("_input")?;
    for (prefix, kind) in [
        ("temp", SensorKind::Temp),
        ("power", SensorKind::Power),
        ("fan", SensorKind::Fan),
    ] {
        if let Some(n) = prefixed.strip_prefix(prefix) {
            if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) {
                return Some(kind);
            }
        }
    }
    None
}

/// Label for a sensor: the trimmed content of the sibling `*_label` file if
/// present and non-empty, else the input file's own stem.
fn sensor_label(input: &Path, file_name: &str) -> String {
    let label_file = input.with_file_name(file_name.replace("_input", "_label"));
    read_trimmed(&label_file)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file_name)
                .to_string()
        })
}

/// Millidegrees vs degrees is guessed from magnitude: kernels report either,
/// and there is no in-band marker. A genuine reading near the threshold is
/// indistinguishable, so this stays a documented best-effort heuristic.
fn normalize_temp(raw: i64) -> f64 {
    if raw > 1000 {
        raw as f64 / 1000.0
    } else {
        raw as f64
    }
}

/// Same magnitude guess for power: microwatts, then milliwatts, then watts.
fn normalize_power(raw: i64) -> f64 {
    if raw > 1_000_000 {
        raw as f64 / 1_000_000.0
    } else if raw > 1000 {
        raw as f64 / 1000.0
    } else {
        raw as f64
    }
}
