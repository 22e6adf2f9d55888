//! DRM card enumeration under the device-class root.

use std::fs;
use std::path::Path;
use tracing::trace;

/// Lists primary card entries (`card<N>`) in ascending numeric order.
///
/// `renderD<N>` and `controlD<N>` are aliases of the same hardware and must
/// not produce records of their own; connector entries like `card0-eDP-1`
/// are excluded by the digits-only suffix check. A missing root yields an
/// empty list and is reported by the caller at the snapshot level.
pub fn enumerate_cards(drm_root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(drm_root) else {
        return Vec::new();
    };
    let mut cards: Vec<(u64, String)> = entries
        .flatten()
        .filter_map(|e| e.file_name().into_string().ok())
        .filter_map(|name| card_index(&name).map(|idx| (idx, name)))
        .collect();
    cards.sort();
    trace!(count = cards.len(), "enumerated drm cards");
    cards.into_iter().map(|(_, name)| name).collect()
}

/// Index of a primary card entry, `None` for anything else.
fn card_index(name: &str) -> Option<u64> {
    let suffix = name.strip_prefix("card")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
