//! xe-probe - best-effort Intel Xe GPU telemetry probe
//!
//! Walks the kernel's DRM class directory to find GPU cards, correlates each
//! card with the hwmon sensor groups that belong to it, and normalizes the
//! raw readings into a JSON snapshot:
//! - Temperatures in degrees Celsius
//! - Power draw in Watts
//! - Fan speeds in RPM
//!
//! Different kernels and driver versions expose different attributes, so the
//! whole pipeline is best-effort: missing data becomes an `error` field on
//! the affected record, never a process failure.

pub mod cli;
pub mod http;
pub mod logging;
pub mod models;
pub mod probe;
