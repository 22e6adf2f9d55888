//! Command-line surface.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "xe-probe",
    about = "Best-effort Intel Xe GPU telemetry probe (DRM + hwmon sysfs)",
    version
)]
pub struct Cli {
    /// Port the HTTP endpoint listens on in daemon mode.
    #[arg(long, default_value_t = 9200)]
    pub port: u16,

    /// Serve /metrics and /health over HTTP instead of printing one snapshot.
    #[arg(long)]
    pub daemon: bool,

    /// Verbose diagnostics to the fixed debug log file instead of stderr.
    #[arg(long)]
    pub debug: bool,
}
