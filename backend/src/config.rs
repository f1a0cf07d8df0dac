use std::{net::SocketAddr, path::PathBuf};

use clap::Args;

use crate::segment::DEFAULT_MAX_SEGMENT_KM;

/// How trails are cut before stitching.
#[derive(Debug, Clone, Copy, Args)]
pub struct AssemblyConfig {
    /// Trails are cut into pieces of about this many kilometers
    #[arg(
        long,
        env = "MAX_SEGMENT_KM",
        default_value_t = DEFAULT_MAX_SEGMENT_KM,
        value_parser = parse_positive_km
    )]
    pub max_segment_km: f64,
}

fn parse_positive_km(raw: &str) -> Result<f64, String> {
    let km: f64 = raw.parse().map_err(|err| format!("{raw:?} is not a number: {err}"))?;
    if km.is_finite() && km > 0.0 {
        Ok(km)
    } else {
        Err(format!("expected a positive distance in km, got {raw}"))
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_segment_km: DEFAULT_MAX_SEGMENT_KM,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Directory holding the GPX trail recordings
    #[arg(long, env = "TRAILS_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub assembly: AssemblyConfig,
}
