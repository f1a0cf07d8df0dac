use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trailstitch::{
    assembler::build_route, config::AssemblyConfig, gpx_export::write_route_as_gpx,
    segment::extract_segments, store::TrailStore,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Stitch stored GPX trails into one route and write it as GPX"
)]
struct Args {
    /// Target route distance in kilometers
    distance_km: f64,

    /// Requested ascent ceiling in meters (reported, not enforced)
    max_ascent_m: f64,

    /// Directory holding the GPX trail recordings
    #[arg(long, env = "TRAILS_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Where the stitched route is written
    #[arg(long, default_value = "output/route.gpx")]
    output: PathBuf,

    #[command(flatten)]
    assembly: AssemblyConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let store = TrailStore::open(&args.data_dir)?;
    let traces = store.load_traces()?;
    tracing::info!(
        "loaded {} trace(s) from {} file(s) in {:?}",
        traces.len(),
        store.trail_files()?.len(),
        args.data_dir
    );

    let mut pool = extract_segments(&traces, args.assembly.max_segment_km);
    let route = build_route(&mut pool, args.distance_km, args.max_ascent_m);
    if route.is_empty() {
        return Err("no trail segments available, nothing to write".into());
    }

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(&args.output)?);
    write_route_as_gpx(&route, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        "route written to {:?}: {:.2} km, {:.1} m ascent over {} segment(s)",
        args.output,
        route.total_distance_km(),
        route.total_ascent_m(),
        route.len()
    );
    Ok(())
}
