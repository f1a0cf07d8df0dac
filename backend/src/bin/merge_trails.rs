use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trailstitch::{gpx_export::merge_traces_as_gpx, store::TrailStore};

#[derive(Debug, Parser)]
#[command(author, version, about = "Merge every stored GPX trail into one file")]
struct Args {
    /// Directory holding the GPX trail recordings
    #[arg(long, env = "TRAILS_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Where the merged GPX is written
    #[arg(long, default_value = "output/output.gpx")]
    output: PathBuf,
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
    if traces.is_empty() {
        tracing::warn!("no GPX trail found in {:?}", args.data_dir);
        return Ok(());
    }

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(&args.output)?);
    merge_traces_as_gpx(&traces, &mut writer)?;
    writer.flush()?;

    tracing::info!("merged {} trace(s) into {:?}", traces.len(), args.output);
    Ok(())
}
