use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use crate::models::GeoPoint;

#[derive(Debug, thiserror::Error)]
pub enum TrailError {
    #[error("failed to read trail file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// Read every track segment of a GPX document as a point sequence.
///
/// Points without an elevation are dropped; sequences left with fewer than
/// two points are skipped.
pub fn read_traces(reader: impl Read) -> Result<Vec<Vec<GeoPoint>>, TrailError> {
    let gpx = gpx::read(reader)?;

    let mut traces = Vec::new();
    let mut dropped = 0usize;
    for track in &gpx.tracks {
        for segment in &track.segments {
            let trace: Vec<GeoPoint> = segment
                .points
                .iter()
                .filter_map(|waypoint| {
                    let point = waypoint.point();
                    match waypoint.elevation {
                        Some(elevation) => Some(GeoPoint::new(point.y(), point.x(), elevation)),
                        None => {
                            dropped += 1;
                            None
                        }
                    }
                })
                .collect();
            if trace.len() > 1 {
                traces.push(trace);
            }
        }
    }

    if dropped > 0 {
        tracing::warn!("dropped {dropped} track point(s) without elevation");
    }
    Ok(traces)
}

pub fn read_traces_from_path(path: impl AsRef<Path>) -> Result<Vec<Vec<GeoPoint>>, TrailError> {
    let file = File::open(path)?;
    read_traces(BufReader::new(file))
}
