use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::assembler::Route;
use crate::models::GeoPoint;

const CREATOR: &str = "trailstitch";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// Encode a route as a base64 GPX document, one track segment per route
/// segment.
pub fn encode_route_as_gpx(route: &Route) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_route_as_gpx(route, &mut buffer)?;
    Ok(BASE64.encode(buffer))
}

pub fn write_route_as_gpx(route: &Route, writer: impl Write) -> Result<(), ExportError> {
    let segments = route
        .segments()
        .iter()
        .map(|segment| to_track_segment(segment.points()));
    write_track(segments, writer)
}

/// Write all traces end to end into a single track segment.
pub fn merge_traces_as_gpx(traces: &[Vec<GeoPoint>], writer: impl Write) -> Result<(), ExportError> {
    let merged = to_track_segment(traces.iter().flatten());
    write_track(std::iter::once(merged), writer)
}

fn write_track(
    segments: impl IntoIterator<Item = TrackSegment>,
    writer: impl Write,
) -> Result<(), ExportError> {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some(CREATOR.into()),
        ..Default::default()
    };
    track.segments.extend(segments);
    gpx.tracks.push(track);

    gpx::write(&gpx, writer)?;
    Ok(())
}

fn to_track_segment<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> TrackSegment {
    let mut segment = TrackSegment::new();
    segment.points.extend(points.into_iter().map(to_waypoint));
    segment
}

fn to_waypoint(point: &GeoPoint) -> Waypoint {
    let mut waypoint = Waypoint::new(Point::new(point.lon, point.lat));
    waypoint.elevation = Some(point.elevation);
    waypoint
}
