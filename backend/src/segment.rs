//! Bounded-length runs of trail points and the splitter that produces them.

use rayon::prelude::*;

use crate::metrics::{ascent_m, descent_m, haversine_km, path_distance_km};
use crate::models::GeoPoint;
use crate::pool::SegmentPool;

pub const DEFAULT_MAX_SEGMENT_KM: f64 = 1.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("a segment needs at least 2 points, got {0}")]
    TooFewPoints(usize),
}

/// Where a segment came from: the index of its source trace in the
/// extraction input and its position inside that trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    pub trace: usize,
    pub piece: usize,
}

/// An ordered run of at least two points.
///
/// Length, ascent and descent are computed once in [`Segment::new`] and never
/// recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    id: SegmentId,
    points: Vec<GeoPoint>,
    length_km: f64,
    ascent_m: f64,
    descent_m: f64,
}

impl Segment {
    pub fn new(id: SegmentId, points: Vec<GeoPoint>) -> Result<Self, SegmentError> {
        if points.len() < 2 {
            return Err(SegmentError::TooFewPoints(points.len()));
        }
        let length_km = path_distance_km(&points);
        let ascent = ascent_m(points.iter().map(|p| p.elevation));
        let descent = descent_m(points.iter().map(|p| p.elevation));
        Ok(Self {
            id,
            points,
            length_km,
            ascent_m: ascent,
            descent_m: descent,
        })
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for the `len`/`is_empty` pair.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn first(&self) -> GeoPoint {
        self.points[0]
    }

    #[inline]
    pub fn last(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    #[inline]
    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    #[inline]
    pub fn ascent_m(&self) -> f64 {
        self.ascent_m
    }

    #[inline]
    pub fn descent_m(&self) -> f64 {
        self.descent_m
    }
}

/// Cut one trace into segments of at least `max_len_km` each.
///
/// A run is closed as soon as its accumulated length reaches `max_len_km`;
/// the closing point also opens the next run, so neighbouring segments share
/// their boundary point. A trailing run shorter than the limit is kept when it
/// has more than one point.
pub fn split_segments(trace: usize, points: &[GeoPoint], max_len_km: f64) -> Vec<Segment> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut run = vec![first];
    let mut run_km = 0.0;

    for &point in rest {
        run_km += haversine_km(run[run.len() - 1], point);
        run.push(point);

        if run_km >= max_len_km {
            let id = SegmentId {
                trace,
                piece: segments.len(),
            };
            let closed = std::mem::replace(&mut run, vec![point]);
            segments.extend(Segment::new(id, closed).ok());
            run_km = 0.0;
        }
    }

    let id = SegmentId {
        trace,
        piece: segments.len(),
    };
    // A lone boundary point is rejected here and dropped.
    segments.extend(Segment::new(id, run).ok());
    segments
}

/// Split every trace and gather the pieces into one pool.
///
/// Traces are split in parallel; the pool keeps trace order, then piece order.
/// Pieces of zero length (repeated fixes of a stationary receiver) are left
/// out so that every pooled segment adds distance to a route.
pub fn extract_segments(traces: &[Vec<GeoPoint>], max_len_km: f64) -> SegmentPool {
    let pieces: Vec<Segment> = traces
        .par_iter()
        .enumerate()
        .map(|(trace, points)| split_segments(trace, points, max_len_km))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();

    let total = pieces.len();
    let segments: Vec<Segment> = pieces
        .into_iter()
        .filter(|segment| segment.length_km() > 0.0)
        .collect();
    if segments.len() < total {
        tracing::debug!("dropped {} zero-length segments", total - segments.len());
    }

    tracing::debug!(
        "extracted {} segments from {} traces (max {:.2} km each)",
        segments.len(),
        traces.len(),
        max_len_km
    );
    SegmentPool::from_segments(segments)
}
