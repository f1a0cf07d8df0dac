use crate::metrics::haversine_km;
use crate::models::GeoPoint;
use crate::segment::Segment;

/// Segments not yet used by a route, in extraction order.
///
/// Taking a segment out keeps the relative order of the rest, so
/// "first in pool order" stays meaningful for tie-breaks.
#[derive(Debug, Clone, Default)]
pub struct SegmentPool {
    segments: Vec<Segment>,
}

impl SegmentPool {
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Remove the segment with the most points; the earliest wins ties.
    pub fn take_longest(&mut self) -> Option<Segment> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, segment) in self.segments.iter().enumerate() {
            match best {
                Some((_, count)) if segment.len() <= count => {}
                _ => best = Some((idx, segment.len())),
            }
        }
        best.map(|(idx, _)| self.segments.remove(idx))
    }

    /// Remove the segment whose first point is closest to `from`, provided
    /// that distance is strictly below `threshold_km`.
    ///
    /// Returns the segment and its connector distance. Equal distances go to
    /// the earliest segment in pool order.
    pub fn take_nearest(&mut self, from: GeoPoint, threshold_km: f64) -> Option<(Segment, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, segment) in self.segments.iter().enumerate() {
            let connector_km = haversine_km(from, segment.first());
            let closer = match best {
                Some((_, best_km)) => connector_km < best_km,
                None => true,
            };
            if closer {
                best = Some((idx, connector_km));
            }
        }

        match best {
            Some((idx, connector_km)) if connector_km < threshold_km => {
                Some((self.segments.remove(idx), connector_km))
            }
            _ => None,
        }
    }
}

impl IntoIterator for SegmentPool {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}
