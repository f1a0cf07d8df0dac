use crate::models::GeoPoint;
use crate::pool::SegmentPool;
use crate::segment::Segment;

/// Candidates whose first point is this far or farther from the current route
/// end are never joined.
pub const CONNECTOR_THRESHOLD_KM: f64 = 1.0;

/// A chain of segments joined end to start by straight connector legs.
///
/// `connectors_km[i]` is the leg leading into `segments[i + 1]`; the seed has
/// none. Totals include the connector legs.
#[derive(Debug, Clone, Default)]
pub struct Route {
    segments: Vec<Segment>,
    connectors_km: Vec<f64>,
    total_distance_km: f64,
    total_ascent_m: f64,
}

impl Route {
    fn seeded(seed: Segment) -> Self {
        Self {
            total_distance_km: seed.length_km(),
            total_ascent_m: seed.ascent_m(),
            segments: vec![seed],
            connectors_km: Vec::new(),
        }
    }

    fn extend(&mut self, segment: Segment, connector_km: f64) {
        self.total_distance_km += connector_km + segment.length_km();
        self.total_ascent_m += segment.ascent_m();
        self.connectors_km.push(connector_km);
        self.segments.push(segment);
    }

    fn end_point(&self) -> Option<GeoPoint> {
        self.segments.last().map(Segment::last)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn connectors_km(&self) -> &[f64] {
        &self.connectors_km
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn total_ascent_m(&self) -> f64 {
        self.total_ascent_m
    }

    /// Descent over the chosen segments; connector legs carry no elevation.
    pub fn total_descent_m(&self) -> f64 {
        self.segments.iter().map(Segment::descent_m).sum()
    }

    pub fn exceeds_ascent_ceiling(&self, max_ascent_m: f64) -> bool {
        self.total_ascent_m > max_ascent_m
    }

    /// Every point of every segment, in travel order.
    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.segments.iter().flat_map(|s| s.points().iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

/// Greedily chain pool segments into one route.
///
/// Seeds with the segment holding the most points, then keeps appending the
/// segment whose start is nearest to the current end, as long as that
/// connector is under [`CONNECTOR_THRESHOLD_KM`] and the distance so far is
/// below `target_distance_km`. Accepted segments are removed from `pool`.
///
/// `max_ascent_m` does not influence which segments are chosen or when the
/// loop stops; an overshoot is only logged.
pub fn build_route(pool: &mut SegmentPool, target_distance_km: f64, max_ascent_m: f64) -> Route {
    let Some(seed) = pool.take_longest() else {
        tracing::warn!("no segment available, cannot build a route");
        return Route::default();
    };
    tracing::debug!(
        "seeded route with segment {:?} ({} points, {:.2} km)",
        seed.id(),
        seed.len(),
        seed.length_km()
    );
    let mut route = Route::seeded(seed);

    while route.total_distance_km < target_distance_km && !pool.is_empty() {
        let Some(from) = route.end_point() else {
            break;
        };
        let Some((segment, connector_km)) = pool.take_nearest(from, CONNECTOR_THRESHOLD_KM) else {
            tracing::info!(
                "no segment starts within {CONNECTOR_THRESHOLD_KM} km of the route end, stopping"
            );
            break;
        };

        let id = segment.id();
        route.extend(segment, connector_km);
        tracing::debug!(
            "added segment {:?} via {:.3} km connector: {:.2} km, {:.1} m ascent so far",
            id,
            connector_km,
            route.total_distance_km,
            route.total_ascent_m
        );
    }

    tracing::info!(
        "route built: {} segments, {:.2} km (target {:.2} km), {:.1} m ascent, {} segments left unused",
        route.len(),
        route.total_distance_km,
        target_distance_km,
        route.total_ascent_m,
        pool.len()
    );
    if route.exceeds_ascent_ceiling(max_ascent_m) {
        tracing::warn!(
            "route ascent {:.1} m exceeds requested ceiling {:.1} m",
            route.total_ascent_m,
            max_ascent_m
        );
    }

    route
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::metrics::{EARTH_RADIUS_KM, haversine_km};
    use crate::segment::{SegmentId, extract_segments};

    fn km_to_lat(km: f64) -> f64 {
        km * 180.0 / (EARTH_RADIUS_KM * std::f64::consts::PI)
    }

    /// `count` evenly spaced points heading north from `start_km` (measured
    /// along the 5°E meridian from 45°N), spanning `length_km` and climbing
    /// `ascent_m` in total.
    fn northbound(trace: usize, start_km: f64, count: usize, length_km: f64, ascent_m: f64) -> Segment {
        let steps = (count - 1) as f64;
        let points = (0..count)
            .map(|i| {
                let t = i as f64 / steps;
                GeoPoint::new(45.0 + km_to_lat(start_km + t * length_km), 5.0, 200.0 + t * ascent_m)
            })
            .collect();
        Segment::new(SegmentId { trace, piece: 0 }, points).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_empty_pool_gives_empty_route() {
        let mut pool = SegmentPool::default();
        let route = build_route(&mut pool, 5.0, 100.0);

        assert!(route.is_empty());
        assert_eq!(route.total_distance_km(), 0.0);
        assert_eq!(route.total_ascent_m(), 0.0);
        assert!(route.connectors_km().is_empty());
    }

    #[test]
    fn test_connects_nearby_segment_and_skips_far_one() {
        let a = northbound(0, 0.0, 10, 2.0, 50.0);
        let b = northbound(1, 2.5, 5, 1.0, 20.0);
        let c = northbound(2, 8.5, 3, 0.3, 5.0);
        let mut pool = SegmentPool::from_segments(vec![c, b, a]);

        let route = build_route(&mut pool, 2.5, 1_000.0);

        let ids: Vec<usize> = route.segments().iter().map(|s| s.id().trace).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_close(route.total_distance_km(), 3.5);
        assert_close(route.total_ascent_m(), 70.0);
        assert_eq!(route.connectors_km().len(), 1);
        assert_close(route.connectors_km()[0], 0.5);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.iter().next().unwrap().id().trace, 2);
    }

    #[test]
    fn test_stops_when_nothing_within_threshold() {
        let a = northbound(0, 0.0, 10, 2.0, 50.0);
        let b = northbound(1, 2.5, 5, 1.0, 20.0);
        let c = northbound(2, 8.5, 3, 0.3, 5.0);
        let mut pool = SegmentPool::from_segments(vec![a, b, c]);

        let route = build_route(&mut pool, 50.0, 1_000.0);

        // Short of the target, but a valid route.
        assert_eq!(route.len(), 2);
        assert_close(route.total_distance_km(), 3.5);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_seed_alone_when_target_already_met() {
        let a = northbound(0, 0.0, 10, 2.0, 50.0);
        let b = northbound(1, 2.1, 5, 1.0, 20.0);
        let mut pool = SegmentPool::from_segments(vec![b, a]);

        let route = build_route(&mut pool, 1.5, 1_000.0);

        assert_eq!(route.len(), 1);
        assert_eq!(route.segments()[0].id().trace, 0);
        assert_close(route.total_distance_km(), 2.0);
    }

    #[test]
    fn test_equidistant_candidates_go_to_earliest_in_pool() {
        let seed = northbound(0, 0.0, 4, 0.5, 0.0);
        let end = seed.last();
        // A power of two keeps both longitude differences exact.
        let offset = 0.0078125;
        let side = |trace: usize, lon: f64| {
            let points = vec![
                GeoPoint::new(end.lat, lon, 0.0),
                GeoPoint::new(end.lat + 0.001, lon, 0.0),
            ];
            Segment::new(SegmentId { trace, piece: 0 }, points).unwrap()
        };
        let east = side(1, end.lon + offset);
        let west = side(2, end.lon - offset);
        assert_eq!(
            haversine_km(end, east.first()),
            haversine_km(end, west.first())
        );

        let mut pool = SegmentPool::from_segments(vec![seed.clone(), west.clone(), east.clone()]);
        let route = build_route(&mut pool, 0.6, 0.0);
        assert_eq!(route.segments()[1].id().trace, 2);

        let mut pool = SegmentPool::from_segments(vec![seed, east, west]);
        let route = build_route(&mut pool, 0.6, 0.0);
        assert_eq!(route.segments()[1].id().trace, 1);
    }

    #[test]
    fn test_ascent_ceiling_is_not_enforced() {
        let a = northbound(0, 0.0, 10, 2.0, 500.0);
        let b = northbound(1, 2.2, 5, 1.0, 400.0);
        let mut pool = SegmentPool::from_segments(vec![a, b]);

        let route = build_route(&mut pool, 10.0, 100.0);

        assert_eq!(route.len(), 2);
        assert_close(route.total_ascent_m(), 900.0);
        assert!(route.exceeds_ascent_ceiling(100.0));
        assert!(!route.exceeds_ascent_ceiling(900.0));
    }

    #[test]
    fn test_route_points_and_descent() {
        let a = northbound(0, 0.0, 3, 0.4, 30.0);
        let down = Segment::new(
            SegmentId { trace: 1, piece: 0 },
            vec![
                GeoPoint::new(45.0 + km_to_lat(0.5), 5.0, 230.0),
                GeoPoint::new(45.0 + km_to_lat(0.6), 5.0, 180.0),
            ],
        )
        .unwrap();
        let mut pool = SegmentPool::from_segments(vec![a, down]);

        let route = build_route(&mut pool, 5.0, 1_000.0);

        assert_eq!(route.points().count(), 5);
        assert_close(route.total_descent_m(), 50.0);
        assert_close(route.total_ascent_m(), 30.0);
    }

    #[test]
    fn test_chain_along_split_trail_visits_every_piece() {
        let trail: Vec<GeoPoint> = (0..40)
            .map(|i| GeoPoint::new(45.0 + km_to_lat(i as f64 * 0.3), 5.0, 300.0 + (i % 4) as f64))
            .collect();
        let mut pool = extract_segments(&[trail], 1.0);
        let initial = pool.len();

        let route = build_route(&mut pool, 100.0, 0.0);

        assert_eq!(route.len(), initial);
        assert!(pool.is_empty());
        assert!(route.connectors_km().iter().all(|&c| c < CONNECTOR_THRESHOLD_KM));
    }

    #[test]
    fn test_stationary_fixes_never_stall_the_route() {
        let mut trail: Vec<GeoPoint> = (0..9)
            .map(|i| GeoPoint::new(45.0 + km_to_lat(i as f64 * 0.3), 5.0, 300.0))
            .collect();
        trail.push(trail[8]);
        trail.push(trail[8]);
        let mut pool = extract_segments(&[trail], 1.0);
        assert_eq!(pool.len(), 2);

        let route = build_route(&mut pool, 100.0, 0.0);

        assert_eq!(route.len(), 2);
        assert_eq!(route.connectors_km(), &[0.0]);
        let mut running = 0.0;
        for segment in route.segments() {
            let next = running + segment.length_km();
            assert!(next > running);
            running = next;
        }
        assert_close(route.total_distance_km(), running);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Short northbound traces scattered over a few kilometers. A step of
        /// zero repeats the previous fix.
        fn scattered_pool() -> impl Strategy<Value = SegmentPool> {
            prop::collection::vec(
                (
                    0.0f64..0.05,
                    0.0f64..0.05,
                    prop::collection::vec(0u8..3, 1..12),
                    -30.0f64..30.0,
                ),
                0..30,
            )
            .prop_map(|shapes| {
                let traces: Vec<Vec<GeoPoint>> = shapes
                    .into_iter()
                    .map(|(lat, lon, steps, climb)| {
                        let mut point = GeoPoint::new(45.0 + lat, 5.0 + lon, 100.0);
                        let mut points = vec![point];
                        for step in steps {
                            point = GeoPoint::new(
                                point.lat + f64::from(step) * 0.001,
                                point.lon,
                                point.elevation + f64::from(step) * climb,
                            );
                            points.push(point);
                        }
                        points
                    })
                    .collect();
                extract_segments(&traces, 0.25)
            })
        }

        proptest! {
            #[test]
            fn prop_route_invariants(pool in scattered_pool(), target in 0.0f64..20.0) {
                let initial: Vec<Segment> = pool.iter().cloned().collect();
                let mut pool = pool;
                let route = build_route(&mut pool, target, 0.0);

                // No reuse, nothing lost.
                prop_assert_eq!(pool.len() + route.len(), initial.len());
                let ids: HashSet<SegmentId> = route.segments().iter().map(Segment::id).collect();
                prop_assert_eq!(ids.len(), route.len());

                if initial.is_empty() {
                    prop_assert!(route.is_empty());
                    return Ok(());
                }

                // Seed has the most points.
                let max_points = initial.iter().map(Segment::len).max().unwrap_or(0);
                prop_assert_eq!(route.segments()[0].len(), max_points);

                // Connectors are under the threshold and each one joins the
                // previous end to the next start.
                prop_assert_eq!(route.connectors_km().len(), route.len() - 1);
                for (i, &connector) in route.connectors_km().iter().enumerate() {
                    prop_assert!(connector < CONNECTOR_THRESHOLD_KM);
                    let expected = haversine_km(route.segments()[i].last(), route.segments()[i + 1].first());
                    prop_assert_eq!(connector, expected);
                }

                // Running distance grows with every accepted segment.
                let mut running = route.segments()[0].length_km();
                for (segment, connector) in route.segments()[1..].iter().zip(route.connectors_km()) {
                    let next = running + connector + segment.length_km();
                    prop_assert!(next > running);
                    running = next;
                }
                prop_assert!((running - route.total_distance_km()).abs() < 1e-9);

                // Stopped early only if the target was met or nothing was reachable.
                if route.total_distance_km() < target && !pool.is_empty() {
                    let end = route.segments()[route.len() - 1].last();
                    prop_assert!(pool.iter().all(|s| haversine_km(end, s.first()) >= CONNECTOR_THRESHOLD_KM));
                }
            }
        }
    }
}
