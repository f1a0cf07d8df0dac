use crate::models::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance between two points, ignoring elevation.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Length of a walk through `points`, at full precision.
pub fn path_distance_km(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

/// Sum of the strictly positive steps between successive elevations.
pub fn ascent_m(elevations: impl IntoIterator<Item = f64>) -> f64 {
    elevation_deltas(elevations).filter(|d| *d > 0.0).sum()
}

/// Absolute sum of the negative steps between successive elevations.
pub fn descent_m(elevations: impl IntoIterator<Item = f64>) -> f64 {
    -elevation_deltas(elevations)
        .filter(|d| *d < 0.0)
        .sum::<f64>()
}

fn elevation_deltas(elevations: impl IntoIterator<Item = f64>) -> impl Iterator<Item = f64> {
    let mut previous: Option<f64> = None;
    elevations.into_iter().filter_map(move |current| {
        let delta = previous.map(|p| current - p);
        previous = Some(current);
        delta
    })
}

/// Presentation rounding. Never feed the result back into an accumulator.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
