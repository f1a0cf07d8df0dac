use serde::{Deserialize, Serialize};

/// A recorded trail point. Elevation is in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64, elevation: f64) -> Self {
        Self {
            lat,
            lon,
            elevation,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteRequest {
    pub target_distance_km: f64,
    pub max_ascent_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMetadata {
    pub segment_count: usize,
    pub point_count: usize,
    pub bounds: RouteBounds,
    pub start: GeoPoint,
    pub end: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    /// Chosen segments in travel order.
    pub segments: Vec<Vec<GeoPoint>>,
    /// Straight-line legs joining consecutive segments, in kilometers.
    pub connectors_km: Vec<f64>,
    pub total_distance_km: f64,
    pub total_ascent_m: f64,
    pub total_descent_m: f64,
    pub ascent_ceiling_exceeded: bool,
    pub gpx_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RouteMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailList {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
