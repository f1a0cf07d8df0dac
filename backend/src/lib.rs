//! Stitches segments of recorded GPS trails into one longer route.
//!
//! Trails are cut into short [`segment::Segment`]s, pooled, and chained
//! greedily by [`assembler::build_route`]. The HTTP layer in this module
//! serves routes built from a directory of GPX files.

pub mod assembler;
pub mod config;
pub mod error;
pub mod gpx_export;
pub mod metrics;
pub mod models;
pub mod pool;
pub mod segment;
pub mod store;
pub mod trails;

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use crate::assembler::{Route, build_route};
use crate::config::AssemblyConfig;
use crate::error::AppError;
use crate::gpx_export::encode_route_as_gpx;
use crate::metrics::round_to;
use crate::models::{
    GeoPoint, RouteBounds, RouteMetadata, RouteRequest, RouteResponse, TrailList, UploadResponse,
};
use crate::segment::extract_segments;
use crate::store::TrailStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TrailStore>,
    pub assembly: AssemblyConfig,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/route", get(route_handler))
        .route("/api/trails", get(list_trails_handler).post(upload_trail_handler))
        .route("/api/trails/:name", get(trail_handler))
        .layer(cors)
        .with_state(state)
}

async fn route_handler(
    State(state): State<AppState>,
    Query(req): Query<RouteRequest>,
) -> Result<Json<RouteResponse>, AppError> {
    validate_request(&req)?;
    tracing::info!(
        "route request: {:.2} km, ascent ceiling {:.0} m",
        req.target_distance_km,
        req.max_ascent_m
    );

    let traces = state.store.load_traces()?;
    let mut pool = extract_segments(&traces, state.assembly.max_segment_km);
    tracing::info!(
        "{} segments extracted from {} traces",
        pool.len(),
        traces.len()
    );

    let route = build_route(&mut pool, req.target_distance_km, req.max_ascent_m);
    if route.is_empty() {
        return Err(AppError::NoSegments);
    }

    Ok(Json(route_response(&route, req.max_ascent_m)?))
}

async fn list_trails_handler(State(state): State<AppState>) -> Result<Json<TrailList>, AppError> {
    let files = state.store.trail_names()?;
    Ok(Json(TrailList { files }))
}

async fn upload_trail_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let filename = state.store.save_gpx(&body)?;
    let message = format!("trail saved as {filename}");
    Ok((StatusCode::CREATED, Json(UploadResponse { filename, message })))
}

async fn trail_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.store.read_gpx(&name)?;
    Ok(([(header::CONTENT_TYPE, "application/gpx+xml")], bytes))
}

fn validate_request(req: &RouteRequest) -> Result<(), AppError> {
    if !req.target_distance_km.is_finite() || req.target_distance_km < 0.0 {
        return Err(AppError::BadRequest(
            "target_distance_km must be a non-negative number".into(),
        ));
    }
    if !req.max_ascent_m.is_finite() || req.max_ascent_m < 0.0 {
        return Err(AppError::BadRequest(
            "max_ascent_m must be a non-negative number".into(),
        ));
    }
    Ok(())
}

/// Shape a route for the wire. Totals are rounded here and nowhere else.
pub fn route_response(route: &Route, max_ascent_m: f64) -> Result<RouteResponse, AppError> {
    let gpx_base64 = encode_route_as_gpx(route)?;
    let points: Vec<GeoPoint> = route.points().collect();

    Ok(RouteResponse {
        segments: route
            .segments()
            .iter()
            .map(|segment| segment.points().to_vec())
            .collect(),
        connectors_km: route.connectors_km().iter().map(|&km| round_to(km, 3)).collect(),
        total_distance_km: round_to(route.total_distance_km(), 2),
        total_ascent_m: round_to(route.total_ascent_m(), 1),
        total_descent_m: round_to(route.total_descent_m(), 1),
        ascent_ceiling_exceeded: route.exceeds_ascent_ceiling(max_ascent_m),
        gpx_base64,
        metadata: build_metadata(&points, route.len()),
    })
}

pub fn build_metadata(points: &[GeoPoint], segment_count: usize) -> Option<RouteMetadata> {
    let (&start, &end) = (points.first()?, points.last()?);
    let mut bounds = RouteBounds {
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        min_lon: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
    };
    for point in points {
        bounds.min_lat = bounds.min_lat.min(point.lat);
        bounds.max_lat = bounds.max_lat.max(point.lat);
        bounds.min_lon = bounds.min_lon.min(point.lon);
        bounds.max_lon = bounds.max_lon.max(point.lon);
    }

    Some(RouteMetadata {
        segment_count,
        point_count: points.len(),
        bounds,
        start,
        end,
    })
}
