pub use shared::{
    ApiError, GeoPoint, RouteBounds, RouteMetadata, RouteRequest, RouteResponse, TrailList,
    UploadResponse,
};
