use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::gpx_export::ExportError;
use crate::models::ApiError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("no trail segments available")]
    NoSegments,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NoSegments => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::InvalidUpload(_) | StoreError::InvalidName(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (
            status,
            Json(ApiError {
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
