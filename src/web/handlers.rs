//! HTTP request handlers

use super::state::AppState;
use crate::error::GatewayError;
use crate::offers::{DetailRequest, ListRequest, OfferDetail, OfferList};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub text: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, text) = match &self {
            GatewayError::InvalidRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            GatewayError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            GatewayError::Internal(reason) => {
                error!("Request failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        let body = ErrorBody {
            code: status.as_u16(),
            text,
        };
        (status, Json(body)).into_response()
    }
}

/// Query parameters of a detail lookup
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailParams {
    pub id_type: String,
    pub source: String,
    pub country: String,
}

/// Landing page: trending offers of the default country
pub async fn index(State(state): State<AppState>) -> Result<Json<OfferList>, GatewayError> {
    let request = ListRequest::trending(state.default_rows_per_page());
    let list = state.service.search(&request).await?;
    Ok(Json(list))
}

/// Paged offer search
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<ListRequest>,
) -> Result<Json<OfferList>, GatewayError> {
    let list = state.service.search(&request).await?;
    Ok(Json(list))
}

/// Offer detail with competitor prices
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<Json<OfferDetail>, GatewayError> {
    let request = DetailRequest::new(id, params.id_type, params.source, params.country);
    let detail = state.service.detail(&request).await?;
    Ok(Json(detail))
}

/// Stats handler
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}
