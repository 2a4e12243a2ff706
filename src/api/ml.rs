//! Forecast model routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use crate::app::{App, AppError, Forecast};

use super::error::{ApiError, ApiResult};
use super::extract::ApiPath;

pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/ml/train/:location_id", post(train_model))
        .route("/api/locations/:location_id/forecast", get(get_forecast))
}

async fn train_model(
    State(app): State<Arc<App>>,
    ApiPath(location_id): ApiPath<u64>,
) -> Response {
    match app.train_model(location_id).await {
        Ok(report) => Json(json!({
            "status": "success",
            "location_id": location_id,
            "model_performance": report,
            "message": format!("Model trained for location {}", location_id),
        }))
        .into_response(),
        Err(AppError::Forecast(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn get_forecast(
    State(app): State<Arc<App>>,
    ApiPath(location_id): ApiPath<u64>,
) -> ApiResult<Json<Forecast>> {
    Ok(Json(app.forecast(location_id, Utc::now()).await?))
}
