//! `/api/weather/db/*` routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app::App;
use crate::openaq::parse_timestamp;
use crate::store::{NewWeather, WeatherRecord};

use super::error::{ApiError, ApiResult};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::schemas::{MessageOut, WeatherParams, WeatherRangeParams};

const NOT_FOUND: &str = "Weather data not found";
const NONE_FOR_LOCATION: &str = "No weather data found for this location";

pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/weather/db", post(create_weather))
        .route("/api/weather/db/latest", get(latest_weather))
        .route("/api/weather/db/history", get(weather_history))
        .route("/api/weather/db/range", get(weather_in_range))
        .route(
            "/api/weather/db/:id",
            get(weather_by_id).delete(delete_weather),
        )
}

async fn create_weather(
    State(app): State<Arc<App>>,
    ApiJson(new): ApiJson<NewWeather>,
) -> ApiResult<(StatusCode, Json<WeatherRecord>)> {
    let record = app.store().create_weather(new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn latest_weather(
    State(app): State<Arc<App>>,
    ApiQuery(params): ApiQuery<WeatherParams>,
) -> ApiResult<Json<WeatherRecord>> {
    app.store()
        .latest_weather(params.lat, params.lon)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NONE_FOR_LOCATION.to_string()))
}

async fn weather_history(
    State(app): State<Arc<App>>,
    ApiQuery(params): ApiQuery<WeatherParams>,
) -> ApiResult<Json<Vec<WeatherRecord>>> {
    let records = app
        .store()
        .weather_history(params.lat, params.lon, params.skip, params.limit)
        .await?;
    if records.is_empty() {
        return Err(ApiError::NotFound(NONE_FOR_LOCATION.to_string()));
    }
    Ok(Json(records))
}

async fn weather_in_range(
    State(app): State<Arc<App>>,
    ApiQuery(params): ApiQuery<WeatherRangeParams>,
) -> ApiResult<Json<Vec<WeatherRecord>>> {
    let start = parse_timestamp(&params.start_date)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid start_date: {}", params.start_date)))?;
    let end = parse_timestamp(&params.end_date)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid end_date: {}", params.end_date)))?;

    let records = app
        .store()
        .weather_in_range(params.lat, params.lon, start, end, params.skip, params.limit)
        .await?;
    if records.is_empty() {
        return Err(ApiError::NotFound(
            "No weather data found for this location and date range".to_string(),
        ));
    }
    Ok(Json(records))
}

async fn weather_by_id(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<WeatherRecord>> {
    app.store()
        .weather_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

async fn delete_weather(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<MessageOut>> {
    if app.store().delete_weather(id).await? {
        Ok(Json(MessageOut::new("Weather data deleted successfully")))
    } else {
        Err(ApiError::NotFound(NOT_FOUND.to_string()))
    }
}
