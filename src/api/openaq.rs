//! `/openaq/*` routes over stored OpenAQ data.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::app::App;
use crate::assessment::Assessment;
use crate::openaq::parse_timestamp;
use crate::store::{LocationQuery, SearchQuery, StoreStats};

use super::error::{ApiError, ApiResult};
use super::extract::{ApiPath, ApiQuery};
use super::schemas::{
    LocationLatestOut, LocationOut, LocationsParams, MeasurementOut, MeasurementsParams,
    SearchHitOut, SearchParams, SensorSummary,
};

const RECENT_DATA_DAYS: i64 = 7;

pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/openaq/locations", get(list_locations))
        .route("/openaq/locations/:id", get(get_location))
        .route("/openaq/locations/:id/sensors", get(get_sensors))
        .route("/openaq/locations/:id/latest", get(get_latest))
        .route("/openaq/locations/:id/assessment", get(get_assessment))
        .route("/openaq/sensors/:id/measurements", get(get_measurements))
        .route("/openaq/admin/refresh/location/:id", post(refresh_location))
        .route("/openaq/stats", get(get_stats))
        .route("/openaq/location/search", get(search_locations))
}

async fn list_locations(
    State(app): State<Arc<App>>,
    ApiQuery(params): ApiQuery<LocationsParams>,
) -> ApiResult<Json<Vec<LocationOut>>> {
    if params.page < 1 {
        return Err(ApiError::BadRequest("page must be at least 1".to_string()));
    }
    let country_code = match params.country {
        Some(c) if c.trim().is_empty() => None,
        Some(c) => Some(c.trim().to_uppercase()),
        None => Some(app.config().config().openaq.country.clone()),
    };
    let offset = (params.page - 1)
        .checked_mul(params.limit)
        .ok_or_else(|| ApiError::BadRequest("page is out of range".to_string()))?;
    let query = LocationQuery {
        country_code,
        limit: params.limit,
        offset,
    };

    let store = app.store();
    let mut out = Vec::new();
    for location in store.locations(&query).await? {
        let sensors = store
            .sensors_by_location(location.id)
            .await?
            .iter()
            .map(|s| SensorSummary::new(s, None))
            .collect();
        out.push(LocationOut::new(&location, sensors));
    }
    Ok(Json(out))
}

async fn get_location(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<LocationOut>> {
    let detail = app.location_detail(id).await?;
    let sensors = detail.sensors.iter().map(SensorSummary::from).collect();
    Ok(Json(LocationOut::new(&detail.location, sensors)))
}

async fn get_sensors(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Vec<SensorSummary>>> {
    let sensors = app.store().sensors_by_location(id).await?;
    Ok(Json(
        sensors.iter().map(|s| SensorSummary::new(s, None)).collect(),
    ))
}

async fn get_latest(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<LocationLatestOut>> {
    let readings = app.latest_readings(id).await?;
    Ok(Json(LocationLatestOut {
        location_id: id,
        latest_measurements: readings.into_iter().map(Into::into).collect(),
    }))
}

async fn get_assessment(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Assessment>> {
    Ok(Json(app.assess_location(id).await?))
}

fn parse_bound(name: &str, value: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    match value {
        None => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {} timestamp: {}", name, s))),
    }
}

async fn get_measurements(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
    ApiQuery(params): ApiQuery<MeasurementsParams>,
) -> ApiResult<Json<Vec<MeasurementOut>>> {
    let start = parse_bound("start", params.start.as_deref())?;
    let end = parse_bound("end", params.end.as_deref())?;

    let store = app.store();
    let sensor = store.sensor(id).await?;
    let measurements = store
        .measurements_by_sensor(id, start, end, params.limit)
        .await?;
    Ok(Json(
        measurements
            .into_iter()
            .map(|m| MeasurementOut::new(m, sensor.as_ref()))
            .collect(),
    ))
}

async fn refresh_location(
    State(app): State<Arc<App>>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Value>> {
    let summary = app.ingestor().refresh_location(id).await?;
    Ok(Json(json!({
        "status": "ok",
        "message": format!("Refreshed location {}", id),
        "summary": summary,
    })))
}

async fn get_stats(State(app): State<Arc<App>>) -> ApiResult<Json<StoreStats>> {
    Ok(Json(app.store().stats().await?))
}

async fn search_locations(
    State(app): State<Arc<App>>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<Vec<SearchHitOut>>> {
    let query = SearchQuery {
        q: params.q,
        city: params.city,
        parameter: params.parameter,
        recent_since: params
            .has_recent_data
            .filter(|recent| *recent)
            .map(|_| Utc::now() - Duration::days(RECENT_DATA_DAYS)),
        limit: params.limit,
    };
    let hits = app.store().search_locations(&query).await?;
    Ok(Json(hits.into_iter().map(Into::into).collect()))
}
