//! The OpenAQ API trait and its HTTP implementation.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::ConfigHelper;

use super::types::{ApiLocation, ApiSensor, Envelope, LatestResult, SensorMeasurement};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, Error)]
pub enum OpenAqError {
    #[error("request to OpenAQ failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenAQ returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("not found in OpenAQ: {0}")]
    NotFound(String),

    #[error("failed to decode OpenAQ response from {url}: {message}")]
    Decode { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, OpenAqError>;

// =============================================================================
// Queries
// =============================================================================

/// Paging and time window for `/sensors/{id}/measurements`.
#[derive(Debug, Clone)]
pub struct MeasurementsQuery {
    pub limit: u32,
    pub page: u32,
    pub datetime_from: Option<DateTime<Utc>>,
    pub datetime_to: Option<DateTime<Utc>>,
}

impl Default for MeasurementsQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            page: 1,
            datetime_from: None,
            datetime_to: None,
        }
    }
}

// =============================================================================
// OpenAqApi Trait
// =============================================================================

/// Read access to the OpenAQ v3 API.
#[async_trait]
pub trait OpenAqApi: Send + Sync {
    /// One page of locations, optionally restricted to an ISO country code.
    async fn locations(&self, country: Option<&str>, limit: u32, page: u32)
        -> Result<Vec<ApiLocation>>;

    async fn location(&self, id: u64) -> Result<ApiLocation>;

    async fn location_latest(&self, id: u64) -> Result<Vec<LatestResult>>;

    async fn sensor(&self, id: u64) -> Result<ApiSensor>;

    async fn sensor_measurements(
        &self,
        id: u64,
        query: &MeasurementsQuery,
    ) -> Result<Vec<SensorMeasurement>>;
}

// =============================================================================
// HttpOpenAqClient
// =============================================================================

/// `OpenAqApi` over HTTPS.
pub struct HttpOpenAqClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpOpenAqClient {
    pub fn new(config: &ConfigHelper) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let openaq = &config.config().openaq;
        Ok(Self::with_client(
            client,
            &openaq.base_url,
            openaq.api_key.clone(),
        ))
    }

    /// Create a client with a custom reqwest client.
    pub fn with_client(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_results(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = self.url(path);
        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(OpenAqError::NotFound(url)),
            status => {
                return Err(OpenAqError::Status {
                    url,
                    status: status.as_u16(),
                })
            }
        }

        let envelope: Envelope = response.json().await.map_err(|e| OpenAqError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(envelope.results)
    }

    async fn first_result(&self, path: &str) -> Result<Value> {
        self.get_results(path, &[])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OpenAqError::NotFound(self.url(path)))
    }
}

fn decode_error(path: &str, e: serde_json::Error) -> OpenAqError {
    OpenAqError::Decode {
        url: path.to_string(),
        message: e.to_string(),
    }
}

fn format_query_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Decode every result, logging and dropping the ones that don't parse.
fn decode_all<T>(
    path: &str,
    results: Vec<Value>,
    decode: impl Fn(Value) -> serde_json::Result<T>,
) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|raw| match decode(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(path, error = %e, "skipping undecodable OpenAQ result");
                None
            }
        })
        .collect()
}

#[async_trait]
impl OpenAqApi for HttpOpenAqClient {
    async fn locations(
        &self,
        country: Option<&str>,
        limit: u32,
        page: u32,
    ) -> Result<Vec<ApiLocation>> {
        let mut query = vec![("limit", limit.to_string()), ("page", page.to_string())];
        if let Some(country) = country.filter(|c| !c.is_empty()) {
            query.push(("iso", country.to_string()));
        }
        let results = self.get_results("/locations", &query).await?;
        Ok(decode_all("/locations", results, ApiLocation::from_json))
    }

    async fn location(&self, id: u64) -> Result<ApiLocation> {
        let path = format!("/locations/{}", id);
        let raw = self.first_result(&path).await?;
        ApiLocation::from_json(raw).map_err(|e| decode_error(&path, e))
    }

    async fn location_latest(&self, id: u64) -> Result<Vec<LatestResult>> {
        let path = format!("/locations/{}/latest", id);
        let results = self.get_results(&path, &[]).await?;
        Ok(results.into_iter().map(LatestResult::from_json).collect())
    }

    async fn sensor(&self, id: u64) -> Result<ApiSensor> {
        let path = format!("/sensors/{}", id);
        let raw = self.first_result(&path).await?;
        ApiSensor::from_json(raw).map_err(|e| decode_error(&path, e))
    }

    async fn sensor_measurements(
        &self,
        id: u64,
        query: &MeasurementsQuery,
    ) -> Result<Vec<SensorMeasurement>> {
        let path = format!("/sensors/{}/measurements", id);
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("page", query.page.to_string()),
        ];
        if let Some(from) = query.datetime_from {
            params.push(("datetime_from", format_query_time(from)));
        }
        if let Some(to) = query.datetime_to {
            params.push(("datetime_to", format_query_time(to)));
        }
        let results = self.get_results(&path, &params).await?;
        Ok(decode_all(&path, results, SensorMeasurement::from_json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_base_url_is_normalised() {
        let client = HttpOpenAqClient::with_client(Client::new(), "http://localhost:9/v3/", None);
        assert_eq!(client.url("/locations/3"), "http://localhost:9/v3/locations/3");
    }

    #[test]
    fn test_query_time_format() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(format_query_time(t), "2024-05-01T10:00:00Z");
    }

    // -------------------------------------------------------------------------
    // Local stub of the v3 API
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct SeenRequest {
        path: String,
        api_key: Option<String>,
        query: HashMap<String, String>,
    }

    type RequestLog = Arc<Mutex<Vec<SeenRequest>>>;

    async fn stub_handler(
        State(log): State<RequestLog>,
        uri: Uri,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Response {
        let path = uri.path().to_string();
        log.lock().unwrap().push(SeenRequest {
            path: path.clone(),
            api_key: headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            query,
        });

        match path.as_str() {
            "/v3/locations" => Json(json!({
                "meta": {"found": 1},
                "results": [{
                    "id": 9764,
                    "name": "US Diplomatic Post: Accra",
                    "country": {"code": "GH", "name": "Ghana"},
                    "coordinates": {"latitude": 5.58389, "longitude": -0.19968},
                    "sensors": []
                }]
            }))
            .into_response(),
            "/v3/locations/7" => Json(json!({"meta": {}, "results": []})).into_response(),
            "/v3/sensors/21/measurements" => Json(json!({
                "meta": {},
                "results": [{
                    "value": 12.5,
                    "parameter": {"id": 2, "name": "pm25", "units": "µg/m³"},
                    "period": {"datetimeFrom": {"utc": "2024-05-01T10:00:00Z"}}
                }]
            }))
            .into_response(),
            "/v3/sensors/500" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => StatusCode::NOT_FOUND.into_response(),
        }
    }

    async fn start_stub() -> (String, RequestLog) {
        let log = RequestLog::default();
        let app = Router::new()
            .fallback(stub_handler)
            .with_state(log.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v3", addr), log)
    }

    #[tokio::test]
    async fn test_locations_request_and_decoding() {
        let (base_url, log) = start_stub().await;
        let client =
            HttpOpenAqClient::with_client(Client::new(), &base_url, Some("secret".to_string()));

        let locations = client.locations(Some("GH"), 50, 2).await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].record.id, 9764);
        assert_eq!(locations[0].record.country_code.as_deref(), Some("GH"));

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.path, "/v3/locations");
        assert_eq!(seen.api_key.as_deref(), Some("secret"));
        assert_eq!(seen.query.get("iso").map(String::as_str), Some("GH"));
        assert_eq!(seen.query.get("limit").map(String::as_str), Some("50"));
        assert_eq!(seen.query.get("page").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_measurements_request_carries_window() {
        let (base_url, log) = start_stub().await;
        let client = HttpOpenAqClient::with_client(Client::new(), &base_url, None);

        let query = MeasurementsQuery {
            limit: 10,
            page: 3,
            datetime_from: Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()),
            datetime_to: Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap()),
        };
        let measurements = client.sensor_measurements(21, &query).await.unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].value, Some(12.5));
        assert_eq!(
            measurements[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );

        let seen = log.lock().unwrap()[0].clone();
        assert_eq!(seen.path, "/v3/sensors/21/measurements");
        assert_eq!(seen.api_key, None);
        assert_eq!(seen.query.get("limit").map(String::as_str), Some("10"));
        assert_eq!(seen.query.get("page").map(String::as_str), Some("3"));
        assert_eq!(
            seen.query.get("datetime_from").map(String::as_str),
            Some("2024-05-01T00:00:00Z")
        );
        assert_eq!(
            seen.query.get("datetime_to").map(String::as_str),
            Some("2024-05-02T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (base_url, _log) = start_stub().await;
        let client = HttpOpenAqClient::with_client(Client::new(), &base_url, None);

        assert!(matches!(
            client.location(404).await,
            Err(OpenAqError::NotFound(_))
        ));
        assert!(matches!(
            client.location(7).await,
            Err(OpenAqError::NotFound(_))
        ));
        assert!(matches!(
            client.sensor(500).await,
            Err(OpenAqError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_error() {
        let client = HttpOpenAqClient::with_client(Client::new(), "http://127.0.0.1:1", None);
        assert!(matches!(
            client.location(3).await,
            Err(OpenAqError::Transport(_))
        ));
    }
}
