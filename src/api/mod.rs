//! HTTP JSON API.

mod error;
mod extract;
mod ml;
mod openaq;
mod schemas;
mod weather;

use std::future::Future;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app::App;

pub use error::{ApiError, ApiResult};
pub use schemas::{DEFAULT_LAT, DEFAULT_LON};

pub const API_TITLE: &str = "AirSafe Ghana API";

/// The full router, with CORS and request tracing.
pub fn router(app: Arc<App>) -> Router {
    let cors = cors_layer(&app.config().config().server.cors_origins);
    Router::new()
        .route("/", get(root))
        .merge(openaq::routes())
        .merge(weather::routes())
        .merge(ml::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": API_TITLE }))
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(app: Arc<App>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(app))
        .with_graceful_shutdown(shutdown)
        .await
}
