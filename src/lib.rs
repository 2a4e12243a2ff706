//! airsafe - Ghana air-quality ingestion, storage and HTTP API.

pub mod api;
pub mod app;
pub mod assessment;
pub mod caches;
pub mod cli;
pub mod config;
pub mod forecast;
pub mod ingest;
pub mod logging;
pub mod openaq;
pub mod store;

pub use app::{App, AppContext, AppError};
