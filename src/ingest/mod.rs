//! Ingestion of OpenAQ data: on-demand refreshes, backfills and the
//! periodic scheduler.

mod ingestor;
mod parameters;
mod scheduler;

use thiserror::Error;

use crate::openaq::OpenAqError;
use crate::store::StoreError;

pub use ingestor::{
    BackfillLocationsSummary, BackfillSensorSummary, HistorySummary, IngestSettings, Ingestor,
    RefreshAllSummary, RefreshSummary, SensorHistory,
};
pub use parameters::{ParameterResolver, UNKNOWN_PARAMETER};
pub use scheduler::{run_scheduler, spawn_scheduler};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Api(#[from] OpenAqError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("location {0} is not in the store")]
    LocationNotFound(u64),
}

pub type Result<T> = std::result::Result<T, IngestError>;
