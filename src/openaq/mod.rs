//! OpenAQ v3 API access.

mod client;
mod fixture;
mod types;

pub use client::{
    HttpOpenAqClient, MeasurementsQuery, OpenAqApi, OpenAqError, Result,
};
pub use fixture::FixtureOpenAqClient;
pub use types::{
    parse_timestamp, ApiLocation, ApiParameter, ApiSensor, LatestResult, SensorMeasurement,
    DEFAULT_PARAMETER,
};
