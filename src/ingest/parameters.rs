//! Resolution of a sensor's parameter name.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;

use crate::openaq::OpenAqApi;
use crate::store::Store;

/// Name recorded when a sensor's parameter can't be determined.
pub const UNKNOWN_PARAMETER: &str = "unknown";

/// Looks up parameter names by sensor id: LRU cache first, then the store,
/// then the OpenAQ sensor endpoint.
///
/// Every answer is cached, including `unknown`, so a sensor that upstream
/// can't describe costs one request per cache lifetime.
pub struct ParameterResolver {
    cache: Mutex<LruCache<u64, String>>,
}

impl ParameterResolver {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn resolve(&self, sensor_id: u64, store: &Store, api: &dyn OpenAqApi) -> String {
        if let Some(name) = self.cache.lock().await.get(&sensor_id) {
            return name.clone();
        }

        let name = self.lookup(sensor_id, store, api).await;
        self.cache.lock().await.put(sensor_id, name.clone());
        name
    }

    async fn lookup(&self, sensor_id: u64, store: &Store, api: &dyn OpenAqApi) -> String {
        match store.sensor(sensor_id).await {
            Ok(Some(sensor)) => {
                if let Some(name) = sensor.parameter_name {
                    return name;
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(sensor_id, error = %e, "failed to read sensor from store"),
        }

        tracing::debug!(sensor_id, "fetching sensor details from OpenAQ");
        match api.sensor(sensor_id).await {
            Ok(sensor) => match sensor.parameter_name() {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!(sensor_id, "no parameter name in OpenAQ sensor response");
                    UNKNOWN_PARAMETER.to_string()
                }
            },
            Err(e) => {
                tracing::warn!(sensor_id, error = %e, "failed to get parameter name");
                UNKNOWN_PARAMETER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::MemoryKeyValueDb;
    use crate::openaq::FixtureOpenAqClient;
    use crate::store::SensorRecord;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_store_then_api_then_unknown() {
        let store = Store::new(Arc::new(MemoryKeyValueDb::new()));
        store
            .upsert_sensor(&SensorRecord {
                id: 1,
                location_id: 3,
                name: None,
                parameter_id: Some(2),
                parameter_name: Some("pm25".to_string()),
                parameter_unit: None,
                raw: json!({}),
            })
            .await
            .unwrap();
        let api = FixtureOpenAqClient::new()
            .with_sensor(2, json!({"id": 2, "parameter": {"id": 100, "name": "temperature"}}));
        let resolver = ParameterResolver::new(16);

        assert_eq!(resolver.resolve(1, &store, &api).await, "pm25");
        assert_eq!(api.sensor_lookups(), 0);

        assert_eq!(resolver.resolve(2, &store, &api).await, "temperature");
        assert_eq!(resolver.resolve(3, &store, &api).await, "unknown");
        assert_eq!(api.sensor_lookups(), 2);

        // Cached, including the unknown answer
        assert_eq!(resolver.resolve(2, &store, &api).await, "temperature");
        assert_eq!(resolver.resolve(3, &store, &api).await, "unknown");
        assert_eq!(api.sensor_lookups(), 2);
    }
}
