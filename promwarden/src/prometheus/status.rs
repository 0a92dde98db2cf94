//! Status endpoints.

use std::collections::BTreeMap;

use promwarden_core::{
    ApiErrorType, Cache, CacheKey, ConfigResult, FlagsResult, GlobalConfig, QueryError, response,
};
use serde::Deserialize;
use smol_str::SmolStr;
use tracing::{debug, error};

use super::{CachedValue, Prometheus, STATUS_CONFIG, STATUS_FLAGS};

#[derive(Deserialize)]
struct ConfigData {
    yaml: String,
}

#[derive(Deserialize)]
struct ServerConfig {
    #[serde(default)]
    global: GlobalConfig,
}

fn decode_config(status: u16, body: &[u8]) -> Result<(String, GlobalConfig), QueryError> {
    let data: ConfigData = response::decode_data(status, body)?;
    let config: ServerConfig = serde_saphyr::from_str(&data.yaml).map_err(|e| {
        QueryError::api(
            ApiErrorType::BadResponse,
            format!("failed to decode config data: {e}"),
        )
    })?;
    Ok((data.yaml, config.global))
}

impl Prometheus {
    /// Fetches the configuration the server is running with.
    ///
    /// Missing `global` settings are filled in with the server defaults.
    #[tracing::instrument(skip(self), fields(uri = %self.uri))]
    pub async fn config(&self) -> Result<ConfigResult, QueryError> {
        let _guard = self.locks.lock(STATUS_CONFIG).await;

        let key = CacheKey::status(STATUS_CONFIG);
        if let Some(CachedValue::Config(result)) = self.cache.get(&key).await {
            debug!("Config returned from cache");
            self.reporter.cache_hit(&self.name, STATUS_CONFIG);
            return Ok(result);
        }

        debug!("Scheduling prometheus config query");
        self.reporter.query(&self.name, STATUS_CONFIG);
        match self.get(STATUS_CONFIG, decode_config).await {
            Ok((yaml, global)) => {
                let result = ConfigResult {
                    uri: self.uri.clone(),
                    yaml,
                    global,
                };
                self.cache.add(key, CachedValue::Config(result.clone())).await;
                Ok(result)
            }
            Err(err) => {
                error!(error = %err, "Prometheus config query failed");
                self.reporter.error(&self.name, STATUS_CONFIG, &err);
                Err(err)
            }
        }
    }

    /// Fetches the command line flags of the server.
    #[tracing::instrument(skip(self), fields(uri = %self.uri))]
    pub async fn flags(&self) -> Result<FlagsResult, QueryError> {
        let _guard = self.locks.lock(STATUS_FLAGS).await;

        let key = CacheKey::status(STATUS_FLAGS);
        if let Some(CachedValue::Flags(result)) = self.cache.get(&key).await {
            debug!("Flags returned from cache");
            self.reporter.cache_hit(&self.name, STATUS_FLAGS);
            return Ok(result);
        }

        debug!("Scheduling prometheus flags query");
        self.reporter.query(&self.name, STATUS_FLAGS);
        match self
            .get(STATUS_FLAGS, response::decode_data::<BTreeMap<SmolStr, SmolStr>>)
            .await
        {
            Ok(flags) => {
                let result = FlagsResult {
                    uri: self.uri.clone(),
                    flags,
                };
                self.cache.add(key, CachedValue::Flags(result.clone())).await;
                Ok(result)
            }
            Err(err) => {
                error!(error = %err, "Prometheus flags query failed");
                self.reporter.error(&self.name, STATUS_FLAGS, &err);
                Err(err)
            }
        }
    }
}
