use std::{str::FromStr, sync::Arc, time::Duration};

use crate::{HttpRecordStore, MemoryRecordStore, RecordStore, StoreError, StoreResult};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Memory,
    Http,
}

impl FromStr for StoreBackend {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "http" | "remote" => Ok(StoreBackend::Http),
            other => Err(StoreError::Config(format!("unknown STORE_BACKEND {other:?}"))),
        }
    }
}

/// Where records live and how to reach them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub timeout: Option<Duration>,
    /// Load demo records into an empty in-memory store on startup.
    pub seed_demo: bool,
}

impl StoreSettings {
    pub fn memory() -> Self {
        Self {
            seed_demo: true,
            ..Self::default()
        }
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };

        let backend = value("STORE_BACKEND")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();

        let timeout = value("STORE_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| StoreError::Config(format!("invalid STORE_TIMEOUT_SECS {raw:?}")))
            })
            .transpose()?;

        let seed_demo = value("STORE_SEED_DEMO")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(backend == StoreBackend::Memory);

        let settings = Self {
            backend,
            url: value("STORE_URL"),
            api_key: value("STORE_API_KEY"),
            project_id: value("STORE_PROJECT_ID"),
            timeout,
            seed_demo,
        };
        if settings.backend == StoreBackend::Http && settings.url.is_none() {
            return Err(StoreError::MissingUrl);
        }
        Ok(settings)
    }
}

/// Build the store handle every adapter shares.
pub fn connect(settings: &StoreSettings) -> StoreResult<Arc<dyn RecordStore>> {
    match settings.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryRecordStore::new())),
        StoreBackend::Http => {
            let url = settings.url.clone().ok_or(StoreError::MissingUrl)?;
            let mut store = HttpRecordStore::new(url, settings.timeout)?;
            if let Some(key) = &settings.api_key {
                store = store.with_api_key(key.clone());
            }
            if let Some(project) = &settings.project_id {
                store = store.with_project_id(project.clone());
            }
            Ok(Arc::new(store))
        }
    }
}
