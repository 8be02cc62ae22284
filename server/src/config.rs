use anyhow::{Context, Result};
use platform_store::StoreSettings;

const DEFAULT_NOTIFICATION_BUFFER: usize = 50;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub cors_allowed_origins: Vec<String>,
    pub notification_buffer: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = StoreSettings::from_lookup(&lookup).context("invalid record store settings")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let notification_buffer = match lookup("NOTIFICATION_BUFFER") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid NOTIFICATION_BUFFER {raw:?}"))?,
            None => DEFAULT_NOTIFICATION_BUFFER,
        };

        Ok(Self {
            store,
            cors_allowed_origins,
            notification_buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_store::StoreBackend;

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.cors_allowed_origins, ["http://localhost:5173"]);
        assert_eq!(config.notification_buffer, 50);
    }

    #[test]
    fn parses_origins_and_buffer() {
        let config = AppConfig::from_lookup(|key| match key {
            "CORS_ALLOWED_ORIGINS" => Some("https://a.example, ,https://b.example".into()),
            "NOTIFICATION_BUFFER" => Some("10".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            ["https://a.example", "https://b.example"]
        );
        assert_eq!(config.notification_buffer, 10);
        assert!(AppConfig::from_lookup(|key| (key == "NOTIFICATION_BUFFER").then(|| "lots".into())).is_err());
    }
}
