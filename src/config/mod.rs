use dashmap::DashMap;
use std::env;
use std::sync::Arc;

const DEBUG_KEY: &str = "BULWARK_DEBUG";
const TITLE_KEY: &str = "BULWARK_TITLE";
const VERSION_KEY: &str = "BULWARK_VERSION";
const OPENAPI_URL_KEY: &str = "BULWARK_OPENAPI_URL";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Create a service populated from the process environment
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Read a boolean flag. `1`, `true`, `yes` and `on` (any case) are truthy.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }
}

/// Application-level settings shared by the catch-all layer and the
/// document builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Diagnostic mode: expose failure messages and tracebacks in 500 bodies.
    pub debug: bool,
    pub title: String,
    pub version: String,
    /// Where the OpenAPI document is served. `None` disables the route.
    pub openapi_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            title: "Bulwark API".to_string(),
            version: "0.1.0".to_string(),
            openapi_url: Some("/openapi.json".to_string()),
        }
    }
}

impl AppConfig {
    /// Load settings from the environment
    pub fn from_env() -> Self {
        Self::from_service(&ConfigService::new())
    }

    /// Load settings from a config service, falling back to defaults for
    /// missing keys. An empty `BULWARK_OPENAPI_URL` disables the document route.
    pub fn from_service(service: &ConfigService) -> Self {
        let defaults = Self::default();
        let openapi_url = match service.get(OPENAPI_URL_KEY) {
            Some(url) => normalize_route_path(&url),
            None => defaults.openapi_url,
        };

        Self {
            debug: service.get_bool(DEBUG_KEY).unwrap_or(defaults.debug),
            title: service.get(TITLE_KEY).unwrap_or(defaults.title),
            version: service.get(VERSION_KEY).unwrap_or(defaults.version),
            openapi_url,
        }
    }
}

/// Trim a route path and give it the leading `/` axum requires.
/// A blank path yields `None`.
pub fn normalize_route_path(path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        None
    } else if path.starts_with('/') {
        Some(path.to_string())
    } else {
        Some(format!("/{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = AppConfig::from_service(&ConfigService::default());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_reads_overrides() {
        let service = ConfigService::default();
        service.set(DEBUG_KEY, "TRUE");
        service.set(TITLE_KEY, "Orders");
        service.set(VERSION_KEY, "2.1.0");
        service.set(OPENAPI_URL_KEY, "/docs/openapi.json");

        let config = AppConfig::from_service(&service);
        assert!(config.debug);
        assert_eq!(config.title, "Orders");
        assert_eq!(config.version, "2.1.0");
        assert_eq!(config.openapi_url.as_deref(), Some("/docs/openapi.json"));
    }

    #[test]
    fn test_empty_openapi_url_disables_route() {
        let service = ConfigService::default();
        service.set(OPENAPI_URL_KEY, "");
        service.set(DEBUG_KEY, "nope");

        let config = AppConfig::from_service(&service);
        assert_eq!(config.openapi_url, None);
        assert!(!config.debug);
    }

    #[test]
    fn test_openapi_url_gets_leading_slash() {
        let service = ConfigService::default();
        service.set(OPENAPI_URL_KEY, " openapi.json ");

        let config = AppConfig::from_service(&service);
        assert_eq!(config.openapi_url.as_deref(), Some("/openapi.json"));
    }

    #[test]
    fn test_normalize_route_path() {
        assert_eq!(normalize_route_path("/docs").as_deref(), Some("/docs"));
        assert_eq!(normalize_route_path("docs/api.json").as_deref(), Some("/docs/api.json"));
        assert_eq!(normalize_route_path("   "), None);
    }
}
