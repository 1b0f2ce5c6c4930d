//! Kameleoon SDK configuration handed to the client factory.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Partial Kameleoon SDK configuration.
///
/// Every field is optional; fields left unset keep the SDK's own defaults.
/// Field names follow the SDK's camelCase naming when (de)serialized, so a
/// configuration document shared with other Kameleoon SDKs can be loaded as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SdkConfiguration {
    /// Interval for refreshing the flag configuration, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<u64>,
    /// Feature flag environment (e.g. `production`, `staging`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Interval for purging stale targeting data, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targeting_data_cleanup_interval: Option<u64>,
    /// Domain the visitor code cookie is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_domain: Option<String>,
    /// Interval for flushing tracking requests, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_interval: Option<u64>,
    /// Timeout for SDK network requests, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

impl SdkConfiguration {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Set the configuration update interval in minutes.
    pub fn with_update_interval(mut self, minutes: u64) -> Self {
        self.update_interval = Some(minutes);
        self
    }

    /// Set the feature flag environment.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Set the targeting data cleanup interval in minutes.
    pub fn with_targeting_data_cleanup_interval(mut self, minutes: u64) -> Self {
        self.targeting_data_cleanup_interval = Some(minutes);
        self
    }

    /// Set the cookie domain.
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the tracking interval in milliseconds.
    pub fn with_tracking_interval(mut self, interval_ms: u64) -> Self {
        self.tracking_interval = Some(interval_ms);
        self
    }

    /// Set the request timeout in milliseconds.
    pub fn with_request_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout = Some(timeout_ms);
        self
    }
}

/// Key/value storage the SDK persists its data in.
pub trait ExternalStorage: Send + Sync {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&self, key: &str, value: &str);
}

/// Persistence for the visitor code (cookies in a browser, a session store on a server).
pub trait VisitorCodeManager: Send + Sync {
    fn get_visitor_code(&self) -> Option<String>;
    fn set_visitor_code(&self, visitor_code: &str);
}

/// Overrides for the SDK's external dependencies.
///
/// The provider passes these through to the client factory untouched.
#[derive(Clone, Default)]
pub struct Externals {
    pub storage: Option<Arc<dyn ExternalStorage>>,
    pub visitor_code_manager: Option<Arc<dyn VisitorCodeManager>>,
}

impl Externals {
    pub fn with_storage(mut self, storage: Arc<dyn ExternalStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_visitor_code_manager(mut self, manager: Arc<dyn VisitorCodeManager>) -> Self {
        self.visitor_code_manager = Some(manager);
        self
    }
}

impl fmt::Debug for Externals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Externals")
            .field("storage", &self.storage.is_some())
            .field("visitor_code_manager", &self.visitor_code_manager.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_camel_case() {
        let config = SdkConfiguration::from_json(
            r#"{"updateInterval": 60, "environment": "staging", "requestTimeout": 2000}"#,
        )
        .expect("valid configuration");

        assert_eq!(config.update_interval, Some(60));
        assert_eq!(config.environment.as_deref(), Some("staging"));
        assert_eq!(config.request_timeout, Some(2000));
        assert!(config.cookie_domain.is_none());
    }

    #[test]
    fn test_from_json_empty_document_is_all_defaults() {
        let config = SdkConfiguration::from_json("{}").expect("valid configuration");
        assert_eq!(config, SdkConfiguration::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_field() {
        let result = SdkConfiguration::from_json(r#"{"updateIntervalMinutes": 5}"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_json_rejects_wrong_type() {
        let result = SdkConfiguration::from_json(r#"{"trackingInterval": "fast"}"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_builder_round_trips_through_json() {
        let config = SdkConfiguration::default()
            .with_environment("production")
            .with_tracking_interval(500)
            .with_cookie_domain(".example.com");

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"trackingInterval\":500"));
        assert!(!json.contains("updateInterval"));
        assert_eq!(SdkConfiguration::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_externals_debug_hides_handles() {
        struct NoStorage;
        impl ExternalStorage for NoStorage {
            fn read(&self, _key: &str) -> Option<String> {
                None
            }
            fn write(&self, _key: &str, _value: &str) {}
        }

        let externals = Externals::default().with_storage(Arc::new(NoStorage));
        let debug = format!("{:?}", externals);
        assert!(debug.contains("storage: true"));
        assert!(debug.contains("visitor_code_manager: false"));
    }
}
