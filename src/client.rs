//! Contract of the Kameleoon SDK client the provider drives.
//!
//! The SDK itself (configuration fetching, targeting, experiment allocation)
//! lives behind [`KameleoonClient`]; the provider only creates a client through
//! a [`ClientFactory`] and calls the operations below.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Externals, SdkConfiguration};
use crate::data::Data;

/// Errors reported by the Kameleoon SDK client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The site code is missing.
    #[error("Site code can not be empty")]
    SiteCodeIsEmpty,

    /// The feature flag does not exist in the current configuration.
    #[error("Feature flag '{0}' not found")]
    FeatureNotFound(String),

    /// The visitor code is empty, too long or otherwise rejected.
    #[error("Visitor code is invalid: {0}")]
    VisitorCodeInvalid(String),

    /// Any other SDK failure. The message may be empty.
    #[error("{0}")]
    Sdk(String),
}

/// Parameters used to create a Kameleoon client.
#[derive(Debug, Clone)]
pub struct SdkParameters {
    pub site_code: String,
    pub configuration: Option<SdkConfiguration>,
    pub externals: Option<Externals>,
}

/// Operations of the Kameleoon SDK client used by the provider.
#[async_trait]
pub trait KameleoonClient: Send + Sync {
    /// Fetch the flag configuration. Resolves to `true` once the client is usable.
    async fn initialize(&self) -> Result<bool, ClientError>;

    /// Return the visitor code to use, preferring a stored one and falling back
    /// to `default_visitor_code` (or a generated code when that is `None`).
    fn get_visitor_code(&self, default_visitor_code: Option<&str>) -> Result<String, ClientError>;

    /// Attach data items to a visitor.
    fn add_data(&self, visitor_code: &str, data: Vec<Data>) -> Result<(), ClientError>;

    /// Return the key of the variation assigned to the visitor for a feature flag.
    fn get_feature_variation_key(
        &self,
        visitor_code: &str,
        feature_key: &str,
    ) -> Result<String, ClientError>;

    /// Return the variables of a feature flag variation.
    fn get_feature_variation_variables(
        &self,
        feature_key: &str,
        variation_key: &str,
    ) -> Result<HashMap<String, serde_json::Value>, ClientError>;
}

/// Creates Kameleoon clients.
///
/// Implemented for every `Fn(SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError>`.
pub trait ClientFactory {
    fn create(&self, params: SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError>;
}

impl<F> ClientFactory for F
where
    F: Fn(SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError>,
{
    fn create(&self, params: SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError> {
        self(params)
    }
}
