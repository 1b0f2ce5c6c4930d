//! Test utilities for the Kameleoon OpenFeature provider.
//!
//! Hand-written doubles for the Kameleoon client and the resolver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use open_feature::EvaluationErrorCode;

use crate::client::{ClientError, KameleoonClient, SdkParameters};
use crate::data::Data;
use crate::resolver::{FlagValue, ResolutionRequest, ResolutionResult, Resolver};

/// Site code used by provider tests.
pub const TEST_SITE_CODE: &str = "siteCode";

/// Visitor code returned by [`MockClient`] unless overridden.
pub const TEST_VISITOR_CODE: &str = "visitorCode";

/// A recording mock of the Kameleoon client.
pub struct MockClient {
    visitor_code: Result<String, ClientError>,
    init_result: Result<bool, ClientError>,
    variations: HashMap<String, (String, HashMap<String, serde_json::Value>)>,
    variation_error: Option<ClientError>,
    add_data_error: Option<ClientError>,
    add_data_calls: Mutex<Vec<(String, Vec<Data>)>>,
    variation_requests: Mutex<Vec<String>>,
    visitor_code_hints: Mutex<Vec<Option<String>>>,
    init_calls: Mutex<usize>,
}

impl MockClient {
    /// A client that initializes successfully and has no flags.
    pub fn new() -> Self {
        Self {
            visitor_code: Ok(TEST_VISITOR_CODE.to_string()),
            init_result: Ok(true),
            variations: HashMap::new(),
            variation_error: None,
            add_data_error: None,
            add_data_calls: Mutex::new(vec![]),
            variation_requests: Mutex::new(vec![]),
            visitor_code_hints: Mutex::new(vec![]),
            init_calls: Mutex::new(0),
        }
    }

    pub fn with_visitor_code(mut self, visitor_code: Result<String, ClientError>) -> Self {
        self.visitor_code = visitor_code;
        self
    }

    pub fn with_init_result(mut self, result: Result<bool, ClientError>) -> Self {
        self.init_result = result;
        self
    }

    /// Assign `variation` for `feature` with the given variables.
    pub fn with_variation<I, K>(mut self, feature: &str, variation: &str, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let variables = variables.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.variations
            .insert(feature.to_string(), (variation.to_string(), variables));
        self
    }

    /// Fail every variation lookup with `error`.
    pub fn with_variation_error(mut self, error: ClientError) -> Self {
        self.variation_error = Some(error);
        self
    }

    pub fn with_add_data_error(mut self, error: ClientError) -> Self {
        self.add_data_error = Some(error);
        self
    }

    pub fn add_data_calls(&self) -> Vec<(String, Vec<Data>)> {
        self.add_data_calls.lock().unwrap().clone()
    }

    /// Visitor codes passed to `get_feature_variation_key`.
    pub fn variation_requests(&self) -> Vec<String> {
        self.variation_requests.lock().unwrap().clone()
    }

    pub fn visitor_code_hints(&self) -> Vec<Option<String>> {
        self.visitor_code_hints.lock().unwrap().clone()
    }

    pub fn init_calls(&self) -> usize {
        *self.init_calls.lock().unwrap()
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KameleoonClient for MockClient {
    async fn initialize(&self) -> Result<bool, ClientError> {
        *self.init_calls.lock().unwrap() += 1;
        self.init_result.clone()
    }

    fn get_visitor_code(&self, default_visitor_code: Option<&str>) -> Result<String, ClientError> {
        self.visitor_code_hints
            .lock()
            .unwrap()
            .push(default_visitor_code.map(str::to_string));
        self.visitor_code.clone()
    }

    fn add_data(&self, visitor_code: &str, data: Vec<Data>) -> Result<(), ClientError> {
        if let Some(ref error) = self.add_data_error {
            return Err(error.clone());
        }
        self.add_data_calls
            .lock()
            .unwrap()
            .push((visitor_code.to_string(), data));
        Ok(())
    }

    fn get_feature_variation_key(
        &self,
        visitor_code: &str,
        feature_key: &str,
    ) -> Result<String, ClientError> {
        self.variation_requests
            .lock()
            .unwrap()
            .push(visitor_code.to_string());
        if let Some(ref error) = self.variation_error {
            return Err(error.clone());
        }
        self.variations
            .get(feature_key)
            .map(|(variation, _)| variation.clone())
            .ok_or_else(|| ClientError::FeatureNotFound(feature_key.to_string()))
    }

    fn get_feature_variation_variables(
        &self,
        feature_key: &str,
        _variation_key: &str,
    ) -> Result<HashMap<String, serde_json::Value>, ClientError> {
        self.variations
            .get(feature_key)
            .map(|(_, variables)| variables.clone())
            .ok_or_else(|| ClientError::FeatureNotFound(feature_key.to_string()))
    }
}

/// A factory handing out a shared mock client.
pub fn mock_factory(
    client: Arc<MockClient>,
) -> impl Fn(SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError> {
    move |_params| Ok(client.clone() as Arc<dyn KameleoonClient>)
}

/// A factory that always fails with `error`.
pub fn failing_factory(
    error: ClientError,
) -> impl Fn(SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError> {
    move |_params| Err(error.clone())
}

/// A request seen by [`StubResolver`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub flag_key: String,
    pub is_any_type: bool,
}

/// A resolver returning a fixed value and recording every request.
pub struct StubResolver {
    value: serde_json::Value,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubResolver {
    pub fn new(value: serde_json::Value) -> Self {
        Self {
            value,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Shared handle to the recorded requests, usable after the stub is moved.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl Resolver for StubResolver {
    fn resolve<T: FlagValue>(&self, request: ResolutionRequest<'_, T>) -> ResolutionResult<T> {
        self.requests.lock().unwrap().push(RecordedRequest {
            flag_key: request.flag_key.to_string(),
            is_any_type: request.is_any_type,
        });
        match T::from_json(self.value.clone()) {
            Some(value) => ResolutionResult::new(value),
            None => ResolutionResult::error(
                request.default_value,
                EvaluationErrorCode::TypeMismatch,
                "stub value has a different type",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use open_feature::EvaluationContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_client_defaults() {
        let client = MockClient::new();
        assert_eq!(client.initialize().await, Ok(true));
        assert_eq!(client.init_calls(), 1);
        assert_eq!(client.get_visitor_code(Some("hint")).unwrap(), TEST_VISITOR_CODE);
        assert_eq!(client.visitor_code_hints(), vec![Some("hint".to_string())]);
    }

    #[test]
    fn test_stub_resolver_records_requests() {
        let stub = StubResolver::new(json!(true));
        let requests = stub.requests();
        let ctx = EvaluationContext::default();

        let result = stub.resolve(ResolutionRequest {
            flag_key: "flag",
            default_value: false,
            context: &ctx,
            is_any_type: false,
        });

        assert!(result.value);
        assert_eq!(
            *requests.lock().unwrap(),
            vec![RecordedRequest {
                flag_key: "flag".to_string(),
                is_any_type: false
            }]
        );
    }
}
