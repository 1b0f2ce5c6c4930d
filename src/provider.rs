//! OpenFeature provider implementation for Kameleoon.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use open_feature::provider::{
    FeatureProvider, ProviderMetadata, ProviderStatus, ResolutionDetails,
};
use open_feature::{
    EvaluationContext, EvaluationError, EvaluationErrorCode, EvaluationReason, EvaluationResult,
    StructValue, Value,
};

use crate::client::{ClientError, ClientFactory, KameleoonClient, SdkParameters};
use crate::config::{Externals, SdkConfiguration};
use crate::data::to_kameleoon;
use crate::error::{Error, Result};
use crate::events::{EventEmitter, ProviderEvent};
use crate::resolver::{FlagValue, KameleoonResolver, ResolutionRequest, ResolutionResult, Resolver};
use crate::VERSION;

/// Name reported in the provider metadata.
pub const PROVIDER_NAME: &str = "Kameleoon Provider";

const CLIENT_NOT_CREATED: &str = "Kameleoon client is not created with unknown error";
const CLIENT_INIT_FAILED: &str = "Kameleoon client failed to initialize";

/// Configuration options for the Kameleoon provider.
pub struct ProviderOptions {
    /// Site code defined on the Kameleoon platform.
    pub site_code: String,
    /// Visitor code defined on the Kameleoon platform. Used when the client
    /// has no stored visitor code of its own.
    pub visitor_code: String,
    /// Partial SDK configuration; unset fields keep SDK defaults.
    pub configuration: Option<SdkConfiguration>,
    /// Overrides for the SDK's external dependencies.
    pub externals: Option<Externals>,
    /// Emitter for lifecycle events. A fresh one is created if not set.
    pub events: Option<EventEmitter>,
}

impl ProviderOptions {
    /// Create new options with the required site code and visitor code.
    pub fn new(site_code: impl Into<String>, visitor_code: impl Into<String>) -> Self {
        Self {
            site_code: site_code.into(),
            visitor_code: visitor_code.into(),
            configuration: None,
            externals: None,
            events: None,
        }
    }

    /// Set the SDK configuration.
    pub fn with_configuration(mut self, configuration: SdkConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Set the SDK external dependency overrides.
    pub fn with_externals(mut self, externals: Externals) -> Self {
        self.externals = Some(externals);
        self
    }

    /// Emit lifecycle events on `events`, including failures during construction.
    pub fn with_event_emitter(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }
}

/// OpenFeature provider backed by the Kameleoon SDK.
///
/// Flag values are resolved by `R`, [`KameleoonResolver`] unless another
/// resolver is injected with [`KameleoonProvider::with_resolver`].
pub struct KameleoonProvider<R = KameleoonResolver> {
    metadata: ProviderMetadata,
    visitor_code: String,
    client: Arc<dyn KameleoonClient>,
    resolver: R,
    events: EventEmitter,
    status: ProviderStatus,
}

impl KameleoonProvider<KameleoonResolver> {
    /// Create a new Kameleoon provider, building the client with `factory`.
    ///
    /// Fails with [`Error::ProviderFatal`] and emits [`ProviderEvent::Error`]
    /// when the client cannot be created.
    pub fn new<F>(options: ProviderOptions, factory: &F) -> Result<Self>
    where
        F: ClientFactory + ?Sized,
    {
        Self::with_resolver(options, factory, |client, visitor_code| {
            Ok(KameleoonResolver::new(client, visitor_code))
        })
    }
}

impl<R: Resolver> KameleoonProvider<R> {
    /// Create a provider whose resolver is built by `make_resolver` from the
    /// client and the effective visitor code.
    pub fn with_resolver<F, M>(options: ProviderOptions, factory: &F, make_resolver: M) -> Result<Self>
    where
        F: ClientFactory + ?Sized,
        M: FnOnce(Arc<dyn KameleoonClient>, String) -> std::result::Result<R, ClientError>,
    {
        let ProviderOptions {
            site_code,
            visitor_code,
            configuration,
            externals,
            events,
        } = options;
        let events = events.unwrap_or_default();

        let created = Self::create_client(site_code, configuration, externals, factory).and_then(
            |client| {
                let visitor_code = client.get_visitor_code(Some(visitor_code.as_str()))?;
                if visitor_code.is_empty() {
                    return Err(ClientError::VisitorCodeInvalid(
                        "client returned an empty visitor code".to_string(),
                    ));
                }
                let resolver = make_resolver(Arc::clone(&client), visitor_code.clone())?;
                Ok((client, visitor_code, resolver))
            },
        );

        match created {
            Ok((client, visitor_code, resolver)) => {
                tracing::debug!(
                    "Created Kameleoon provider v{} for visitor {}",
                    VERSION,
                    visitor_code
                );
                Ok(Self {
                    metadata: ProviderMetadata::new(PROVIDER_NAME),
                    visitor_code,
                    client,
                    resolver,
                    events,
                    status: ProviderStatus::NotReady,
                })
            }
            Err(e) => {
                tracing::error!("Failed to create Kameleoon client: {}", e);
                events.emit(ProviderEvent::Error);
                Err(Error::fatal(&e, CLIENT_NOT_CREATED))
            }
        }
    }

    fn create_client<F>(
        site_code: String,
        configuration: Option<SdkConfiguration>,
        externals: Option<Externals>,
        factory: &F,
    ) -> std::result::Result<Arc<dyn KameleoonClient>, ClientError>
    where
        F: ClientFactory + ?Sized,
    {
        if site_code.is_empty() {
            return Err(ClientError::SiteCodeIsEmpty);
        }
        factory.create(SdkParameters {
            site_code,
            configuration,
            externals,
        })
    }

    /// The visitor code the resolver and context updates are bound to.
    pub fn visitor_code(&self) -> &str {
        &self.visitor_code
    }

    /// The emitter lifecycle events are published on.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Initialize the Kameleoon client.
    ///
    /// Once the client is ready, data from `context` is attached to the
    /// context's targeting key (if any) and [`ProviderEvent::Ready`] is emitted.
    /// A client reporting it is not ready emits [`ProviderEvent::Error`] without
    /// failing; a client error emits it and fails.
    pub async fn init(&mut self, context: Option<&EvaluationContext>) -> Result<()> {
        match self.initialize_client(context).await {
            Ok(true) => {
                tracing::info!("Kameleoon provider is ready");
                self.status = ProviderStatus::Ready;
                self.events.emit(ProviderEvent::Ready);
                Ok(())
            }
            Ok(false) => {
                tracing::warn!("Kameleoon client reported it is not ready");
                self.status = ProviderStatus::Error;
                self.events.emit(ProviderEvent::Error);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to initialize Kameleoon client: {}", e);
                self.status = ProviderStatus::Error;
                self.events.emit(ProviderEvent::Error);
                let message = e.to_string();
                Err(Error::ProviderFatal(if message.is_empty() {
                    CLIENT_INIT_FAILED.to_string()
                } else {
                    format!("{}: {}", CLIENT_INIT_FAILED, message)
                }))
            }
        }
    }

    async fn initialize_client(
        &self,
        context: Option<&EvaluationContext>,
    ) -> std::result::Result<bool, ClientError> {
        if !self.client.initialize().await? {
            return Ok(false);
        }
        if let Some(context) = context {
            if let Some(targeting_key) = context.targeting_key.as_deref().filter(|k| !k.is_empty()) {
                self.client.add_data(targeting_key, to_kameleoon(context))?;
            }
        }
        Ok(true)
    }

    /// Send the data of `new_context` to Kameleoon for the provider's visitor.
    ///
    /// The whole context is resent on every call; `old_context` is not diffed.
    pub fn on_context_change(
        &self,
        _old_context: &EvaluationContext,
        new_context: &EvaluationContext,
    ) -> Result<()> {
        let data = to_kameleoon(new_context);
        tracing::debug!(
            "Sending {} data item(s) for visitor {}",
            data.len(),
            self.visitor_code
        );
        self.client.add_data(&self.visitor_code, data)?;
        Ok(())
    }

    pub fn resolve_boolean_evaluation(
        &self,
        flag_key: &str,
        default_value: bool,
        context: &EvaluationContext,
    ) -> ResolutionResult<bool> {
        self.evaluate(flag_key, default_value, context, false)
    }

    pub fn resolve_string_evaluation(
        &self,
        flag_key: &str,
        default_value: impl Into<String>,
        context: &EvaluationContext,
    ) -> ResolutionResult<String> {
        self.evaluate(flag_key, default_value.into(), context, false)
    }

    pub fn resolve_number_evaluation(
        &self,
        flag_key: &str,
        default_value: f64,
        context: &EvaluationContext,
    ) -> ResolutionResult<f64> {
        self.evaluate(flag_key, default_value, context, false)
    }

    pub fn resolve_integer_evaluation(
        &self,
        flag_key: &str,
        default_value: i64,
        context: &EvaluationContext,
    ) -> ResolutionResult<i64> {
        self.evaluate(flag_key, default_value, context, false)
    }

    /// Resolve a flag to any JSON value.
    pub fn resolve_object_evaluation(
        &self,
        flag_key: &str,
        default_value: serde_json::Value,
        context: &EvaluationContext,
    ) -> ResolutionResult<serde_json::Value> {
        self.evaluate(flag_key, default_value, context, true)
    }

    fn evaluate<T: FlagValue>(
        &self,
        flag_key: &str,
        default_value: T,
        context: &EvaluationContext,
        is_any_type: bool,
    ) -> ResolutionResult<T> {
        tracing::debug!("Resolving flag '{}'", flag_key);
        self.resolver.resolve(ResolutionRequest {
            flag_key,
            default_value,
            context,
            is_any_type,
        })
    }
}

#[async_trait]
impl<R: Resolver> FeatureProvider for KameleoonProvider<R> {
    async fn initialize(&mut self, context: &EvaluationContext) {
        if let Err(e) = self.init(Some(context)).await {
            tracing::error!("Failed to initialize provider: {}", e);
        }
    }

    fn status(&self) -> ProviderStatus {
        match self.status {
            ProviderStatus::NotReady => ProviderStatus::NotReady,
            ProviderStatus::Ready => ProviderStatus::Ready,
            ProviderStatus::Error => ProviderStatus::Error,
            ProviderStatus::STALE => ProviderStatus::STALE,
        }
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn resolve_bool_value(
        &self,
        flag_key: &str,
        evaluation_context: &EvaluationContext,
    ) -> EvaluationResult<ResolutionDetails<bool>> {
        into_details(self.resolve_boolean_evaluation(flag_key, false, evaluation_context))
    }

    async fn resolve_int_value(
        &self,
        flag_key: &str,
        evaluation_context: &EvaluationContext,
    ) -> EvaluationResult<ResolutionDetails<i64>> {
        into_details(self.resolve_integer_evaluation(flag_key, 0, evaluation_context))
    }

    async fn resolve_float_value(
        &self,
        flag_key: &str,
        evaluation_context: &EvaluationContext,
    ) -> EvaluationResult<ResolutionDetails<f64>> {
        into_details(self.resolve_number_evaluation(flag_key, 0.0, evaluation_context))
    }

    async fn resolve_string_value(
        &self,
        flag_key: &str,
        evaluation_context: &EvaluationContext,
    ) -> EvaluationResult<ResolutionDetails<String>> {
        into_details(self.resolve_string_evaluation(flag_key, String::new(), evaluation_context))
    }

    async fn resolve_struct_value(
        &self,
        flag_key: &str,
        evaluation_context: &EvaluationContext,
    ) -> EvaluationResult<ResolutionDetails<StructValue>> {
        let default_value = serde_json::Value::Object(serde_json::Map::new());
        let details =
            into_details(self.resolve_object_evaluation(flag_key, default_value, evaluation_context))?;

        let serde_json::Value::Object(object) = details.value else {
            return Err(EvaluationError::builder()
                .code(EvaluationErrorCode::TypeMismatch)
                .message("Value is not an object")
                .build());
        };

        Ok(ResolutionDetails {
            value: json_object_to_openfeature(object),
            variant: details.variant,
            reason: details.reason,
            flag_metadata: None,
        })
    }
}

// Helper functions

/// Map a resolver result onto the OpenFeature result type. Results carrying an
/// error code become errors so the OpenFeature client applies the caller's default.
fn into_details<T>(result: ResolutionResult<T>) -> EvaluationResult<ResolutionDetails<T>> {
    if let Some(code) = result.error_code {
        let mut error = EvaluationError::builder().code(code).build();
        error.message = result.error_message;
        return Err(error);
    }

    let reason = if result.variant.is_some() {
        EvaluationReason::TargetingMatch
    } else {
        EvaluationReason::Default
    };

    Ok(ResolutionDetails {
        value: result.value,
        variant: result.variant,
        reason: Some(reason),
        flag_metadata: None,
    })
}

fn json_object_to_openfeature(object: serde_json::Map<String, serde_json::Value>) -> StructValue {
    let fields: HashMap<String, Value> = object
        .into_iter()
        .filter_map(|(key, value)| json_to_openfeature(value).map(|v| (key, v)))
        .collect();
    StructValue { fields }
}

fn json_to_openfeature(value: serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Bool(b) => Some(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Int(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::String(s)),
        serde_json::Value::Array(values) => Some(Value::Array(
            values.into_iter().filter_map(json_to_openfeature).collect(),
        )),
        serde_json::Value::Object(object) => Some(Value::Struct(json_object_to_openfeature(object))),
        serde_json::Value::Null => None,
    }
}
