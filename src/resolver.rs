//! Flag resolution against the Kameleoon client.

use std::sync::Arc;

use open_feature::{EvaluationContext, EvaluationContextFieldValue, EvaluationErrorCode};

use crate::client::{ClientError, KameleoonClient};
use crate::data::DataType;

const TYPE_MISMATCH_MESSAGE: &str =
    "The type of value received is different from the requested value.";

/// A single flag evaluation request.
#[derive(Debug, Clone)]
pub struct ResolutionRequest<'a, T> {
    pub flag_key: &'a str,
    pub default_value: T,
    pub context: &'a EvaluationContext,
    /// Accept a variable of any JSON shape instead of checking it against `T`.
    pub is_any_type: bool,
}

/// Outcome of a flag evaluation.
///
/// On failure `value` holds the request's default value and `error_code`
/// says why.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult<T> {
    pub value: T,
    pub variant: Option<String>,
    pub error_code: Option<EvaluationErrorCode>,
    pub error_message: Option<String>,
}

impl<T> ResolutionResult<T> {
    /// A successful result carrying only a value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            variant: None,
            error_code: None,
            error_message: None,
        }
    }

    /// A failed result falling back to `default_value`.
    pub fn error(default_value: T, code: EvaluationErrorCode, message: impl Into<String>) -> Self {
        Self {
            value: default_value,
            variant: None,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

/// A value type a flag can be resolved to.
pub trait FlagValue: Sized + Send {
    /// Whether a Kameleoon variable has the JSON kind this type expects.
    fn matches(value: &serde_json::Value) -> bool;

    /// Extract the value from a Kameleoon variable.
    fn from_json(value: serde_json::Value) -> Option<Self>;
}

impl FlagValue for bool {
    fn matches(value: &serde_json::Value) -> bool {
        value.is_boolean()
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FlagValue for String {
    fn matches(value: &serde_json::Value) -> bool {
        value.is_string()
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FlagValue for f64 {
    fn matches(value: &serde_json::Value) -> bool {
        value.is_number()
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FlagValue for i64 {
    fn matches(value: &serde_json::Value) -> bool {
        value.is_i64()
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FlagValue for serde_json::Value {
    fn matches(value: &serde_json::Value) -> bool {
        value.is_object()
    }

    fn from_json(value: serde_json::Value) -> Option<Self> {
        Some(value)
    }
}

/// Translates flag requests into Kameleoon evaluations.
pub trait Resolver: Send + Sync + 'static {
    fn resolve<T: FlagValue>(&self, request: ResolutionRequest<'_, T>) -> ResolutionResult<T>;
}

/// Resolver reading flag values from Kameleoon variation variables.
///
/// The variable is picked by the context's `variableKey` field, or by the flag
/// key when the context has none.
pub struct KameleoonResolver {
    client: Arc<dyn KameleoonClient>,
    visitor_code: String,
}

impl KameleoonResolver {
    pub fn new(client: Arc<dyn KameleoonClient>, visitor_code: impl Into<String>) -> Self {
        Self {
            client,
            visitor_code: visitor_code.into(),
        }
    }

    pub fn visitor_code(&self) -> &str {
        &self.visitor_code
    }
}

impl Resolver for KameleoonResolver {
    fn resolve<T: FlagValue>(&self, request: ResolutionRequest<'_, T>) -> ResolutionResult<T> {
        let ResolutionRequest {
            flag_key,
            default_value,
            context,
            is_any_type,
        } = request;
        let variable_key = variable_key(context, flag_key);

        let variation_key = match self
            .client
            .get_feature_variation_key(&self.visitor_code, flag_key)
        {
            Ok(key) => key,
            Err(e) => return client_error_result(default_value, e),
        };

        let mut variables = match self
            .client
            .get_feature_variation_variables(flag_key, &variation_key)
        {
            Ok(variables) => variables,
            Err(e) => return client_error_result(default_value, e).with_variant(variation_key),
        };

        let Some(variable) = variables.remove(variable_key) else {
            let message = if variables.is_empty() {
                format!("The variation '{}' has no variables", variation_key)
            } else {
                format!(
                    "The value for provided variable key '{}' isn't found in variation '{}'",
                    variable_key, variation_key
                )
            };
            return ResolutionResult::error(default_value, EvaluationErrorCode::FlagNotFound, message)
                .with_variant(variation_key);
        };

        if !is_any_type && !T::matches(&variable) {
            return type_mismatch(default_value).with_variant(variation_key);
        }

        match T::from_json(variable) {
            Some(value) => {
                tracing::debug!(
                    "Resolved flag '{}' to variation '{}'",
                    flag_key,
                    variation_key
                );
                ResolutionResult::new(value).with_variant(variation_key)
            }
            None => type_mismatch(default_value).with_variant(variation_key),
        }
    }
}

fn variable_key<'a>(context: &'a EvaluationContext, flag_key: &'a str) -> &'a str {
    match context.custom_fields.get(DataType::VARIABLE_KEY) {
        Some(EvaluationContextFieldValue::String(key)) if !key.is_empty() => key.as_str(),
        _ => flag_key,
    }
}

fn type_mismatch<T>(default_value: T) -> ResolutionResult<T> {
    ResolutionResult::error(
        default_value,
        EvaluationErrorCode::TypeMismatch,
        TYPE_MISMATCH_MESSAGE,
    )
}

fn client_error_result<T>(default_value: T, error: ClientError) -> ResolutionResult<T> {
    let message = error.to_string();
    let code = match error {
        ClientError::FeatureNotFound(_) => EvaluationErrorCode::FlagNotFound,
        ClientError::VisitorCodeInvalid(_) => EvaluationErrorCode::InvalidContext,
        _ => EvaluationErrorCode::General(message.clone()),
    };
    ResolutionResult::error(default_value, code, message)
}
