//! OpenFeature provider for the Kameleoon feature flag SDK.
//!
//! The provider creates a Kameleoon client through a [`ClientFactory`],
//! forwards evaluation context data to it, and resolves flag values from the
//! variables of the variation Kameleoon assigns to the visitor.

pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod provider;
pub mod resolver;
mod version;

#[cfg(test)]
pub mod test_utils;

pub use client::{ClientError, ClientFactory, KameleoonClient, SdkParameters};
pub use config::{ExternalStorage, Externals, SdkConfiguration, VisitorCodeManager};
pub use data::{to_kameleoon, Conversion, CustomData, Data, DataType};
pub use error::{Error, Result};
pub use events::{EventEmitter, ProviderEvent};
pub use provider::{KameleoonProvider, ProviderOptions, PROVIDER_NAME};
pub use resolver::{FlagValue, KameleoonResolver, ResolutionRequest, ResolutionResult, Resolver};
pub use version::VERSION;

// Re-export commonly used types from open-feature
pub use open_feature::{EvaluationContext, EvaluationErrorCode, EvaluationReason};
