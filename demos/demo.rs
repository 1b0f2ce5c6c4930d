//! Demo application for the Kameleoon OpenFeature provider.
//!
//! The Kameleoon SDK is stood in for by a small in-memory client so the demo
//! runs offline; a real application plugs its SDK client in through the factory.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example demo
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kameleoon_openfeature_provider::{
    ClientError, Data, DataType, KameleoonClient, KameleoonProvider, ProviderOptions,
    SdkConfiguration, SdkParameters,
};
use open_feature::{EvaluationContext, OpenFeature, StructValue};
use serde_json::json;

// Configuration - replace with your actual values
const SITE_CODE: &str = "SITE_CODE";
const FLAG_KEY: &str = "new_checkout";
const VISITOR_CODE: &str = "visitor-1";

struct DemoClient {
    variables: HashMap<String, serde_json::Value>,
}

#[async_trait]
impl KameleoonClient for DemoClient {
    async fn initialize(&self) -> Result<bool, ClientError> {
        Ok(true)
    }

    fn get_visitor_code(&self, default_visitor_code: Option<&str>) -> Result<String, ClientError> {
        default_visitor_code
            .map(str::to_string)
            .ok_or_else(|| ClientError::VisitorCodeInvalid("no visitor code".to_string()))
    }

    fn add_data(&self, visitor_code: &str, data: Vec<Data>) -> Result<(), ClientError> {
        println!("  [client] {} data item(s) for {}: {:?}", data.len(), visitor_code, data);
        Ok(())
    }

    fn get_feature_variation_key(
        &self,
        _visitor_code: &str,
        feature_key: &str,
    ) -> Result<String, ClientError> {
        if feature_key == FLAG_KEY {
            Ok("on".to_string())
        } else {
            Err(ClientError::FeatureNotFound(feature_key.to_string()))
        }
    }

    fn get_feature_variation_variables(
        &self,
        _feature_key: &str,
        _variation_key: &str,
    ) -> Result<HashMap<String, serde_json::Value>, ClientError> {
        Ok(self.variables.clone())
    }
}

fn create_client(params: SdkParameters) -> Result<Arc<dyn KameleoonClient>, ClientError> {
    println!(
        "Creating Kameleoon client for site {} ({:?})",
        params.site_code, params.configuration
    );
    let variables = HashMap::from([
        (FLAG_KEY.to_string(), json!(true)),
        ("button_color".to_string(), json!("green")),
        ("layout".to_string(), json!({"columns": 2, "compact": true})),
    ]);
    Ok(Arc::new(DemoClient { variables }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== Kameleoon OpenFeature Provider Demo ===");
    println!();

    let configuration = SdkConfiguration::from_json(r#"{"environment": "production"}"#)?;
    let options = ProviderOptions::new(SITE_CODE, VISITOR_CODE).with_configuration(configuration);

    println!("Creating Kameleoon provider...");
    let provider = KameleoonProvider::new(options, &create_client)?;
    let mut events = provider.events().subscribe();

    println!("Setting provider on OpenFeature...");
    OpenFeature::singleton_mut().await.set_provider(provider).await;
    println!("Provider event: {:?}", events.try_recv());
    println!();

    let client = OpenFeature::singleton().await.create_client();

    let context = EvaluationContext::default()
        .with_targeting_key(VISITOR_CODE)
        .with_custom_field(DataType::CUSTOM_DATA, DataType::make_custom_data(1, ["premium"]));

    println!("--- Boolean: {} ---", FLAG_KEY);
    match client.get_bool_details(FLAG_KEY, Some(&context), None).await {
        Ok(details) => {
            println!("  Value: {}", details.value);
            println!("  Variant: {:?}", details.variant);
            println!("  Reason: {:?}", details.reason);
        }
        Err(e) => println!("  Error: {:?}", e),
    }
    println!();

    println!("--- String: {} / button_color ---", FLAG_KEY);
    let color_context = context
        .clone()
        .with_custom_field(DataType::VARIABLE_KEY, "button_color");
    match client
        .get_string_details(FLAG_KEY, Some(&color_context), None)
        .await
    {
        Ok(details) => println!("  Value: {}", details.value),
        Err(e) => println!("  Error: {:?}", e),
    }
    println!();

    println!("--- Struct: {} / layout ---", FLAG_KEY);
    let layout_context = context.with_custom_field(DataType::VARIABLE_KEY, "layout");
    match client
        .get_struct_details::<StructValue>(FLAG_KEY, Some(&layout_context), None)
        .await
    {
        Ok(details) => println!("  Value: {:?}", details.value),
        Err(e) => println!("  Error: {:?}", e),
    }
    println!();

    println!("Done!");

    Ok(())
}
