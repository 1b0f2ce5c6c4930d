//! Conversion of OpenFeature evaluation contexts into Kameleoon data items.

use std::any::Any;

use open_feature::{EvaluationContext, EvaluationContextFieldValue};
use serde::{Deserialize, Serialize};

/// Custom data attached to a visitor, addressed by the index configured in Kameleoon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomData {
    pub index: u32,
    pub values: Vec<String>,
}

impl CustomData {
    pub fn new<I, S>(index: u32, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A goal conversion for a visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub goal_id: u32,
    pub revenue: f64,
    pub negative: bool,
}

impl Conversion {
    pub fn new(goal_id: u32) -> Self {
        Self {
            goal_id,
            revenue: 0.0,
            negative: false,
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = revenue;
        self
    }

    pub fn negative(mut self) -> Self {
        self.negative = true;
        self
    }
}

/// A data item accepted by `KameleoonClient::add_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    CustomData(CustomData),
    Conversion(Conversion),
}

impl From<CustomData> for Data {
    fn from(data: CustomData) -> Self {
        Data::CustomData(data)
    }
}

impl From<Conversion> for Data {
    fn from(data: Conversion) -> Self {
        Data::Conversion(data)
    }
}

/// Evaluation context keys understood by the provider, and helpers to build
/// the matching context values.
///
/// ```
/// use kameleoon_openfeature_provider::DataType;
/// use open_feature::EvaluationContext;
///
/// let context = EvaluationContext::default()
///     .with_targeting_key("visitor-1")
///     .with_custom_field(DataType::CUSTOM_DATA, DataType::make_custom_data(1, ["premium"]))
///     .with_custom_field(DataType::VARIABLE_KEY, "color");
/// ```
pub struct DataType;

impl DataType {
    /// Key holding one `CustomData` or a `Vec<CustomData>`.
    pub const CUSTOM_DATA: &'static str = "customData";
    /// Key holding one `Conversion` or a `Vec<Conversion>`.
    pub const CONVERSION: &'static str = "conversion";
    /// Key naming the variation variable to resolve; defaults to the flag key.
    pub const VARIABLE_KEY: &'static str = "variableKey";

    pub fn make_custom_data<I, S>(index: u32, values: I) -> EvaluationContextFieldValue
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EvaluationContextFieldValue::new_struct(CustomData::new(index, values))
    }

    pub fn make_conversion(goal_id: u32) -> EvaluationContextFieldValue {
        EvaluationContextFieldValue::new_struct(Conversion::new(goal_id))
    }

    pub fn make_conversion_with_revenue(goal_id: u32, revenue: f64) -> EvaluationContextFieldValue {
        EvaluationContextFieldValue::new_struct(Conversion::new(goal_id).with_revenue(revenue))
    }
}

/// Convert an evaluation context into Kameleoon data items.
///
/// Custom data comes first, then conversions. The targeting key and any other
/// custom fields do not produce data.
pub fn to_kameleoon(context: &EvaluationContext) -> Vec<Data> {
    let mut data = Vec::new();
    if let Some(value) = context.custom_fields.get(DataType::CUSTOM_DATA) {
        collect::<CustomData>(DataType::CUSTOM_DATA, value, &mut data);
    }
    if let Some(value) = context.custom_fields.get(DataType::CONVERSION) {
        collect::<Conversion>(DataType::CONVERSION, value, &mut data);
    }
    data
}

fn collect<T>(key: &str, value: &EvaluationContextFieldValue, out: &mut Vec<Data>)
where
    T: Any + Clone + Into<Data>,
{
    let EvaluationContextFieldValue::Struct(object) = value else {
        tracing::warn!("Ignoring context field '{}': expected a structured value", key);
        return;
    };

    if let Some(item) = object.downcast_ref::<T>() {
        out.push(item.clone().into());
    } else if let Some(items) = object.downcast_ref::<Vec<T>>() {
        out.extend(items.iter().cloned().map(Into::into));
    } else {
        tracing::warn!("Ignoring context field '{}': unsupported value type", key);
    }
}
