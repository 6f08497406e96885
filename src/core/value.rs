// src/core/value.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The closed set of feature kinds the encoder knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Number,
    Boolean,
    Categorical,
    Text,
    Date,
    Time,
    Duration,
    Currency,
    Uri,
    Binary,
    Vector,
    Composite,
    Undefined,
}

impl FeatureType {
    /// Types whose values project onto a number via [`Value::as_number`].
    pub fn is_numeric(self) -> bool {
        matches!(self, FeatureType::Number | FeatureType::Boolean)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureType::Number => "number",
            FeatureType::Boolean => "boolean",
            FeatureType::Categorical => "categorical",
            FeatureType::Text => "text",
            FeatureType::Date => "date",
            FeatureType::Time => "time",
            FeatureType::Duration => "duration",
            FeatureType::Currency => "currency",
            FeatureType::Uri => "uri",
            FeatureType::Binary => "binary",
            FeatureType::Vector => "vector",
            FeatureType::Composite => "composite",
            FeatureType::Undefined => "undefined",
        };
        f.write_str(name)
    }
}

/// A single feature or output value.
///
/// Equality is value equality and is null-safe: two `Null`s are equal, a
/// `Null` never equals anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Text(String),
    Categorical(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Duration(Duration),
    Currency(String),
    Uri(String),
    Binary(Vec<u8>),
    Vector(Vec<f64>),
    Composite(Vec<Feature>),
    Null,
}

impl Value {
    /// Numeric projection. Defined for finite numbers and booleans only.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Textual projection, used by the text encoder. `Null` maps to "".
    pub fn as_string(&self) -> String {
        match self {
            Value::Text(s) | Value::Categorical(s) | Value::Currency(s) | Value::Uri(s) => {
                s.clone()
            }
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) | Value::Categorical(s) | Value::Currency(s) | Value::Uri(s) => {
                f.write_str(s)
            }
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Vector(v) => write!(f, "{:?}", v),
            Value::Composite(features) => {
                f.write_str("{")?;
                for (i, feature) in features.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", feature.name(), feature.value())?;
                }
                f.write_str("}")
            }
            Value::Null => f.write_str("null"),
        }
    }
}

/// A named, typed input attribute. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    name: String,
    #[serde(rename = "type")]
    feature_type: FeatureType,
    value: Value,
}

impl Feature {
    pub fn new(name: impl Into<String>, feature_type: FeatureType, value: Value) -> Self {
        Feature {
            name: name.into(),
            feature_type,
            value,
        }
    }

    pub fn number(name: impl Into<String>, number: f64) -> Self {
        Self::new(name, FeatureType::Number, Value::Number(number))
    }

    pub fn boolean(name: impl Into<String>, truth: bool) -> Self {
        Self::new(name, FeatureType::Boolean, Value::Boolean(truth))
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, FeatureType::Text, Value::Text(text.into()))
    }

    pub fn categorical(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(name, FeatureType::Categorical, Value::Categorical(category.into()))
    }

    pub fn date(name: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(name, FeatureType::Date, Value::Date(date))
    }

    pub fn time(name: impl Into<String>, time: NaiveTime) -> Self {
        Self::new(name, FeatureType::Time, Value::Time(time))
    }

    pub fn duration(name: impl Into<String>, duration: Duration) -> Self {
        Self::new(name, FeatureType::Duration, Value::Duration(duration))
    }

    /// `code` is an ISO 4217 currency code such as "EUR".
    pub fn currency(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(name, FeatureType::Currency, Value::Currency(code.into()))
    }

    pub fn uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::new(name, FeatureType::Uri, Value::Uri(uri.into()))
    }

    pub fn binary(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, FeatureType::Binary, Value::Binary(bytes))
    }

    pub fn vector(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, FeatureType::Vector, Value::Vector(values))
    }

    pub fn composite(name: impl Into<String>, features: Vec<Feature>) -> Self {
        Self::new(name, FeatureType::Composite, Value::Composite(features))
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        Self::new(name, FeatureType::Undefined, Value::Null)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Depth-first leaves of this feature, each named by its dotted path
    /// from here (`address.geo.lat`). Non-composite features yield a copy of
    /// themselves.
    pub fn flattened(&self) -> Vec<Feature> {
        match (&self.feature_type, &self.value) {
            (FeatureType::Composite, Value::Composite(children)) => children
                .iter()
                .flat_map(Feature::flattened)
                .map(|leaf| Feature {
                    name: format!("{}.{}", self.name, leaf.name),
                    ..leaf
                })
                .collect(),
            _ => vec![self.clone()],
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) = {}", self.name, self.feature_type, self.value)
    }
}
