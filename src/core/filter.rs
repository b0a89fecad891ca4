use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record delivered by a data binding. Shape is owned by the data engine.
pub type Record = Value;

/// Scalar filter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterKey {
    Bool(bool),
    Number(OrderedFloat<f64>),
    Text(String),
}

impl FilterKey {
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(OrderedFloat(value))
    }

    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => number.as_f64().map(Self::number),
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<f64> for FilterKey {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<i64> for FilterKey {
    fn from(value: i64) -> Self {
        Self::number(value as f64)
    }
}

impl From<bool> for FilterKey {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FilterKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FilterKey {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single restriction on the shared dataset.
///
/// "No restriction" is modeled as the absence of a filter (`Option::None`)
/// at every API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Key(FilterKey),
    /// Inclusive `[low, high]` range.
    Range(FilterKey, FilterKey),
}

impl Filter {
    #[must_use]
    pub fn key(key: impl Into<FilterKey>) -> Self {
        Self::Key(key.into())
    }

    #[must_use]
    pub fn range(low: impl Into<FilterKey>, high: impl Into<FilterKey>) -> Self {
        Self::Range(low.into(), high.into())
    }

    #[must_use]
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range(..))
    }

    /// Scalars become keys, two-element arrays become ranges, `null` is no filter.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() == 2 => Some(Self::Range(
                FilterKey::from_json(&items[0])?,
                FilterKey::from_json(&items[1])?,
            )),
            other => FilterKey::from_json(other).map(Self::Key),
        }
    }
}

macro_rules! filter_from_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Filter {
                fn from(value: $ty) -> Self {
                    Self::Key(value.into())
                }
            }
        )*
    };
}

filter_from_key!(FilterKey, f64, i64, bool, &str, String);
