use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ChartError, ChartResult};
use crate::interaction::DEFAULT_EVENT_DELAY_MS;

pub const MIN_WIDTH: &str = "minWidth";
pub const MIN_HEIGHT: &str = "minHeight";
pub const TRANSITION_DURATION: &str = "transitionDuration";
pub const TRANSITION_DELAY: &str = "transitionDelay";
pub const CONTROLS_USE_VISIBILITY: &str = "controlsUseVisibility";
pub const USE_VIEW_BOX_RESIZING: &str = "useViewBoxResizing";
pub const EVENT_DELAY: &str = "eventDelay";

pub const DEFAULT_MIN_SIZE: f64 = 200.0;
pub const DEFAULT_TRANSITION_DURATION_MS: u64 = 750;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownKind {
    NonNegativeNumber,
    Flag,
}

const KNOWN_KEYS: [(&str, KnownKind); 7] = [
    (MIN_WIDTH, KnownKind::NonNegativeNumber),
    (MIN_HEIGHT, KnownKind::NonNegativeNumber),
    (TRANSITION_DURATION, KnownKind::NonNegativeNumber),
    (TRANSITION_DELAY, KnownKind::NonNegativeNumber),
    (EVENT_DELAY, KnownKind::NonNegativeNumber),
    (CONTROLS_USE_VISIBILITY, KnownKind::Flag),
    (USE_VIEW_BOX_RESIZING, KnownKind::Flag),
];

/// Open-ended chart configuration record.
///
/// Later `merge` calls overwrite matching keys only. Keys the lifecycle
/// understands are type-checked; anything else is kept verbatim for
/// concrete chart kinds to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartConfig {
    values: IndexMap<String, Value>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        let mut values = IndexMap::new();
        values.insert(MIN_WIDTH.to_owned(), json!(DEFAULT_MIN_SIZE));
        values.insert(MIN_HEIGHT.to_owned(), json!(DEFAULT_MIN_SIZE));
        values.insert(
            TRANSITION_DURATION.to_owned(),
            json!(DEFAULT_TRANSITION_DURATION_MS),
        );
        values.insert(TRANSITION_DELAY.to_owned(), json!(0));
        values.insert(EVENT_DELAY.to_owned(), json!(DEFAULT_EVENT_DELAY_MS));
        values.insert(CONTROLS_USE_VISIBILITY.to_owned(), json!(false));
        values.insert(USE_VIEW_BOX_RESIZING.to_owned(), json!(false));
        Self { values }
    }
}

impl ChartConfig {
    /// Shallow-merges a JSON object patch. Nothing is applied when any known
    /// key carries a value of the wrong type.
    pub fn merge(&mut self, patch: Value) -> ChartResult<()> {
        let Value::Object(patch) = patch else {
            return Err(ChartError::InvalidArgument(
                "configuration patch must be a JSON object".to_owned(),
            ));
        };
        for (key, value) in &patch {
            validate_entry(key, value)?;
        }
        for (key, value) in patch {
            self.values.insert(key, value);
        }
        Ok(())
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) -> ChartResult<()> {
        validate_entry(key, &value)?;
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    #[must_use]
    pub fn min_width(&self) -> f64 {
        self.number(MIN_WIDTH).unwrap_or(DEFAULT_MIN_SIZE)
    }

    #[must_use]
    pub fn min_height(&self) -> f64 {
        self.number(MIN_HEIGHT).unwrap_or(DEFAULT_MIN_SIZE)
    }

    #[must_use]
    pub fn transition_duration(&self) -> Duration {
        self.millis(TRANSITION_DURATION)
    }

    #[must_use]
    pub fn transition_delay(&self) -> Duration {
        self.millis(TRANSITION_DELAY)
    }

    #[must_use]
    pub fn event_delay(&self) -> Duration {
        self.millis(EVENT_DELAY)
    }

    #[must_use]
    pub fn controls_use_visibility(&self) -> bool {
        self.flag(CONTROLS_USE_VISIBILITY)
    }

    #[must_use]
    pub fn use_view_box_resizing(&self) -> bool {
        self.flag(USE_VIEW_BOX_RESIZING)
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    fn flag(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn millis(&self, key: &str) -> Duration {
        self.number(key)
            .map(|ms| Duration::from_micros((ms * 1000.0).round() as u64))
            .unwrap_or(Duration::ZERO)
    }
}

fn validate_entry(key: &str, value: &Value) -> ChartResult<()> {
    let Some((_, kind)) = KNOWN_KEYS.iter().find(|(known, _)| *known == key) else {
        return Ok(());
    };
    let valid = match kind {
        KnownKind::NonNegativeNumber => value
            .as_f64()
            .is_some_and(|number| number.is_finite() && number >= 0.0),
        KnownKind::Flag => value.is_boolean(),
    };
    if valid {
        Ok(())
    } else {
        Err(ChartError::InvalidArgument(format!(
            "configuration key `{key}` has an invalid value: {value}"
        )))
    }
}
