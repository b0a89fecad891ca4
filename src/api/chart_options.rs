use serde_json::Value;

use crate::error::{ChartError, ChartResult};

use super::chart_config::{
    CONTROLS_USE_VISIBILITY, EVENT_DELAY, MIN_HEIGHT, MIN_WIDTH, TRANSITION_DELAY,
    TRANSITION_DURATION, USE_VIEW_BOX_RESIZING,
};
use super::{Chart, SizeSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionTarget {
    Width,
    Height,
    Config,
}

/// Option keys accepted by [`Chart::options`] and where each one lands.
static OPTION_TABLE: [(&str, OptionTarget); 9] = [
    ("width", OptionTarget::Width),
    ("height", OptionTarget::Height),
    (MIN_WIDTH, OptionTarget::Config),
    (MIN_HEIGHT, OptionTarget::Config),
    (TRANSITION_DURATION, OptionTarget::Config),
    (TRANSITION_DELAY, OptionTarget::Config),
    (CONTROLS_USE_VISIBILITY, OptionTarget::Config),
    (USE_VIEW_BOX_RESIZING, OptionTarget::Config),
    (EVENT_DELAY, OptionTarget::Config),
];

fn size_spec(key: &str, value: &Value) -> ChartResult<SizeSpec> {
    match value {
        Value::Null => Ok(SizeSpec::Measured),
        Value::Number(number) => number.as_f64().map(SizeSpec::Fixed).ok_or_else(|| {
            ChartError::InvalidArgument(format!("option `{key}` is not a finite number"))
        }),
        other => Err(ChartError::InvalidArgument(format!(
            "option `{key}` expects a number or null, got {other}"
        ))),
    }
}

impl OptionTarget {
    fn apply(self, chart: &Chart, key: &str, value: &Value) -> ChartResult<()> {
        match self {
            Self::Width => chart.set_width(size_spec(key, value)?).map(|_| ()),
            Self::Height => chart.set_height(size_spec(key, value)?).map(|_| ()),
            Self::Config => chart.inner.config.borrow_mut().set(key, value.clone()),
        }
    }
}

/// Keys [`Chart::options`] recognizes.
#[must_use]
pub fn option_keys() -> impl Iterator<Item = &'static str> {
    OPTION_TABLE.iter().map(|(key, _)| *key)
}

impl Chart {
    /// Applies several options at once from a JSON object.
    ///
    /// The whole call is rejected before anything is applied when any key
    /// is not a recognized option. Values are then applied in object order;
    /// a badly typed value stops at that key.
    pub fn options(&self, options: Value) -> ChartResult<&Self> {
        self.ensure_live()?;
        let Value::Object(options) = options else {
            return Err(ChartError::InvalidArgument(
                "options must be a JSON object".to_owned(),
            ));
        };
        let mut resolved = Vec::with_capacity(options.len());
        for (key, value) in &options {
            let target = OPTION_TABLE
                .iter()
                .find(|(known, _)| *known == key.as_str())
                .map(|(_, target)| *target)
                .ok_or_else(|| {
                    ChartError::InvalidArgument(format!("unknown chart option `{key}`"))
                })?;
            resolved.push((target, key, value));
        }
        for (target, key, value) in resolved {
            target.apply(self, key, value)?;
        }
        Ok(self)
    }
}
