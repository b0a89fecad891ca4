use std::fmt;
use std::rc::Rc;

use crate::error::{ChartError, ChartResult};
use crate::render::Element;

use super::Chart;
use super::chart::AnchorState;

/// Computes one dimension from the chart's root element.
pub type SizeFn = Rc<dyn Fn(&Element) -> f64>;

/// How a chart dimension is obtained.
#[derive(Clone, Default)]
pub enum SizeSpec {
    /// Measured box of the root element, clamped to the configured minimum.
    #[default]
    Measured,
    Fixed(f64),
    Computed(SizeFn),
}

impl SizeSpec {
    #[must_use]
    pub fn computed(calc: impl Fn(&Element) -> f64 + 'static) -> Self {
        Self::Computed(Rc::new(calc))
    }
}

impl fmt::Debug for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measured => f.write_str("Measured"),
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<f64> for SizeSpec {
    fn from(value: f64) -> Self {
        Self::Fixed(value)
    }
}

impl From<Option<f64>> for SizeSpec {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Measured, Self::Fixed)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SizeSlot {
    spec: SizeSpec,
    cached: Option<f64>,
}

impl SizeSlot {
    pub(crate) fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Width,
    Height,
}

/// Default calculation: the measured extent when it exceeds `min`, else `min`.
#[must_use]
pub fn clamp_to_minimum(measured: f64, min: f64) -> f64 {
    if measured > min { measured } else { min }
}

impl Chart {
    /// Width in pixels, computed and cached on first access after an
    /// invalidation.
    pub fn width(&self) -> ChartResult<f64> {
        self.dimension(Axis::Width)
    }

    pub fn height(&self) -> ChartResult<f64> {
        self.dimension(Axis::Height)
    }

    /// Sets how the width is obtained; always forces recomputation.
    pub fn set_width(&self, spec: impl Into<SizeSpec>) -> ChartResult<&Self> {
        self.set_dimension(Axis::Width, spec.into())
    }

    pub fn set_height(&self, spec: impl Into<SizeSpec>) -> ChartResult<&Self> {
        self.set_dimension(Axis::Height, spec.into())
    }

    #[must_use]
    pub fn width_spec(&self) -> SizeSpec {
        self.inner.state.borrow().width.spec.clone()
    }

    #[must_use]
    pub fn height_spec(&self) -> SizeSpec {
        self.inner.state.borrow().height.spec.clone()
    }

    pub(crate) fn invalidate_size_cache(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.width.invalidate();
        state.height.invalidate();
    }

    fn set_dimension(&self, axis: Axis, spec: SizeSpec) -> ChartResult<&Self> {
        self.ensure_live()?;
        if let SizeSpec::Fixed(value) = &spec {
            let value = *value;
            if !value.is_finite() || value < 0.0 {
                return Err(ChartError::InvalidArgument(format!(
                    "{axis:?} must be a finite, non-negative number, got {value}"
                )));
            }
        }
        let spec = match spec {
            SizeSpec::Fixed(value) if value == 0.0 => SizeSpec::Measured,
            other => other,
        };
        let mut state = self.inner.state.borrow_mut();
        let slot = match axis {
            Axis::Width => &mut state.width,
            Axis::Height => &mut state.height,
        };
        slot.spec = spec;
        slot.cached = None;
        Ok(self)
    }

    fn dimension(&self, axis: Axis) -> ChartResult<f64> {
        self.ensure_live()?;
        let spec = {
            let state = self.inner.state.borrow();
            let slot = match axis {
                Axis::Width => &state.width,
                Axis::Height => &state.height,
            };
            if let Some(cached) = slot.cached {
                return Ok(cached);
            }
            if matches!(state.anchor, AnchorState::Unanchored) {
                return Err(ChartError::InvalidState(format!(
                    "chart {} is not anchored; nothing to measure",
                    self.id()
                )));
            }
            slot.spec.clone()
        };

        let root = self.root_element().ok_or_else(|| {
            ChartError::InvalidState(format!("chart {} has no root element", self.id()))
        })?;
        let value = match spec {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Computed(calc) => calc(&root),
            SizeSpec::Measured => {
                let config = self.inner.config.borrow();
                let bounds = root.bounds();
                match axis {
                    Axis::Width => clamp_to_minimum(bounds.width, config.min_width()),
                    Axis::Height => clamp_to_minimum(bounds.height, config.min_height()),
                }
            }
        };

        let mut state = self.inner.state.borrow_mut();
        match axis {
            Axis::Width => state.width.cached = Some(value),
            Axis::Height => state.height.cached = Some(value),
        }
        Ok(value)
    }
}
