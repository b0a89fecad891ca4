use crate::error::ChartResult;

use super::Chart;

/// Concrete drawing hooks a chart kind plugs into the lifecycle.
///
/// The drawer is moved out of the chart while a hook runs, so hooks may call
/// back into the chart freely. A nested `render`/`redraw` of the same chart
/// fails with `InvalidState`. Drawers that need the chart later should hold a
/// [`WeakChart`](super::WeakChart).
pub trait ChartDrawer {
    /// Full draw into a freshly sized surface.
    fn draw(&mut self, chart: &Chart) -> ChartResult<()> {
        let _ = chart;
        Ok(())
    }

    /// Incremental update after shared filter state changed.
    fn update(&mut self, chart: &Chart) -> ChartResult<()> {
        let _ = chart;
        Ok(())
    }
}

/// Drawer used until a chart kind installs its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDrawer;

impl ChartDrawer for NullDrawer {}
