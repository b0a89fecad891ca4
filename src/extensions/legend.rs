use crate::api::Chart;
use crate::error::ChartResult;

/// Optional legend widget rendered after each chart draw pass.
pub trait Legend {
    /// Called once when the legend is attached to `chart`. Keep
    /// [`Chart::weak`] rather than a clone: the chart owns its legend.
    fn set_parent(&mut self, chart: &Chart);

    fn render(&mut self) -> ChartResult<()>;
}
