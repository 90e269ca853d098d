//! Charts module - Chart building, drawing and export

mod export;
mod plotter;

pub use export::{ChartExporter, ExportError, PNG_SIZE};
pub use plotter::{
    Chart, ChartOutcome, ChartPlotter, HoverMode, PlotWarning, Series, CHART_TITLE,
    DEFAULT_X_LABEL, DEFAULT_Y_LABEL, FALLBACK_COLOR,
};
