//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;

pub use app::MultiplotApp;
pub use chart_viewer::{ChartViewer, ChartViewerAction};
pub use control_panel::{ControlPanel, ControlPanelAction};
