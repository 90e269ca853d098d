//! Chart Viewer Widget
//! Central panel showing the generated chart with export controls.

use egui::{Color32, RichText};
use multiplot::charts::{Chart, ChartPlotter};

const CHART_MIN_HEIGHT: f32 = 300.0;

/// Displays the last generated chart.
#[derive(Default)]
pub struct ChartViewer {
    pub chart: Option<Chart>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.chart = None;
    }

    pub fn set_chart(&mut self, chart: Chart) {
        self.chart = Some(chart);
    }

    /// Draw the chart viewer
    pub fn show(&self, ui: &mut egui::Ui) -> ChartViewerAction {
        let mut action = ChartViewerAction::None;

        let Some(chart) = &self.chart else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Graph").size(20.0).color(Color32::GRAY));
            });
            return action;
        };

        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("{} series", chart.series.len()))
                    .size(12.0)
                    .color(Color32::GRAY),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("💾 Export JSON").clicked() {
                    action = ChartViewerAction::ExportJson;
                }
                if ui.button("🖼 Export PNG").clicked() {
                    action = ChartViewerAction::ExportPng;
                }
            });
        });
        ui.add_space(5.0);

        // Leave room for the unified hover readout under the plot
        let readout = 30.0 + 18.0 * chart.series.len() as f32;
        let height = (ui.available_height() - readout).max(CHART_MIN_HEIGHT);
        ChartPlotter::draw_chart(ui, chart, height);

        action
    }
}

/// Actions triggered by chart viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartViewerAction {
    None,
    ExportPng,
    ExportJson,
}
