//! Multiplot Main Application
//! Main window wiring the control panel and chart viewer to the session state.

use crate::gui::{ChartViewer, ChartViewerAction, ControlPanel, ControlPanelAction};
use anyhow::{Context, Result};
use egui::{Color32, RichText, SidePanel, TopBottomPanel};
use multiplot::charts::{ChartExporter, PNG_SIZE};
use multiplot::session::{AppState, Notice, NoticeLevel, UploadedFile};
use std::fs;
use std::path::PathBuf;
use tracing::{error, warn};

/// Number of notices kept for the status area
const MAX_NOTICES: usize = 6;

/// Main application window.
pub struct MultiplotApp {
    state: AppState,
    /// Current upload set, in the order files were added.
    uploads: Vec<UploadedFile>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    notices: Vec<Notice>,
}

impl MultiplotApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: AppState::new(),
            uploads: Vec::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            notices: Vec::new(),
        }
    }

    fn push_notices(&mut self, notices: Vec<Notice>) {
        self.notices.extend(notices);
        let excess = self.notices.len().saturating_sub(MAX_NOTICES);
        self.notices.drain(..excess);
    }

    fn read_upload(path: PathBuf) -> Result<UploadedFile> {
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(UploadedFile::new(name, bytes))
    }

    /// Add files to the upload set; a file with an existing name replaces it.
    fn handle_add_files(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Data Files", &["csv", "txt", "dat"])
            .pick_files()
        else {
            return;
        };

        let mut notices = Vec::new();
        for path in paths {
            match Self::read_upload(path) {
                Ok(upload) => {
                    match self.uploads.iter_mut().find(|u| u.name == upload.name) {
                        Some(existing) => *existing = upload,
                        None => self.uploads.push(upload),
                    }
                }
                Err(e) => {
                    error!("{:#}", e);
                    notices.push(Notice::error(format!("{:#}", e)));
                }
            }
        }

        notices.extend(self.state.sync_uploads(self.uploads.clone()));
        self.push_notices(notices);
    }

    fn handle_remove_file(&mut self, name: &str) {
        self.uploads.retain(|u| u.name != name);
        let notices = self.state.sync_uploads(self.uploads.clone());
        self.push_notices(notices);
    }

    fn handle_reset(&mut self) {
        self.state.reset();
        self.uploads.clear();
        self.chart_viewer.clear();
        self.control_panel = ControlPanel::new();
        self.notices.clear();
    }

    fn handle_apply_operation(&mut self) {
        let references = self.control_panel.selected_operation_refs(&self.state);
        let operation = self.control_panel.operation;
        let notices = self
            .state
            .apply_operation(operation, &references, &self.control_panel.param);
        self.push_notices(notices);
    }

    fn handle_generate_graph(&mut self) {
        let x_refs = self.control_panel.selected_x_refs(&self.state);
        let y_refs = self.control_panel.selected_y_refs(&self.state);
        if x_refs.is_empty() || y_refs.is_empty() {
            self.push_notices(vec![Notice::warning(
                "Please select X and Y axes before generating the graph",
            )]);
            return;
        }

        let outcome = self.state.build_chart(
            &x_refs,
            &y_refs,
            &self.control_panel.x_label,
            &self.control_panel.y_label,
        );
        let mut notices: Vec<Notice> = outcome
            .warnings
            .iter()
            .map(|w| Notice::warning(w.to_string()))
            .collect();

        match outcome.chart {
            Some(chart) => self.chart_viewer.set_chart(chart),
            None => {
                self.chart_viewer.clear();
                notices.push(Notice::warning(
                    "No valid graph could be generated. Check your axis selections.",
                ));
            }
        }
        self.push_notices(notices);
    }

    fn handle_export(&mut self, action: ChartViewerAction) {
        let Some(chart) = &self.chart_viewer.chart else {
            return;
        };

        let (filter, extension) = match action {
            ChartViewerAction::ExportPng => ("PNG Image", "png"),
            ChartViewerAction::ExportJson => ("Plotly JSON", "json"),
            ChartViewerAction::None => return,
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter(filter, &[extension])
            .set_file_name(format!("multiplot_chart.{}", extension))
            .save_file()
        else {
            return;
        };

        let result = match action {
            ChartViewerAction::ExportPng => ChartExporter::write_png(chart, &path, PNG_SIZE),
            _ => ChartExporter::write_json(chart, &path),
        };

        let notice = match result {
            Ok(()) => Notice::info(format!("Chart exported to {}", path.display())),
            Err(e) => {
                warn!("{}", e);
                Notice::error(e.to_string())
            }
        };
        self.push_notices(vec![notice]);
    }

    fn show_notices(&self, ui: &mut egui::Ui) {
        if self.notices.is_empty() {
            ui.label(RichText::new("Ready").size(11.0).color(Color32::GRAY));
            return;
        }
        for notice in &self.notices {
            let color = match notice.level {
                NoticeLevel::Info => Color32::from_rgb(40, 167, 69),
                NoticeLevel::Warning => Color32::from_rgb(243, 156, 18),
                NoticeLevel::Error => Color32::from_rgb(220, 53, 69),
            };
            ui.label(RichText::new(&notice.message).size(11.0).color(color));
        }
    }
}

impl eframe::App for MultiplotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Bottom panel - latest messages
        TopBottomPanel::bottom("status_panel")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                self.show_notices(ui);
                ui.add_space(4.0);
            });

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(340.0)
            .max_width(420.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui, &self.state);

                    match action {
                        ControlPanelAction::AddFiles => self.handle_add_files(),
                        ControlPanelAction::RemoveFile(name) => self.handle_remove_file(&name),
                        ControlPanelAction::ResetAll => self.handle_reset(),
                        ControlPanelAction::UpdateConfig(name, config) => {
                            let notices = self.state.update_config(&name, config);
                            self.push_notices(notices);
                        }
                        ControlPanelAction::SetColor(name, color) => {
                            self.state.set_color(&name, color);
                        }
                        ControlPanelAction::ApplyOperation => self.handle_apply_operation(),
                        ControlPanelAction::DiscardOperations => {
                            let notices = self.state.discard_operations();
                            self.push_notices(notices);
                        }
                        ControlPanelAction::GenerateGraph => self.handle_generate_graph(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            let action = self.chart_viewer.show(ui);
            if action != ChartViewerAction::None {
                self.handle_export(action);
            }
        });
    }
}
