//! Control Panel Widget
//! Left side panel: uploaded files, per-file parsing configuration,
//! column operations and axis selection.

use egui::{Color32, ComboBox, RichText, ScrollArea};
use multiplot::data::{ColumnRef, DecimalSeparator, Delimiter, FileConfig, Operation};
use multiplot::session::{AppState, Phase};
use std::collections::BTreeSet;

const PREVIEW_ROWS: usize = 3;
const MAX_ROW: usize = 1_000_000;

/// Cached configuration preview of one file.
struct Preview {
    file: String,
    version: u64,
    content: Result<PreviewData, String>,
}

struct PreviewData {
    rows: usize,
    columns: Vec<String>,
    cells: Vec<Vec<String>>,
    skipped: usize,
}

/// Left side control panel.
pub struct ControlPanel {
    pub selected_file: Option<String>,
    pub operation: Operation,
    pub param: String,
    /// Selections hold column keys (`source||column`).
    pub operation_columns: BTreeSet<String>,
    pub x_columns: BTreeSet<String>,
    pub y_columns: BTreeSet<String>,
    pub x_label: String,
    pub y_label: String,
    preview: Option<Preview>,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            selected_file: None,
            operation: Operation::default(),
            param: "1".to_string(),
            operation_columns: BTreeSet::new(),
            x_columns: BTreeSet::new(),
            y_columns: BTreeSet::new(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
            preview: None,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected references in table order.
    fn ordered(options: &[ColumnRef], selected: &BTreeSet<String>) -> Vec<ColumnRef> {
        let chosen: BTreeSet<ColumnRef> = selected
            .iter()
            .filter_map(|key| ColumnRef::parse_key(key))
            .collect();
        options
            .iter()
            .filter(|r| chosen.contains(*r))
            .cloned()
            .collect()
    }

    pub fn selected_operation_refs(&self, state: &AppState) -> Vec<ColumnRef> {
        Self::ordered(&state.column_references(), &self.operation_columns)
    }

    pub fn selected_x_refs(&self, state: &AppState) -> Vec<ColumnRef> {
        Self::ordered(&state.column_references(), &self.x_columns)
    }

    pub fn selected_y_refs(&self, state: &AppState) -> Vec<ColumnRef> {
        Self::ordered(&state.column_references(), &self.y_columns)
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui, state: &AppState) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title and reset
        ui.horizontal(|ui| {
            ui.label(
                RichText::new("📊 Multi-File Analysis")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🔄 Reset All").clicked() {
                    action = ControlPanelAction::ResetAll;
                }
            });
        });
        ui.add_space(8.0);
        ui.separator();

        // ===== Files Section =====
        ui.label(RichText::new("📁 Files").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                if state.files().is_empty() {
                    ui.label(RichText::new("No file imported").color(Color32::GRAY));
                }
                for entry in state.files() {
                    ui.horizontal(|ui| {
                        let selected = self.selected_file.as_deref() == Some(entry.name.as_str());
                        if ui.selectable_label(selected, &entry.name).clicked() {
                            self.selected_file = Some(entry.name.clone());
                        }
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✖").on_hover_text("Remove file").clicked() {
                                action = ControlPanelAction::RemoveFile(entry.name.clone());
                            }
                        });
                    });
                }
                ui.add_space(4.0);
                if ui.button("📂 Import Files").clicked() {
                    action = ControlPanelAction::AddFiles;
                }
            });

        // Keep selection pointing at a registered file
        if self
            .selected_file
            .as_ref()
            .map_or(true, |name| state.file(name).is_none())
        {
            self.selected_file = state.files().first().map(|f| f.name.clone());
        }

        if let Some(name) = self.selected_file.clone() {
            ui.add_space(10.0);
            if let Some(file_action) = self.show_file_config(ui, state, &name) {
                action = file_action;
            }
        }

        let options = state.column_references();
        let keys: BTreeSet<String> = options.iter().map(ColumnRef::to_key).collect();
        self.operation_columns.retain(|k| keys.contains(k));
        self.x_columns.retain(|k| keys.contains(k));
        self.y_columns.retain(|k| keys.contains(k));

        if !state.files().is_empty() {
            ui.add_space(10.0);
            ui.separator();
            if let Some(op_action) = self.show_operations(ui, state, &options) {
                action = op_action;
            }
        }

        if !state.tables().is_empty() {
            ui.add_space(10.0);
            ui.separator();
            if self.show_axes(ui, &options) {
                action = ControlPanelAction::GenerateGraph;
            }
        }

        action
    }

    fn show_file_config(
        &mut self,
        ui: &mut egui::Ui,
        state: &AppState,
        name: &str,
    ) -> Option<ControlPanelAction> {
        let entry = state.file(name)?;
        let mut action = None;
        let mut config = entry.config.clone();
        let mut color = entry.color;

        egui::CollapsingHeader::new(RichText::new(format!("⚙️ Configuration: {}", name)).strong())
            .default_open(true)
            .show(ui, |ui| {
                let label_width = 120.0;

                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Column Separator:"));
                    ComboBox::from_id_salt(("delimiter", name))
                        .selected_text(config.delimiter.to_string())
                        .show_ui(ui, |ui| {
                            for delimiter in Delimiter::ALL {
                                ui.selectable_value(
                                    &mut config.delimiter,
                                    delimiter,
                                    delimiter.to_string(),
                                );
                            }
                        });
                });

                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Decimal Separator:"));
                    ComboBox::from_id_salt(("decimal", name))
                        .selected_text(config.decimal_separator.to_string())
                        .show_ui(ui, |ui| {
                            for decimal in DecimalSeparator::ALL {
                                ui.selectable_value(
                                    &mut config.decimal_separator,
                                    decimal,
                                    decimal.to_string(),
                                );
                            }
                        });
                });

                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Plot Color:"));
                    ui.color_edit_button_srgba(&mut color);
                });

                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Header Row:"));
                    ui.add(egui::DragValue::new(&mut config.header_row).range(0..=MAX_ROW))
                        .on_hover_text("Row containing column titles");
                });

                ui.add_space(4.0);
                ui.label(RichText::new("Row Selection").strong());

                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("First Data Row:"));
                    ui.add(egui::DragValue::new(&mut config.start_row).range(0..=MAX_ROW))
                        .on_hover_text("Rows skipped = first data row + header row");
                });

                ui.horizontal(|ui| {
                    let mut limited = config.end_row.is_some();
                    ui.add_sized([label_width, 20.0], egui::Checkbox::new(&mut limited, "Last Data Row:"));
                    if limited {
                        let mut end_row = config.end_row.unwrap_or(config.start_row + 100);
                        ui.add(
                            egui::DragValue::new(&mut end_row).range(config.start_row..=MAX_ROW),
                        );
                        config.end_row = Some(end_row.max(config.start_row));
                    } else {
                        config.end_row = None;
                    }
                });

                if state.phase() == Phase::Transformed && state.pending_reparse() {
                    ui.label(
                        RichText::new("Changes apply after discarding operations")
                            .size(11.0)
                            .color(Color32::from_rgb(243, 156, 18)),
                    );
                }

                ui.add_space(6.0);
                self.show_preview(ui, state, name);
            });

        if color != entry.color {
            action = Some(ControlPanelAction::SetColor(name.to_string(), color));
        }
        if config != entry.config {
            action = Some(ControlPanelAction::UpdateConfig(name.to_string(), config));
        }
        action
    }

    fn show_preview(&mut self, ui: &mut egui::Ui, state: &AppState, name: &str) {
        let stale = self
            .preview
            .as_ref()
            .map_or(true, |p| p.file != name || p.version != state.version());
        if stale {
            let content = match state.preview(name) {
                Some(Ok(parsed)) => {
                    let table = parsed.table;
                    let columns = table.column_names();
                    let shown = table.height().min(PREVIEW_ROWS);
                    let cells = (0..shown)
                        .map(|row| columns.iter().map(|c| table.cell_text(row, c)).collect())
                        .collect();
                    Ok(PreviewData {
                        rows: table.height(),
                        columns,
                        cells,
                        skipped: parsed.skipped.len(),
                    })
                }
                Some(Err(e)) => Err(e.to_string()),
                None => Err(format!("Unknown file: {}", name)),
            };
            self.preview = Some(Preview {
                file: name.to_string(),
                version: state.version(),
                content,
            });
        }

        let Some(preview) = &self.preview else {
            return;
        };
        match &preview.content {
            Ok(data) => {
                ui.label(
                    RichText::new(format!(
                        "Data Preview ({} rows, {} columns)",
                        data.rows,
                        data.columns.len()
                    ))
                    .strong(),
                );
                if data.skipped > 0 {
                    ui.label(
                        RichText::new(format!("{} malformed rows skipped", data.skipped))
                            .size(11.0)
                            .color(Color32::from_rgb(243, 156, 18)),
                    );
                }
                ScrollArea::horizontal().id_salt("preview_scroll").show(ui, |ui| {
                    egui::Grid::new("preview_grid").striped(true).show(ui, |ui| {
                        for column in &data.columns {
                            ui.label(RichText::new(column).strong());
                        }
                        ui.end_row();
                        for row in &data.cells {
                            for cell in row {
                                ui.label(cell);
                            }
                            ui.end_row();
                        }
                    });
                });
            }
            Err(message) => {
                ui.label(
                    RichText::new(format!("Error: {}", message))
                        .size(11.0)
                        .color(Color32::from_rgb(220, 53, 69)),
                );
            }
        }
    }

    fn show_operations(
        &mut self,
        ui: &mut egui::Ui,
        state: &AppState,
        options: &[ColumnRef],
    ) -> Option<ControlPanelAction> {
        let mut action = None;

        ui.label(RichText::new("🔧 Column Operations").size(14.0).strong());
        ui.add_space(5.0);

        Self::column_checklist(ui, "operation_columns", options, &mut self.operation_columns);

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            ComboBox::from_id_salt("operation")
                .selected_text(self.operation.label())
                .show_ui(ui, |ui| {
                    for operation in Operation::ALL {
                        ui.selectable_value(&mut self.operation, operation, operation.label());
                    }
                });
            ui.label(format!("{}:", self.operation.parameter_label()));
            ui.add(egui::TextEdit::singleline(&mut self.param).desired_width(70.0));
        });

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.button("Apply Operation").clicked() {
                action = Some(ControlPanelAction::ApplyOperation);
            }
            ui.add_enabled_ui(state.phase() == Phase::Transformed, |ui| {
                if ui.button("Discard Operations").clicked() {
                    action = Some(ControlPanelAction::DiscardOperations);
                }
            });
        });

        action
    }

    /// Returns true when "Generate Graph" was clicked.
    fn show_axes(&mut self, ui: &mut egui::Ui, options: &[ColumnRef]) -> bool {
        ui.label(RichText::new("📈 Axis Configuration").size(14.0).strong());
        ui.add_space(5.0);

        ui.label("X Axis Selection");
        Self::column_checklist(ui, "x_columns", options, &mut self.x_columns);
        ui.add_space(5.0);
        ui.label("Y Axis Selection");
        Self::column_checklist(ui, "y_columns", options, &mut self.y_columns);

        ui.add_space(5.0);
        ui.horizontal(|ui| {
            ui.label("X Label:");
            ui.add(egui::TextEdit::singleline(&mut self.x_label).desired_width(100.0));
            ui.label("Y Label:");
            ui.add(egui::TextEdit::singleline(&mut self.y_label).desired_width(100.0));
        });

        ui.add_space(8.0);
        let mut clicked = false;
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("▶ Generate Graph").size(15.0))
                .min_size(egui::vec2(180.0, 32.0));
            clicked = ui.add(button).clicked();
        });
        clicked
    }

    fn column_checklist(
        ui: &mut egui::Ui,
        id: &str,
        options: &[ColumnRef],
        selected: &mut BTreeSet<String>,
    ) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt(id)
                    .max_height(120.0)
                    .show(ui, |ui| {
                        for reference in options {
                            let key = reference.to_key();
                            let mut checked = selected.contains(&key);
                            let changed = ui
                                .push_id(&key, |ui| ui.checkbox(&mut checked, reference.to_string()))
                                .inner
                                .changed();
                            if changed {
                                if checked {
                                    selected.insert(key);
                                } else {
                                    selected.remove(&key);
                                }
                            }
                        }
                    });
            });
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    AddFiles,
    RemoveFile(String),
    ResetAll,
    UpdateConfig(String, FileConfig),
    SetColor(String, Color32),
    ApplyOperation,
    DiscardOperations,
    GenerateGraph,
}
