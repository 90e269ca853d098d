//! Application state shared by every user action.
//!
//! `AppState` holds the uploaded files, their parsing configs and colors, and
//! the live table set. Each handler mutates it, bumps `version`, and returns
//! the messages to show the user. Nothing here panics or aborts: failures
//! become [`Notice`]s.

use egui::Color32;
use rand::Rng;
use tracing::{debug, info};

use crate::charts::{ChartOutcome, ChartPlotter};
use crate::data::{apply_operation, ColumnRef, FileConfig, Operation, ParseError, Parsed, Parser, Table};

/// Lifecycle of the live table set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No file uploaded.
    Unloaded,
    /// Tables mirror the files and their configs.
    Parsed,
    /// At least one operation has been applied. Config edits no longer
    /// re-parse until the operations are discarded.
    Transformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-facing message produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// A file as handed over by the upload widget.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// One registered file with its settings.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub bytes: Vec<u8>,
    pub config: FileConfig,
    pub color: Color32,
}

/// Random opaque color for a newly registered file.
pub fn random_color() -> Color32 {
    let mut rng = rand::thread_rng();
    Color32::from_rgb(rng.gen(), rng.gen(), rng.gen())
}

/// Versioned session state.
#[derive(Debug, Clone)]
pub struct AppState {
    version: u64,
    phase: Phase,
    files: Vec<FileEntry>,
    tables: Vec<Table>,
    pending_reparse: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            version: 0,
            phase: Phase::Unloaded,
            files: Vec::new(),
            tables: Vec::new(),
            pending_reparse: false,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// True when configs changed while transformed and were not applied yet.
    pub fn pending_reparse(&self) -> bool {
        self.pending_reparse
    }

    /// Colors aligned by position with [`AppState::tables`].
    pub fn colors(&self) -> Vec<Color32> {
        self.tables
            .iter()
            .map(|t| {
                self.file(t.source())
                    .map(|f| f.color)
                    .unwrap_or(crate::charts::FALLBACK_COLOR)
            })
            .collect()
    }

    /// Every column of the live table set, in table then column order.
    pub fn column_references(&self) -> Vec<ColumnRef> {
        self.tables
            .iter()
            .flat_map(|t| t.column_references())
            .collect()
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    /// Replace the upload set.
    ///
    /// New names get a default config and a random color; names no longer
    /// present are dropped. In the transformed phase only the added files are
    /// parsed, so derived columns of the others survive; replaced contents
    /// are held back behind `pending_reparse`.
    pub fn sync_uploads(&mut self, uploads: Vec<UploadedFile>) -> Vec<Notice> {
        let mut notices = Vec::new();

        let removed: Vec<String> = self
            .files
            .iter()
            .filter(|f| !uploads.iter().any(|u| u.name == f.name))
            .map(|f| f.name.clone())
            .collect();
        self.files.retain(|f| !removed.contains(&f.name));
        for name in &removed {
            info!(file = %name, "File removed");
        }

        let mut added = Vec::new();
        let mut changed = Vec::new();
        for upload in uploads {
            match self.files.iter_mut().find(|f| f.name == upload.name) {
                Some(entry) => {
                    if entry.bytes != upload.bytes {
                        info!(file = %upload.name, "File contents replaced");
                        changed.push(upload.name.clone());
                        entry.bytes = upload.bytes;
                    }
                }
                None => {
                    info!(file = %upload.name, "File registered");
                    added.push(upload.name.clone());
                    self.files.push(FileEntry {
                        name: upload.name,
                        bytes: upload.bytes,
                        config: FileConfig::default(),
                        color: random_color(),
                    });
                }
            }
        }

        self.bump();

        if self.files.is_empty() {
            self.phase = Phase::Unloaded;
            self.tables.clear();
            self.pending_reparse = false;
            return notices;
        }

        match self.phase {
            Phase::Unloaded | Phase::Parsed => notices.extend(self.reparse_all()),
            Phase::Transformed => {
                self.tables
                    .retain(|t| !removed.iter().any(|name| name == t.source()));
                for name in &added {
                    let result = match self.file(name) {
                        Some(entry) => Self::parse_entry(entry),
                        None => continue,
                    };
                    match result {
                        Ok(parsed) => {
                            notices.extend(Self::skipped_notices(&parsed));
                            self.tables.push(parsed.table);
                        }
                        Err(e) => notices.push(Self::parse_failure(name, &e)),
                    }
                }
                if !changed.is_empty() {
                    self.pending_reparse = true;
                    notices.extend(changed.iter().map(|name| Self::stale_notice(name, "Contents")));
                }
            }
        }

        notices
    }

    fn stale_notice(name: &str, what: &str) -> Notice {
        Notice::warning(format!(
            "{} of {} saved; discard applied operations to re-read the file",
            what, name
        ))
    }

    /// Store a new config for `name`.
    pub fn update_config(&mut self, name: &str, config: FileConfig) -> Vec<Notice> {
        if let Err(e) = config.validate() {
            return vec![Notice::error(format!("{}: {}", name, e))];
        }
        let Some(entry) = self.files.iter_mut().find(|f| f.name == name) else {
            return vec![Notice::error(format!("Unknown file: {}", name))];
        };
        if entry.config == config {
            return Vec::new();
        }
        entry.config = config;
        self.bump();

        match self.phase {
            Phase::Transformed => {
                self.pending_reparse = true;
                vec![Self::stale_notice(name, "Configuration")]
            }
            Phase::Unloaded | Phase::Parsed => self.reparse_all(),
        }
    }

    /// Override the plot color of `name`. Never re-parses.
    pub fn set_color(&mut self, name: &str, color: Color32) -> bool {
        match self.files.iter_mut().find(|f| f.name == name) {
            Some(entry) if entry.color != color => {
                entry.color = color;
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Run an operation over the live table set.
    pub fn apply_operation(
        &mut self,
        operation: Operation,
        references: &[ColumnRef],
        param: &str,
    ) -> Vec<Notice> {
        if references.is_empty() {
            return vec![Notice::warning("Please select at least one column.")];
        }

        let report = apply_operation(&self.tables, operation, references, param);
        let mut notices: Vec<Notice> = report
            .applied
            .iter()
            .map(|a| Notice::info(format!("{} applied on {}: created {}", operation, a.reference, a.new_column)))
            .collect();
        notices.extend(report.errors.iter().map(|e| Notice::error(e.to_string())));

        if !report.applied.is_empty() {
            self.tables = report.tables;
            self.phase = Phase::Transformed;
            self.bump();
        }
        notices
    }

    /// Drop every applied operation and re-read all files from their configs.
    pub fn discard_operations(&mut self) -> Vec<Notice> {
        if self.phase != Phase::Transformed {
            return Vec::new();
        }
        self.bump();
        let mut notices = self.reparse_all();
        notices.push(Notice::info("Applied operations discarded"));
        notices
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        let version = self.version + 1;
        *self = Self::new();
        self.version = version;
        info!("Session reset");
    }

    /// Parse `name` with its current config without touching the live set.
    pub fn preview(&self, name: &str) -> Option<Result<Parsed, ParseError>> {
        self.file(name).map(Self::parse_entry)
    }

    /// Chart the cartesian product of `x_refs` and `y_refs`.
    pub fn build_chart(
        &self,
        x_refs: &[ColumnRef],
        y_refs: &[ColumnRef],
        x_label: &str,
        y_label: &str,
    ) -> ChartOutcome {
        ChartPlotter::build_chart(
            &self.tables,
            &self.colors(),
            x_refs,
            y_refs,
            x_label,
            y_label,
        )
    }

    fn reparse_all(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        let mut tables = Vec::with_capacity(self.files.len());

        for entry in &self.files {
            match Self::parse_entry(entry) {
                Ok(parsed) => {
                    notices.extend(Self::skipped_notices(&parsed));
                    tables.push(parsed.table);
                }
                Err(e) => notices.push(Self::parse_failure(&entry.name, &e)),
            }
        }

        debug!(tables = tables.len(), files = self.files.len(), "Re-parsed files");
        self.tables = tables;
        self.pending_reparse = false;
        self.phase = if self.files.is_empty() {
            Phase::Unloaded
        } else {
            Phase::Parsed
        };
        notices
    }

    fn parse_entry(entry: &FileEntry) -> Result<Parsed, ParseError> {
        Parser::parse(&entry.name, &entry.bytes, &entry.config)
    }

    fn parse_failure(name: &str, e: &ParseError) -> Notice {
        Notice::error(format!("Error reading file {}: {}", name, e))
    }

    fn skipped_notices(parsed: &Parsed) -> Vec<Notice> {
        parsed
            .skipped
            .iter()
            .map(|row| {
                Notice::warning(format!(
                    "{}: skipped line {} ({})",
                    parsed.table.source(),
                    row.line,
                    row.reason
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, body: &str) -> UploadedFile {
        UploadedFile::new(name, body.as_bytes().to_vec())
    }

    #[test]
    fn test_new_files_get_default_config_and_parse() {
        let mut state = AppState::new();
        let notices = state.sync_uploads(vec![upload("a.csv", "t;v\n1;2,5\n2;3,5\n")]);

        assert!(notices.is_empty());
        assert_eq!(state.phase(), Phase::Parsed);
        assert_eq!(state.files()[0].config, FileConfig::default());
        assert_eq!(state.tables().len(), 1);
        assert_eq!(state.colors().len(), 1);
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn test_failed_file_does_not_block_others() {
        let mut state = AppState::new();
        let notices = state.sync_uploads(vec![upload("empty.csv", ""), upload("ok.csv", "a\n1\n")]);

        assert_eq!(state.tables().len(), 1);
        assert_eq!(state.tables()[0].source(), "ok.csv");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        // Colors stay aligned with the tables that did parse
        assert_eq!(state.colors(), vec![state.file("ok.csv").unwrap().color]);
    }

    #[test]
    fn test_config_change_in_transformed_phase_is_deferred() {
        let mut state = AppState::new();
        state.sync_uploads(vec![upload("a.csv", "t;v\n1;2\n2;3\n")]);
        state.apply_operation(Operation::Addition, &[ColumnRef::new("a.csv", "v")], "1");
        assert_eq!(state.phase(), Phase::Transformed);

        let config = FileConfig {
            end_row: Some(1),
            ..FileConfig::default()
        };
        let notices = state.update_config("a.csv", config);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(state.pending_reparse());
        assert!(state.tables()[0].has_column("v_plus1.0"));

        state.discard_operations();
        assert_eq!(state.phase(), Phase::Parsed);
        assert!(!state.pending_reparse());
        assert!(!state.tables()[0].has_column("v_plus1.0"));
        assert_eq!(state.tables()[0].height(), 1);
    }

    #[test]
    fn test_reupload_in_transformed_phase_is_flagged() {
        let mut state = AppState::new();
        state.sync_uploads(vec![upload("a.csv", "t;v\n1;2\n")]);
        state.apply_operation(Operation::Addition, &[ColumnRef::new("a.csv", "v")], "1");

        // Same bytes again: nothing to report
        let notices = state.sync_uploads(vec![upload("a.csv", "t;v\n1;2\n")]);
        assert!(notices.is_empty());
        assert!(!state.pending_reparse());

        let notices = state.sync_uploads(vec![upload("a.csv", "t;v\n1;2\n2;3\n3;4\n")]);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert!(notices[0].message.contains("a.csv"));
        assert!(state.pending_reparse());
        assert_eq!(state.tables()[0].height(), 1);

        state.discard_operations();
        assert_eq!(state.tables()[0].height(), 3);
        assert!(!state.pending_reparse());
    }

    #[test]
    fn test_set_color_keeps_tables() {
        let mut state = AppState::new();
        state.sync_uploads(vec![upload("a.csv", "t\n1\n")]);
        state.apply_operation(Operation::Multiplication, &[ColumnRef::new("a.csv", "t")], "2");

        assert!(state.set_color("a.csv", Color32::GREEN));
        assert_eq!(state.phase(), Phase::Transformed);
        assert_eq!(state.colors(), vec![Color32::GREEN]);
        assert!(!state.set_color("missing.csv", Color32::GREEN));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut state = AppState::new();
        state.sync_uploads(vec![upload("a.csv", "t\n1\n")]);
        let version = state.version();
        let config = FileConfig {
            start_row: 4,
            end_row: Some(2),
            ..FileConfig::default()
        };
        let notices = state.update_config("a.csv", config);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(state.version(), version);
    }

    #[test]
    fn test_empty_selection_warns() {
        let mut state = AppState::new();
        let notices = state.apply_operation(Operation::Division, &[], "2");
        assert_eq!(notices[0].level, NoticeLevel::Warning);
        assert_eq!(state.phase(), Phase::Unloaded);
    }

    #[test]
    fn test_reset_returns_to_unloaded() {
        let mut state = AppState::new();
        state.sync_uploads(vec![upload("a.csv", "t\n1\n")]);
        let version = state.version();
        state.reset();
        assert_eq!(state.phase(), Phase::Unloaded);
        assert!(state.files().is_empty());
        assert!(state.version() > version);
    }
}
