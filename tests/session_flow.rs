//! End-to-end flow: upload, configure, transform, chart.

use multiplot::charts::{ChartExporter, PlotWarning};
use multiplot::data::{ColumnRef, DecimalSeparator, Delimiter, FileConfig, Operation};
use multiplot::session::{AppState, NoticeLevel, Phase, UploadedFile};

const SENSOR: &str = "# exported by logger\ntime;temp;\n0;20,5;a\n1;21,0;b\n2;21,5;c\n";
const REFERENCE: &str = "t,ref\n0,1.5\n1,2.5\n2,3.5\n3,4.5\n4,5.5\n";

fn uploads() -> Vec<UploadedFile> {
    vec![
        UploadedFile::new("sensor.csv", SENSOR),
        UploadedFile::new("reference.csv", REFERENCE),
    ]
}

fn configured_state() -> AppState {
    let mut state = AppState::new();
    state.sync_uploads(uploads());

    state.update_config(
        "sensor.csv",
        FileConfig {
            header_row: 1,
            ..FileConfig::default()
        },
    );
    let notices = state.update_config(
        "reference.csv",
        FileConfig {
            delimiter: Delimiter::Comma,
            decimal_separator: DecimalSeparator::Dot,
            ..FileConfig::default()
        },
    );
    assert!(notices.iter().all(|n| n.level != NoticeLevel::Error));
    state
}

#[test]
fn test_headers_and_rows_follow_config() {
    let state = configured_state();
    assert_eq!(state.phase(), Phase::Parsed);

    let sensor = &state.tables()[0];
    assert_eq!(sensor.column_names(), vec!["time", "temp", "Column_3"]);
    assert_eq!(sensor.height(), 3);

    let reference = &state.tables()[1];
    assert_eq!(reference.height(), 5);
    assert_eq!(
        reference.numeric_values("ref"),
        Some(vec![Some(1.5), Some(2.5), Some(3.5), Some(4.5), Some(5.5)])
    );
}

#[test]
fn test_transform_then_chart_across_files() {
    let mut state = configured_state();

    let notices = state.apply_operation(
        Operation::Multiplication,
        &[ColumnRef::new("sensor.csv", "temp")],
        "2",
    );
    assert_eq!(notices.len(), 1);
    assert_eq!(state.phase(), Phase::Transformed);
    assert!(state.tables()[0].has_column("temp_x2.0"));
    assert!(state.tables()[0].has_column("temp"));

    let outcome = state.build_chart(
        &[ColumnRef::new("sensor.csv", "time")],
        &[
            ColumnRef::new("reference.csv", "ref"),
            ColumnRef::new("sensor.csv", "temp_x2.0"),
        ],
        "Time (s)",
        "",
    );
    let chart = outcome.chart.expect("chart");
    assert_eq!(chart.series.len(), 2);
    assert_eq!(chart.series[0].len(), 3);
    assert_eq!(chart.series[0].label, "sensor.csv: time vs reference.csv: ref");
    assert_eq!(chart.series[0].color, state.file("sensor.csv").unwrap().color);
    assert_eq!(
        chart.series[1].ys,
        vec![Some(41.0), Some(42.0), Some(43.0)]
    );
    assert_eq!(chart.y_label, "Y Axis");
    assert!(matches!(
        outcome.warnings.as_slice(),
        [PlotWarning::LengthMismatch { .. }]
    ));

    let json = ChartExporter::to_plotly_json(&chart).unwrap();
    assert_eq!(json["data"].as_array().map(|a| a.len()), Some(2));
}

#[test]
fn test_removing_file_keeps_transforms_of_others() {
    let mut state = configured_state();
    state.apply_operation(
        Operation::Addition,
        &[ColumnRef::new("reference.csv", "ref")],
        "1",
    );

    state.sync_uploads(vec![UploadedFile::new("reference.csv", REFERENCE)]);
    assert_eq!(state.phase(), Phase::Transformed);
    assert_eq!(state.tables().len(), 1);
    assert!(state.tables()[0].has_column("ref_plus1.0"));
    assert_eq!(state.colors().len(), 1);

    state.sync_uploads(Vec::new());
    assert_eq!(state.phase(), Phase::Unloaded);
    assert!(state.tables().is_empty());
}

#[test]
fn test_unresolvable_axes_produce_no_chart() {
    let state = configured_state();
    let outcome = state.build_chart(
        &[ColumnRef::new("gone.csv", "time")],
        &[ColumnRef::new("sensor.csv", "missing")],
        "",
        "",
    );
    assert!(outcome.chart.is_none());
    assert!(!outcome.warnings.is_empty());
}
