//! Chart Plotter Module
//! Pairs X and Y column references across tables into chart series and
//! draws them interactively using egui_plot.

use crate::data::{find_table, ColumnRef, Table};
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoint, PlotPoints, Points};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const CHART_TITLE: &str = "Multi-File Visualization";
pub const DEFAULT_X_LABEL: &str = "X Axis";
pub const DEFAULT_Y_LABEL: &str = "Y Axis";

/// Color used when a table has no assigned color.
pub const FALLBACK_COLOR: Color32 = Color32::BLACK;

/// Non-fatal problems found while building a chart
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotWarning {
    #[error("Cannot plot {x} vs {y}: {missing} not found")]
    Unresolved {
        x: ColumnRef,
        y: ColumnRef,
        missing: ColumnRef,
    },
    #[error("{label}: X has {x_len} values, Y has {y_len}; only the first {plotted} are plotted")]
    LengthMismatch {
        label: String,
        x_len: usize,
        y_len: usize,
        plotted: usize,
    },
    #[error("{label}: no row has numeric values on both axes; series left out")]
    NoPlottablePoints { label: String },
}

/// How hovering reports values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HoverMode {
    /// One readout listing every series at the hovered X position.
    #[serde(rename = "x unified")]
    XUnified,
}

/// One (X column, Y column) pairing, aligned by row position.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: Color32,
    pub xs: Vec<Option<f64>>,
    pub ys: Vec<Option<f64>>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Points where both coordinates are present.
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .filter_map(|(x, y)| Some([(*x)?, (*y)?]))
    }

    /// Runs of consecutive present points; missing values break the line.
    pub fn segments(&self) -> Vec<Vec<[f64; 2]>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        for (x, y) in self.xs.iter().zip(self.ys.iter()) {
            match (x, y) {
                (Some(x), Some(y)) => current.push([*x, *y]),
                _ => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }
}

/// A renderable chart: one series per resolved (X, Y) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub hover: HoverMode,
    pub series: Vec<Series>,
}

/// Result of [`ChartPlotter::build_chart`]. `chart` is `None` when no pair has points.
#[derive(Debug, Clone)]
pub struct ChartOutcome {
    pub chart: Option<Chart>,
    pub warnings: Vec<PlotWarning>,
}

/// Builds and draws multi-file line charts.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Color of the table owning `source`; `colors` is aligned with `tables`.
    pub fn table_color(tables: &[Table], colors: &[Color32], source: &str) -> Color32 {
        tables
            .iter()
            .position(|t| t.source() == source)
            .and_then(|i| colors.get(i))
            .copied()
            .unwrap_or(FALLBACK_COLOR)
    }

    /// One series for every pair in `x_refs × y_refs`.
    ///
    /// Unresolvable pairs are skipped with a warning. Columns of different
    /// length are truncated to the shorter one, also with a warning. A pair
    /// with no row numeric on both axes is left out and reported.
    pub fn build_chart(
        tables: &[Table],
        colors: &[Color32],
        x_refs: &[ColumnRef],
        y_refs: &[ColumnRef],
        x_label: &str,
        y_label: &str,
    ) -> ChartOutcome {
        let mut series = Vec::new();
        let mut warnings = Vec::new();

        for x in x_refs {
            for y in y_refs {
                let (mut xs, mut ys) = match (Self::resolve(tables, x), Self::resolve(tables, y)) {
                    (Some(xs), Some(ys)) => (xs, ys),
                    (xs, _) => {
                        let missing = if xs.is_none() { x } else { y };
                        let warning = PlotWarning::Unresolved {
                            x: x.clone(),
                            y: y.clone(),
                            missing: missing.clone(),
                        };
                        warn!("{}", warning);
                        warnings.push(warning);
                        continue;
                    }
                };

                let label = format!(
                    "{}: {} vs {}: {}",
                    x.source, x.column, y.source, y.column
                );

                if xs.len() != ys.len() {
                    let plotted = xs.len().min(ys.len());
                    let warning = PlotWarning::LengthMismatch {
                        label: label.clone(),
                        x_len: xs.len(),
                        y_len: ys.len(),
                        plotted,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    xs.truncate(plotted);
                    ys.truncate(plotted);
                }

                let candidate = Series {
                    label,
                    color: Self::table_color(tables, colors, &x.source),
                    xs,
                    ys,
                };
                if candidate.points().next().is_none() {
                    let warning = PlotWarning::NoPlottablePoints {
                        label: candidate.label,
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
                series.push(candidate);
            }
        }

        if series.is_empty() {
            return ChartOutcome {
                chart: None,
                warnings,
            };
        }

        info!(series = series.len(), "Built chart");
        let chart = Chart {
            title: CHART_TITLE.to_string(),
            x_label: Self::label_or(x_label, DEFAULT_X_LABEL),
            y_label: Self::label_or(y_label, DEFAULT_Y_LABEL),
            hover: HoverMode::XUnified,
            series,
        };

        ChartOutcome {
            chart: Some(chart),
            warnings,
        }
    }

    fn resolve(tables: &[Table], reference: &ColumnRef) -> Option<Vec<Option<f64>>> {
        find_table(tables, &reference.source)?.numeric_values(&reference.column)
    }

    fn label_or(label: &str, fallback: &str) -> String {
        if label.trim().is_empty() {
            fallback.to_string()
        } else {
            label.to_string()
        }
    }

    /// Value of `series` at the sample closest to `x`, for the unified readout.
    pub fn nearest_at(series: &Series, x: f64) -> Option<[f64; 2]> {
        series.points().min_by(|a, b| {
            (a[0] - x)
                .abs()
                .partial_cmp(&(b[0] - x).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Draw the chart with lines and markers plus a unified hover readout.
    pub fn draw_chart(ui: &mut egui::Ui, chart: &Chart, height: f32) {
        ui.label(RichText::new(&chart.title).size(18.0).strong());
        ui.add_space(6.0);

        let hovered: Option<PlotPoint> = Plot::new("multi_file_chart")
            .height(height)
            .legend(Legend::default())
            .x_axis_label(chart.x_label.clone())
            .y_axis_label(chart.y_label.clone())
            .label_formatter(|name, value| {
                if name.is_empty() {
                    format!("x = {:.4}\ny = {:.4}", value.x, value.y)
                } else {
                    format!("{}\nx = {:.4}\ny = {:.4}", name, value.x, value.y)
                }
            })
            .show(ui, |plot_ui| {
                for series in &chart.series {
                    for segment in series.segments() {
                        let points: PlotPoints = segment.into_iter().collect();
                        plot_ui.line(
                            Line::new(points)
                                .color(series.color)
                                .width(1.5)
                                .name(&series.label),
                        );
                    }

                    let markers: PlotPoints = series.points().collect();
                    plot_ui.points(
                        Points::new(markers)
                            .radius(3.0)
                            .color(series.color)
                            .name(&series.label),
                    );
                }
                plot_ui.pointer_coordinate()
            })
            .inner;

        if let (HoverMode::XUnified, Some(pointer)) = (chart.hover, hovered) {
            ui.add_space(4.0);
            ui.label(RichText::new(format!("x ≈ {:.4}", pointer.x)).strong());
            for series in &chart.series {
                if let Some([x, y]) = Self::nearest_at(series, pointer.x) {
                    ui.label(
                        RichText::new(format!("{}: ({:.4}, {:.4})", series.label, x, y))
                            .color(series.color),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use super::Series;

    fn numeric_table(source: &str, name: &str, values: &[f64]) -> Table {
        let values: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        Table::new(
            source,
            DataFrame::new(vec![Column::new(name.into(), values)]).unwrap(),
        )
    }

    fn fixtures() -> (Vec<Table>, Vec<Color32>) {
        (
            vec![
                numeric_table("A", "c1", &[1.0, 2.0, 3.0]),
                numeric_table("B", "c2", &[10.0, 20.0, 30.0, 40.0, 50.0]),
            ],
            vec![Color32::RED, Color32::BLUE],
        )
    }

    #[test]
    fn test_cross_file_series_truncated_to_shorter() {
        let (tables, colors) = fixtures();
        let outcome = ChartPlotter::build_chart(
            &tables,
            &colors,
            &[ColumnRef::new("A", "c1")],
            &[ColumnRef::new("B", "c2")],
            "",
            "Signal",
        );

        let chart = outcome.chart.unwrap();
        assert_eq!(chart.series.len(), 1);
        let series = &chart.series[0];
        assert_eq!(series.len(), 3);
        assert_eq!(series.label, "A: c1 vs B: c2");
        assert_eq!(series.color, Color32::RED);
        assert_eq!(chart.x_label, DEFAULT_X_LABEL);
        assert_eq!(chart.y_label, "Signal");
        assert_eq!(chart.hover, HoverMode::XUnified);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [PlotWarning::LengthMismatch { x_len: 3, y_len: 5, plotted: 3, .. }]
        ));
    }

    #[test]
    fn test_all_unresolved_is_no_chart() {
        let (tables, colors) = fixtures();
        let outcome = ChartPlotter::build_chart(
            &tables,
            &colors,
            &[ColumnRef::new("Z", "c1")],
            &[ColumnRef::new("B", "nope")],
            "x",
            "y",
        );
        assert!(outcome.chart.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_cartesian_product_skips_bad_pairs() {
        let (tables, colors) = fixtures();
        let outcome = ChartPlotter::build_chart(
            &tables,
            &colors,
            &[ColumnRef::new("A", "c1"), ColumnRef::new("B", "c2")],
            &[ColumnRef::new("B", "c2"), ColumnRef::new("A", "gone")],
            "x",
            "y",
        );
        let chart = outcome.chart.unwrap();
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[1].label, "B: c2 vs B: c2");
        assert_eq!(chart.series[1].color, Color32::BLUE);
        assert_eq!(chart.series[1].len(), 5);
        let unresolved = outcome
            .warnings
            .iter()
            .filter(|w| matches!(w, PlotWarning::Unresolved { .. }))
            .count();
        assert_eq!(unresolved, 2);
    }

    #[test]
    fn test_text_axis_reported_and_left_out() {
        let dates = Table::new(
            "log.csv",
            DataFrame::new(vec![
                Column::new(
                    "date".into(),
                    vec!["2024-01-01", "2024-01-02", "2024-01-03"],
                ),
                Column::new("v".into(), vec![Some(1.0), Some(2.0), Some(3.0)]),
            ])
            .unwrap(),
        );
        let outcome = ChartPlotter::build_chart(
            &[dates],
            &[Color32::RED],
            &[ColumnRef::new("log.csv", "date")],
            &[ColumnRef::new("log.csv", "v")],
            "",
            "",
        );
        assert!(outcome.chart.is_none());
        assert_eq!(
            outcome.warnings,
            vec![PlotWarning::NoPlottablePoints {
                label: "log.csv: date vs log.csv: v".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_color_falls_back() {
        let (tables, _) = fixtures();
        assert_eq!(
            ChartPlotter::table_color(&tables, &[Color32::RED], "B"),
            FALLBACK_COLOR
        );
    }

    #[test]
    fn test_segments_split_on_gaps() {
        let series = Series {
            label: "s".to_string(),
            color: Color32::RED,
            xs: vec![Some(0.0), Some(1.0), None, Some(3.0)],
            ys: vec![Some(5.0), Some(6.0), Some(7.0), Some(8.0)],
        };
        assert_eq!(
            series.segments(),
            vec![vec![[0.0, 5.0], [1.0, 6.0]], vec![[3.0, 8.0]]]
        );
        assert_eq!(ChartPlotter::nearest_at(&series, 2.6), Some([3.0, 8.0]));
    }
}
