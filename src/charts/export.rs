//! Static Chart Export
//! Writes a [`Chart`] as a PNG image (plotters) or as Plotly figure JSON.

use crate::charts::{Chart, HoverMode};
use plotters::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Default PNG size in pixels
pub const PNG_SIZE: (u32, u32) = (1400, 800);

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to render chart: {0}")]
    Render(String),
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_err<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Render(e.to_string())
}

#[derive(Serialize)]
struct PlotlyFigure {
    data: Vec<PlotlyTrace>,
    layout: PlotlyLayout,
}

#[derive(Serialize)]
struct PlotlyTrace {
    #[serde(rename = "type")]
    kind: &'static str,
    mode: &'static str,
    name: String,
    x: Vec<Option<f64>>,
    y: Vec<Option<f64>>,
    line: PlotlyLine,
}

#[derive(Serialize)]
struct PlotlyLine {
    color: String,
}

#[derive(Serialize)]
struct PlotlyTitle {
    text: String,
}

#[derive(Serialize)]
struct PlotlyAxis {
    title: PlotlyTitle,
}

#[derive(Serialize)]
struct PlotlyLayout {
    title: PlotlyTitle,
    xaxis: PlotlyAxis,
    yaxis: PlotlyAxis,
    hovermode: HoverMode,
    autosize: bool,
}

/// Writes charts to disk.
pub struct ChartExporter;

impl ChartExporter {
    /// Plotly-compatible figure description.
    pub fn to_plotly_json(chart: &Chart) -> Result<serde_json::Value, ExportError> {
        let figure = PlotlyFigure {
            data: chart
                .series
                .iter()
                .map(|s| PlotlyTrace {
                    kind: "scatter",
                    mode: "lines+markers",
                    name: s.label.clone(),
                    x: s.xs.clone(),
                    y: s.ys.clone(),
                    line: PlotlyLine {
                        color: format!("#{:02x}{:02x}{:02x}", s.color.r(), s.color.g(), s.color.b()),
                    },
                })
                .collect(),
            layout: PlotlyLayout {
                title: PlotlyTitle {
                    text: chart.title.clone(),
                },
                xaxis: PlotlyAxis {
                    title: PlotlyTitle {
                        text: chart.x_label.clone(),
                    },
                },
                yaxis: PlotlyAxis {
                    title: PlotlyTitle {
                        text: chart.y_label.clone(),
                    },
                },
                hovermode: chart.hover,
                autosize: true,
            },
        };
        Ok(serde_json::to_value(figure)?)
    }

    pub fn write_json(chart: &Chart, path: &Path) -> Result<(), ExportError> {
        let value = Self::to_plotly_json(chart)?;
        fs::write(path, serde_json::to_string_pretty(&value)?)?;
        info!(path = %path.display(), "Exported chart JSON");
        Ok(())
    }

    /// Render the chart to a PNG file of `size` pixels.
    pub fn write_png(chart: &Chart, path: &Path, size: (u32, u32)) -> Result<(), ExportError> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let ((x_min, x_max), (y_min, y_max)) = Self::bounds(chart);

        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 26))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(render_err)?;

        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(render_err)?;

        for series in &chart.series {
            let color = RGBColor(series.color.r(), series.color.g(), series.color.b());

            for (i, segment) in series.segments().into_iter().enumerate() {
                let drawn = ctx
                    .draw_series(LineSeries::new(
                        segment.into_iter().map(|[x, y]| (x, y)),
                        color.stroke_width(2),
                    ))
                    .map_err(render_err)?;
                if i == 0 {
                    drawn
                        .label(series.label.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
                }
            }

            ctx.draw_series(
                series
                    .points()
                    .map(|[x, y]| Circle::new((x, y), 3, color.filled())),
            )
            .map_err(render_err)?;
        }

        ctx.configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.3))
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        info!(path = %path.display(), "Exported chart PNG");
        Ok(())
    }

    /// Padded data range over all plotted points.
    fn bounds(chart: &Chart) -> ((f64, f64), (f64, f64)) {
        let mut x = (f64::INFINITY, f64::NEG_INFINITY);
        let mut y = (f64::INFINITY, f64::NEG_INFINITY);
        for [px, py] in chart.series.iter().flat_map(|s| s.points()) {
            if px.is_finite() && py.is_finite() {
                x = (x.0.min(px), x.1.max(px));
                y = (y.0.min(py), y.1.max(py));
            }
        }
        (Self::pad(x), Self::pad(y))
    }

    fn pad((min, max): (f64, f64)) -> (f64, f64) {
        if min.is_infinite() || max.is_infinite() {
            return (0.0, 1.0);
        }
        if min == max {
            return (min - 1.0, max + 1.0);
        }
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}
