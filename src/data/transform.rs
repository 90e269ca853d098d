//! Column Transform Module
//! Derives new columns from existing ones with one elementwise operation.
//! Source tables are never modified; a new table set is returned.

use polars::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::table::{ColumnRef, Table};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Cannot divide by zero for {reference}")]
    DivisionByZero { reference: ColumnRef },
    #[error("Operation failed for {reference}: {source}")]
    Polars {
        reference: ColumnRef,
        #[source]
        source: PolarsError,
    },
}

/// Elementwise arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Addition,
    Multiplication,
    Division,
}

impl Default for Operation {
    fn default() -> Self {
        Operation::Addition
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Operation {
    pub const ALL: [Operation; 3] = [
        Operation::Addition,
        Operation::Multiplication,
        Operation::Division,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }

    pub fn parameter_label(self) -> &'static str {
        match self {
            Operation::Addition => "Value to Add",
            Operation::Multiplication => "Multiplication Factor",
            Operation::Division => "Divisor",
        }
    }

    /// Used when the parameter is blank or unparsable.
    pub fn default_parameter(self) -> f64 {
        match self {
            Operation::Addition => 0.0,
            Operation::Multiplication | Operation::Division => 1.0,
        }
    }

    /// Parse the user's parameter, accepting `.` or `,` as decimal marker.
    pub fn parse_parameter(self, param: &str) -> f64 {
        let trimmed = param.trim();
        if trimmed.is_empty() {
            return self.default_parameter();
        }
        match trimmed.replacen(',', ".", 1).parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    operation = self.label(),
                    param,
                    "Unparsable parameter, using {}",
                    self.default_parameter()
                );
                self.default_parameter()
            }
        }
    }

    /// Name of the column derived from `column` with `value`.
    pub fn derived_name(self, column: &str, value: f64) -> String {
        let suffix = match self {
            Operation::Addition => "plus",
            Operation::Multiplication => "x",
            Operation::Division => "div",
        };
        format!("{}_{}{}", column, suffix, format_parameter(value))
    }

    fn apply(self, value: f64, param: f64) -> f64 {
        match self {
            Operation::Addition => value + param,
            Operation::Multiplication => value * param,
            Operation::Division => value / param,
        }
    }
}

/// Shortest float text with at least one fractional digit: `2` -> `2.0`.
/// Magnitudes below 1e-4 or from 1e16 up use exponent form: `1e-07`.
fn format_parameter(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{:e}", value);
        return match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        };
    }
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// One successfully derived column
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransform {
    pub reference: ColumnRef,
    pub new_column: String,
}

/// Result of [`apply_operation`]: the new table set and per-column outcomes.
#[derive(Debug)]
pub struct TransformReport {
    pub tables: Vec<Table>,
    pub applied: Vec<AppliedTransform>,
    pub errors: Vec<TransformError>,
}

/// Apply `operation` with `param` to every referenced column.
///
/// References to a missing table or column are ignored. A failure on one
/// column is reported and the remaining columns are still processed.
pub fn apply_operation(
    tables: &[Table],
    operation: Operation,
    references: &[ColumnRef],
    param: &str,
) -> TransformReport {
    let value = operation.parse_parameter(param);
    let mut applied = Vec::new();
    let mut errors = Vec::new();

    let new_tables = tables
        .iter()
        .map(|table| {
            let mut current = table.clone();
            for reference in references {
                if reference.source != table.source() || !current.has_column(&reference.column) {
                    continue;
                }
                match derive_column(&current, operation, reference, value) {
                    Ok((next, new_column)) => {
                        info!(
                            reference = %reference,
                            new_column = %new_column,
                            "Applied {}", operation
                        );
                        applied.push(AppliedTransform {
                            reference: reference.clone(),
                            new_column,
                        });
                        current = next;
                    }
                    Err(e) => {
                        warn!("{}", e);
                        errors.push(e);
                    }
                }
            }
            current
        })
        .collect();

    for reference in references {
        let resolved = tables
            .iter()
            .any(|t| t.source() == reference.source && t.has_column(&reference.column));
        if !resolved {
            debug!(reference = %reference, "Ignoring unresolved column reference");
        }
    }

    TransformReport {
        tables: new_tables,
        applied,
        errors,
    }
}

fn derive_column(
    table: &Table,
    operation: Operation,
    reference: &ColumnRef,
    value: f64,
) -> Result<(Table, String), TransformError> {
    if operation == Operation::Division && value == 0.0 {
        return Err(TransformError::DivisionByZero {
            reference: reference.clone(),
        });
    }

    let polars_err = |source: PolarsError| TransformError::Polars {
        reference: reference.clone(),
        source,
    };

    let numbers = table.numeric_values(&reference.column).ok_or_else(|| {
        polars_err(PolarsError::ColumnNotFound(
            reference.column.clone().into(),
        ))
    })?;

    let name = operation.derived_name(&reference.column, value);
    let derived: Vec<Option<f64>> = numbers
        .into_iter()
        .map(|v| v.map(|v| operation.apply(v, value)))
        .collect();

    let (next, new_name) = table
        .with_derived_column(&name, derived)
        .map_err(polars_err)?;
    if new_name != name {
        warn!(
            reference = %reference,
            "{} already exists in the file, writing {} instead", name, new_name
        );
    }
    Ok((next, new_name))
}
