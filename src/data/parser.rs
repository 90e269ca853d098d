//! Delimited File Parser Module
//! Turns raw uploaded bytes plus a [`FileConfig`] into a [`Table`].

use polars::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};

use super::config::{DecimalSeparator, Delimiter, FileConfig};
use super::table::{normalize_headers, Table};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File is empty")]
    Empty,
    #[error("Header row {header_row} is past the end of the file ({rows} rows)")]
    MissingHeader { header_row: usize, rows: usize },
    #[error("Last data row {end_row} is before first data row {start_row}")]
    InvalidRowRange { start_row: usize, end_row: usize },
    #[error("Comma cannot be both the column separator and the decimal separator")]
    SeparatorConflict,
    #[error("Failed to read rows: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to build table: {0}")]
    Polars(#[from] PolarsError),
}

/// A data row dropped while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based line number in the file.
    pub line: u64,
    pub reason: String,
}

/// Successful parse: the table plus the rows that had to be dropped.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub table: Table,
    pub skipped: Vec<SkippedRow>,
}

/// Parses delimited text into tables.
pub struct Parser;

impl Parser {
    /// Parse `bytes` (the content of the file called `name`) with `config`.
    pub fn parse(name: &str, bytes: &[u8], config: &FileConfig) -> Result<Parsed, ParseError> {
        let result = Self::parse_inner(name, bytes, config);
        if let Err(e) = &result {
            error!(file = name, "Failed to parse: {}", e);
        }
        result
    }

    fn parse_inner(name: &str, bytes: &[u8], config: &FileConfig) -> Result<Parsed, ParseError> {
        config.validate()?;

        let header = Self::read_header(bytes, config)?;
        let names = normalize_headers(&header);

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        let mut skipped = Vec::new();
        let limit = config.row_limit();
        let mut taken = 0usize;

        let mut reader = Self::reader(bytes, config.delimiter);
        for (index, record) in reader.records().enumerate().skip(config.rows_to_skip()) {
            if limit.is_some_and(|limit| taken >= limit) {
                break;
            }
            taken += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(index as u64 + 1);
                    warn!(file = name, line, "Skipping malformed row: {}", e);
                    skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(index as u64 + 1);
            if record.len() > names.len() {
                let reason = format!(
                    "Expected {} fields, saw {}",
                    names.len(),
                    record.len()
                );
                warn!(file = name, line, "Skipping malformed row: {}", reason);
                skipped.push(SkippedRow { line, reason });
                continue;
            }

            // Short rows are padded with nulls
            for (i, column) in cells.iter_mut().enumerate() {
                let cell = record
                    .get(i)
                    .filter(|c| !c.trim().is_empty())
                    .map(str::to_string);
                column.push(cell);
            }
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(cells)
            .map(|(col_name, values)| Self::build_column(col_name, values, config.decimal_separator))
            .collect();
        let df = DataFrame::new(columns)?;

        info!(
            file = name,
            rows = df.height(),
            columns = df.width(),
            skipped = skipped.len(),
            "Parsed file"
        );

        Ok(Parsed {
            table: Table::new(name, df),
            skipped,
        })
    }

    fn reader(bytes: &[u8], delimiter: Delimiter) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes)
    }

    /// Raw tokens of the record at `header_row`.
    fn read_header(bytes: &[u8], config: &FileConfig) -> Result<Vec<String>, ParseError> {
        let mut reader = Self::reader(bytes, config.delimiter);
        let mut rows = 0usize;
        for record in reader.records() {
            if rows == config.header_row {
                let record = record?;
                return Ok(record.iter().map(str::to_string).collect());
            }
            rows += 1;
        }

        if rows == 0 {
            Err(ParseError::Empty)
        } else {
            Err(ParseError::MissingHeader {
                header_row: config.header_row,
                rows,
            })
        }
    }

    /// A column is numeric when every non-empty cell parses as a number.
    fn build_column(name: &str, values: Vec<Option<String>>, decimal: DecimalSeparator) -> Column {
        let numeric: Option<Vec<Option<f64>>> = values
            .iter()
            .map(|cell| match cell {
                Some(text) => decimal.parse_number(text).map(Some),
                None => Some(None),
            })
            .collect();

        match numeric {
            Some(numbers) => Column::new(name.into(), numbers),
            None => Column::new(name.into(), values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(delimiter: Delimiter, decimal: DecimalSeparator) -> FileConfig {
        FileConfig {
            delimiter,
            decimal_separator: decimal,
            start_row: 1,
            end_row: None,
            header_row: 0,
        }
    }

    #[test]
    fn test_parse_semicolon_comma_decimal() {
        let bytes = b"time;temp\n0;20,5\n1;21,0\n2;21,5\n";
        let parsed = Parser::parse(
            "a.csv",
            bytes,
            &config(Delimiter::Semicolon, DecimalSeparator::Comma),
        )
        .unwrap();

        let table = parsed.table;
        assert_eq!(table.source(), "a.csv");
        assert_eq!(table.column_names(), vec!["time", "temp"]);
        assert_eq!(
            table.numeric_values("temp"),
            Some(vec![Some(20.5), Some(21.0), Some(21.5)])
        );
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn test_mixed_column_stays_text() {
        let bytes = b"id,status\n1,ok\n2,3.5\n";
        let parsed =
            Parser::parse("b.csv", bytes, &config(Delimiter::Comma, DecimalSeparator::Dot))
                .unwrap();
        let df = parsed.table.dataframe().clone();
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("status").unwrap().dtype(), &DataType::String);
        assert_eq!(parsed.table.cell_text(1, "status"), "3.5");
    }

    #[test]
    fn test_header_normalization_applied() {
        let bytes = b"A||A\n1|2|3\n";
        let parsed =
            Parser::parse("c.txt", bytes, &config(Delimiter::Pipe, DecimalSeparator::Dot))
                .unwrap();
        assert_eq!(parsed.table.column_names(), vec!["A", "Column_2", "A_1"]);
    }

    #[test]
    fn test_row_window_relative_to_file_start() {
        // Two preamble lines, header at row 2, data rows follow.
        let bytes = b"# logger\n# v2\nx\ty\n1\t10\n2\t20\n3\t30\n4\t40\n";
        let cfg = FileConfig {
            delimiter: Delimiter::Tab,
            decimal_separator: DecimalSeparator::Dot,
            start_row: 2,
            end_row: Some(3),
            header_row: 2,
        };
        let parsed = Parser::parse("d.dat", bytes, &cfg).unwrap();
        // Skips start_row + header_row = 4 records, reads end - start + 1 = 2
        assert_eq!(parsed.table.height(), 2);
        assert_eq!(
            parsed.table.numeric_values("y"),
            Some(vec![Some(20.0), Some(30.0)])
        );
    }

    #[test]
    fn test_row_limit_clamped_to_available() {
        let bytes = b"v\n1\n2\n";
        let cfg = FileConfig {
            end_row: Some(50),
            ..config(Delimiter::Comma, DecimalSeparator::Dot)
        };
        let parsed = Parser::parse("e.csv", bytes, &cfg).unwrap();
        assert_eq!(parsed.table.height(), 2);
    }

    #[test]
    fn test_long_rows_skipped_short_rows_padded() {
        let bytes = b"a;b\n1;2\n3;4;5\n6\n";
        let parsed = Parser::parse(
            "f.csv",
            bytes,
            &config(Delimiter::Semicolon, DecimalSeparator::Comma),
        )
        .unwrap();
        assert_eq!(parsed.table.height(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 3);
        assert_eq!(
            parsed.table.numeric_values("b"),
            Some(vec![Some(2.0), None])
        );
    }

    #[test]
    fn test_invalid_utf8_row_skipped() {
        let bytes = b"a,b\n1,2\n\xff\xfe,3\n4,5\n";
        let parsed =
            Parser::parse("u.csv", bytes, &config(Delimiter::Comma, DecimalSeparator::Dot))
                .unwrap();
        assert_eq!(parsed.table.height(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 3);
        assert_eq!(
            parsed.table.numeric_values("b"),
            Some(vec![Some(2.0), Some(5.0)])
        );
    }

    #[test]
    fn test_empty_file_is_error() {
        let result = Parser::parse("g.csv", b"", &FileConfig::default());
        assert!(matches!(result, Err(ParseError::Empty)));
    }

    #[test]
    fn test_header_past_end_is_error() {
        let cfg = FileConfig {
            header_row: 5,
            ..FileConfig::default()
        };
        let result = Parser::parse("h.csv", b"a;b\n1;2\n", &cfg);
        assert!(matches!(
            result,
            Err(ParseError::MissingHeader { header_row: 5, rows: 2 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = FileConfig {
            start_row: 3,
            end_row: Some(1),
            ..FileConfig::default()
        };
        let result = Parser::parse("i.csv", b"a\n1\n", &cfg);
        assert!(matches!(result, Err(ParseError::InvalidRowRange { .. })));
    }
}
