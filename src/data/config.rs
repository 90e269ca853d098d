//! Per-file parsing configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parser::ParseError;

/// Column separator of a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Semicolon
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Delimiter::Comma => "Comma (,)",
            Delimiter::Semicolon => "Semicolon (;)",
            Delimiter::Tab => "Tab",
            Delimiter::Pipe => "Pipe (|)",
        };
        f.write_str(label)
    }
}

/// Marker between the integer and fractional part of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimalSeparator {
    Dot,
    Comma,
}

impl DecimalSeparator {
    pub const ALL: [DecimalSeparator; 2] = [DecimalSeparator::Dot, DecimalSeparator::Comma];

    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    /// Parse a trimmed cell as a number using this marker.
    ///
    /// A cell that contains the other marker is never numeric, so `1.5`
    /// stays text in a comma-decimal file.
    pub fn parse_number(self, cell: &str) -> Option<f64> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match self {
            DecimalSeparator::Dot => {
                if cell.contains(',') {
                    return None;
                }
                cell.parse::<f64>().ok()
            }
            DecimalSeparator::Comma => {
                if cell.contains('.') {
                    return None;
                }
                cell.replacen(',', ".", 1).parse::<f64>().ok()
            }
        }
    }
}

impl Default for DecimalSeparator {
    fn default() -> Self {
        DecimalSeparator::Comma
    }
}

impl fmt::Display for DecimalSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecimalSeparator::Dot => f.write_str("Dot (.)"),
            DecimalSeparator::Comma => f.write_str("Comma (,)"),
        }
    }
}

/// User-editable parsing parameters for one uploaded file.
///
/// Row indices are 0-based and count non-blank records. Data selection
/// skips `start_row + header_row` records from the top of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub delimiter: Delimiter,
    pub decimal_separator: DecimalSeparator,
    pub start_row: usize,
    pub end_row: Option<usize>,
    pub header_row: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::default(),
            decimal_separator: DecimalSeparator::default(),
            start_row: 1,
            end_row: None,
            header_row: 0,
        }
    }
}

impl FileConfig {
    /// Check the combination of fields before any bytes are read.
    pub fn validate(&self) -> Result<(), ParseError> {
        if let Some(end_row) = self.end_row {
            if end_row < self.start_row {
                return Err(ParseError::InvalidRowRange {
                    start_row: self.start_row,
                    end_row,
                });
            }
        }
        if self.delimiter == Delimiter::Comma && self.decimal_separator == DecimalSeparator::Comma
        {
            return Err(ParseError::SeparatorConflict);
        }
        Ok(())
    }

    /// Number of records to skip before the first data row.
    pub fn rows_to_skip(&self) -> usize {
        self.start_row + self.header_row
    }

    /// Maximum number of data rows to read, if bounded.
    pub fn row_limit(&self) -> Option<usize> {
        self.end_row.map(|end_row| end_row - self.start_row + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_dot() {
        let dec = DecimalSeparator::Dot;
        assert_eq!(dec.parse_number(" 2.5 "), Some(2.5));
        assert_eq!(dec.parse_number("-3"), Some(-3.0));
        assert_eq!(dec.parse_number("2,5"), None);
        assert_eq!(dec.parse_number(""), None);
        assert_eq!(dec.parse_number("abc"), None);
    }

    #[test]
    fn test_parse_number_comma() {
        let dec = DecimalSeparator::Comma;
        assert_eq!(dec.parse_number("2,5"), Some(2.5));
        assert_eq!(dec.parse_number("7"), Some(7.0));
        assert_eq!(dec.parse_number("2.5"), None);
        assert_eq!(dec.parse_number("1,2,3"), None);
    }

    #[test]
    fn test_validate_row_range() {
        let config = FileConfig {
            start_row: 5,
            end_row: Some(2),
            ..FileConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParseError::InvalidRowRange { start_row: 5, end_row: 2 })
        ));
    }

    #[test]
    fn test_validate_separator_conflict() {
        let config = FileConfig {
            delimiter: Delimiter::Comma,
            decimal_separator: DecimalSeparator::Comma,
            ..FileConfig::default()
        };
        assert!(matches!(config.validate(), Err(ParseError::SeparatorConflict)));
    }

    #[test]
    fn test_row_window() {
        let config = FileConfig {
            start_row: 2,
            end_row: Some(4),
            header_row: 1,
            ..FileConfig::default()
        };
        assert_eq!(config.rows_to_skip(), 3);
        assert_eq!(config.row_limit(), Some(3));
        assert_eq!(FileConfig::default().row_limit(), None);
    }
}
