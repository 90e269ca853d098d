//! Data module - parsing, column addressing and column transforms

mod config;
mod parser;
mod table;
mod transform;

pub use config::{DecimalSeparator, Delimiter, FileConfig};
pub use parser::{ParseError, Parsed, Parser, SkippedRow};
pub use table::{find_table, normalize_headers, ColumnRef, Table, REF_SEPARATOR};
pub use transform::{apply_operation, AppliedTransform, Operation, TransformError, TransformReport};
