//! Table and column addressing.
//! A table is a polars DataFrame tagged with the name of the file it came from.

use polars::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Separator used by the string form of a [`ColumnRef`].
pub const REF_SEPARATOR: &str = "||";

/// Address of one column within one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub source: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
        }
    }

    /// Serialize as `"<source>||<column>"`.
    pub fn to_key(&self) -> String {
        format!("{}{}{}", self.source, REF_SEPARATOR, self.column)
    }

    /// Inverse of [`ColumnRef::to_key`]. Splits on the first separator.
    pub fn parse_key(key: &str) -> Option<Self> {
        key.split_once(REF_SEPARATOR)
            .map(|(source, column)| Self::new(source, column))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.column)
    }
}

/// Turn raw header tokens into unique column names.
///
/// Blank tokens become `Column_<position>` (1-based). A name already taken
/// gets `_<n>` appended, `n` counting repeats of that name from 1.
pub fn normalize_headers<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        let base = if token.trim().is_empty() {
            format!("Column_{}", i + 1)
        } else {
            token.to_string()
        };

        let mut name = base.clone();
        if taken.contains(&name) {
            let count = counts.entry(base.clone()).or_insert(0);
            loop {
                *count += 1;
                let candidate = format!("{}_{}", base, count);
                if !taken.contains(&candidate) {
                    name = candidate;
                    break;
                }
            }
        }

        taken.insert(name.clone());
        names.push(name);
    }

    names
}

/// In-memory labeled dataset tied to one source file.
///
/// Tables are never mutated in place; deriving a column yields a new table.
#[derive(Debug, Clone)]
pub struct Table {
    source: String,
    df: DataFrame,
    /// Columns added by transforms; only these may be replaced.
    derived: BTreeSet<String>,
}

impl Table {
    pub fn new(source: impl Into<String>, df: DataFrame) -> Self {
        Self {
            source: source.into(),
            df,
            derived: BTreeSet::new(),
        }
    }

    /// Name of the originating file.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.df.shape()
    }

    /// First `n` rows, for configuration previews.
    pub fn preview(&self, n: usize) -> DataFrame {
        self.df.head(Some(n))
    }

    /// Every column of this table as a reference.
    pub fn column_references(&self) -> Vec<ColumnRef> {
        self.column_names()
            .into_iter()
            .map(|name| ColumnRef::new(self.source.clone(), name))
            .collect()
    }

    /// Column values coerced to numbers; non-numeric entries become `None`.
    pub fn numeric_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let column = self.df.column(name).ok()?;
        let as_f64 = column.cast(&DataType::Float64).ok()?;
        let values = as_f64.f64().ok()?;
        Some(values.into_iter().collect())
    }

    /// Display text of one cell; nulls render empty.
    pub fn cell_text(&self, row: usize, column: &str) -> String {
        self.df
            .column(column)
            .ok()
            .and_then(|col| col.get(row).ok())
            .map(|val| {
                if val.is_null() {
                    String::new()
                } else {
                    val.to_string().trim_matches('"').to_string()
                }
            })
            .unwrap_or_default()
    }

    pub fn is_derived(&self, name: &str) -> bool {
        self.derived.contains(name)
    }

    /// Copy of this table with a derived column named `name`.
    ///
    /// An earlier derived column of that name is replaced. A parsed column of
    /// that name is kept, and the new column takes the first free `<name>_<n>`.
    /// Returns the table and the name actually used.
    pub fn with_derived_column(
        &self,
        name: &str,
        values: Vec<Option<f64>>,
    ) -> PolarsResult<(Table, String)> {
        let usable = |candidate: &str| !self.has_column(candidate) || self.is_derived(candidate);
        let mut chosen = name.to_string();
        let mut n = 0;
        while !usable(&chosen) {
            n += 1;
            chosen = format!("{}_{}", name, n);
        }

        let mut df = self.df.clone();
        df.with_column(Column::new(chosen.as_str().into(), values))?;
        let mut derived = self.derived.clone();
        derived.insert(chosen.clone());
        Ok((
            Table {
                source: self.source.clone(),
                df,
                derived,
            },
            chosen,
        ))
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.derived == other.derived
            && self.df.equals_missing(&other.df)
    }
}

/// Find the table owning `source`.
pub fn find_table<'a>(tables: &'a [Table], source: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.source() == source)
}
