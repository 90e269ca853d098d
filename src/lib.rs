//! Multiplot - multi-file delimited data viewer
//!
//! Parses several delimited text files with per-file settings, derives new
//! columns with elementwise arithmetic, and charts any column of one file
//! against any column of another.

pub mod charts;
pub mod data;
pub mod session;
