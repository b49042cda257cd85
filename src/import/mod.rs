//! Broker CSV import pipeline.
//!
//! raw text -> CSV rows -> format detection -> per-layout
//! [`RowParser`] -> duplicate marking -> [`ParseResult`](crate::models::ParseResult).

pub mod columns;
pub mod duplicates;
pub mod format;
pub mod legacy;
pub mod name;
pub mod optionstrat;
pub mod parser;
pub mod row_parser;
pub mod strategy;
pub mod values;

pub use columns::{ColumnIndex, normalize_header};
pub use duplicates::{import_fingerprint, mark_duplicates};
pub use format::detect_format;
pub use name::{DecomposedName, decompose_name};
pub use optionstrat::determine_status;
pub use parser::{CsvImportParser, parse_csv};
pub use row_parser::RowParser;
pub use strategy::{StrategyMatch, parse_strategy};
pub use values::{parse_percent, parse_pl, parse_trade_date};
