//! Options trading journal: broker CSV import pipeline and the SQLite-backed
//! journal it feeds.
//!
//! [`import`] turns an uploaded CSV into reviewable [`ParseResult`]s without
//! touching storage. [`commands`] persists confirmed trades and serves the
//! journal views over a [`Database`].

pub mod commands;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

pub use db::Database;
pub use error::{JournalError, Result};
pub use import::{CsvImportParser, parse_csv};
pub use models::{CsvFormat, ParseResult, ParseSummary, ParsedTrade, StrategyType, TradeStatus};
