//! Database module: ticker rows and the SQL that reads and writes them.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring rows and the bulk-load format
//! - `schema.rs`: SQL DDL for creating and dropping the tables
//! - `sqlite.rs`: queries, all taking a borrowed connection

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Company, CompanyHistory, CompanyValue, LoadSummary, TickerSeries};
pub use schema::{CREATE_TABLES, DROP_TABLES};
pub use sqlite::TickerStorage;
