pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod service;

pub use error::{ConnectionError, StockError};
pub use service::{ConnectionManager, StockConnectionManager};
