pub mod connection_manager;
pub mod connector;
pub mod dataset_loader;
pub mod health;

pub use connection_manager::{
    ConnectionHandle, ConnectionManager, ConnectionState, StockConnectionManager,
};
pub use connector::{Connector, SqliteConnector};
pub use health::{HealthReporter, HealthStatus};
