//! One-shot commands run outside the server lifecycle.
//!
//! Each opens a connection of its own from the authenticated URL and closes
//! it before returning, whether or not the work succeeded.

use crate::db::{LoadSummary, TickerStorage};
use crate::error::{ConnectionError, StockError};
use crate::service::{Connector, StockConnectionManager, dataset_loader};
use sqlx::sqlite::SqliteConnection;
use std::path::Path;
use tracing::{info, warn};

pub async fn create_tables(manager: &StockConnectionManager) -> Result<(), StockError> {
    let mut conn = connect(manager).await?;
    let result = TickerStorage::create_tables(&mut conn).await;
    finish(manager, conn, result).await?;
    info!("tables created");
    Ok(())
}

pub async fn delete_tables(manager: &StockConnectionManager) -> Result<(), StockError> {
    let mut conn = connect(manager).await?;
    let result = TickerStorage::drop_tables(&mut conn).await;
    finish(manager, conn, result).await?;
    info!("tables dropped");
    Ok(())
}

pub async fn write_all_ticker_values(
    manager: &StockConnectionManager,
    file: Option<&Path>,
) -> Result<LoadSummary, StockError> {
    let series = dataset_loader::load(file)?;
    let mut conn = connect(manager).await?;
    let result = TickerStorage::write_series(&mut conn, &series).await;
    let summary = finish(manager, conn, result).await?;
    info!(
        companies = summary.companies,
        values = summary.values,
        "ticker values written"
    );
    Ok(summary)
}

async fn connect(manager: &StockConnectionManager) -> Result<SqliteConnection, StockError> {
    let url = manager.build_authenticated_url();
    let conn = manager
        .connector()
        .establish(&url)
        .await
        .map_err(ConnectionError::EstablishFailed)?;
    Ok(conn)
}

/// Close `conn`; the command's own error wins over a close failure.
async fn finish<T>(
    manager: &StockConnectionManager,
    conn: SqliteConnection,
    result: Result<T, StockError>,
) -> Result<T, StockError> {
    let closed = manager.connector().close(conn).await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(ConnectionError::CloseFailed(e).into()),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "closing command connection failed");
            }
            Err(e)
        }
    }
}
