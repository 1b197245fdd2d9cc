use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use tracing::debug;

use crate::db::{Company, CompanyHistory, TickerStorage};
use crate::{StockError, router::StockState};

#[derive(Debug, Deserialize)]
pub struct ValuesQuery {
    pub limit: Option<u32>,
}

/// GET /companies
pub async fn list_companies_handler(
    State(state): State<StockState>,
) -> Result<Json<Vec<Company>>, StockError> {
    let handle = state.manager.get()?;
    let mut conn = handle.acquire().await?;
    let companies = TickerStorage::list_companies(&mut conn).await?;
    debug!(count = companies.len(), "listed companies");
    Ok(Json(companies))
}

/// GET /companies/{symbol}/values?limit=N
pub async fn company_values_handler(
    State(state): State<StockState>,
    Path(symbol): Path<String>,
    query: Result<Query<ValuesQuery>, QueryRejection>,
) -> Result<Json<CompanyHistory>, StockError> {
    let Query(query) = query?;
    let handle = state.manager.get()?;
    let mut conn = handle.acquire().await?;

    let company = TickerStorage::find_company(&mut conn, &symbol)
        .await?
        .ok_or(StockError::CompanyNotFound(symbol))?;
    let values = TickerStorage::company_values(&mut conn, company.id, query.limit).await?;
    Ok(Json(CompanyHistory::new(company, values)))
}
