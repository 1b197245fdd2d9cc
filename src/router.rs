use crate::handlers::companies::{company_values_handler, list_companies_handler};
use crate::handlers::health::healthcheck_handler;
use crate::service::{HealthReporter, SqliteConnector, StockConnectionManager};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct StockState {
    pub manager: Arc<StockConnectionManager>,
    pub health: Arc<HealthReporter<SqliteConnector>>,
}

impl StockState {
    /// The health reporter probes the same target with its own connection.
    pub fn new(manager: Arc<StockConnectionManager>) -> Self {
        let health = HealthReporter::new(
            "company",
            manager.build_authenticated_url(),
            manager.connector().clone(),
        );
        Self {
            manager,
            health: Arc::new(health),
        }
    }
}

pub fn stock_router(state: StockState) -> Router {
    Router::new()
        .route("/companies", get(list_companies_handler))
        .route("/companies/{symbol}/values", get(company_values_handler))
        .route("/healthcheck", get(healthcheck_handler))
        .with_state(state)
}
