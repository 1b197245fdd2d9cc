use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Company {
    pub id: i64,
    pub symbol: String,
    pub name: String,
}

/// One price observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyValue {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Body of `GET /companies/{symbol}/values`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyHistory {
    pub symbol: String,
    pub name: String,
    pub values: Vec<CompanyValue>,
}

impl CompanyHistory {
    pub fn new(company: Company, values: Vec<CompanyValue>) -> Self {
        Self {
            symbol: company.symbol,
            name: company.name,
            values,
        }
    }
}

/// A company and its values as found in a bulk-load file.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerSeries {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub values: Vec<CompanyValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub companies: usize,
    pub values: usize,
}
