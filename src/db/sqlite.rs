use crate::db::models::{Company, CompanyValue, LoadSummary, TickerSeries};
use crate::db::schema::{CREATE_TABLES, DROP_TABLES, statements};
use crate::error::StockError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use tracing::debug;

/// Stateless queries over the ticker tables.
///
/// Every call borrows a connection, so the same code serves the shared
/// handle and the one-shot connections of the CLI commands.
pub struct TickerStorage;

impl TickerStorage {
    pub async fn create_tables(conn: &mut SqliteConnection) -> Result<(), StockError> {
        Self::run_script(conn, CREATE_TABLES).await
    }

    pub async fn drop_tables(conn: &mut SqliteConnection) -> Result<(), StockError> {
        Self::run_script(conn, DROP_TABLES).await
    }

    async fn run_script(conn: &mut SqliteConnection, script: &str) -> Result<(), StockError> {
        for stmt in statements(script) {
            debug!(sql = stmt, "executing");
            sqlx::query(stmt).execute(&mut *conn).await?;
        }
        Ok(())
    }

    pub async fn list_companies(conn: &mut SqliteConnection) -> Result<Vec<Company>, StockError> {
        let companies =
            sqlx::query_as::<_, Company>("SELECT id, symbol, name FROM companies ORDER BY symbol")
                .fetch_all(&mut *conn)
                .await?;
        Ok(companies)
    }

    pub async fn find_company(
        conn: &mut SqliteConnection,
        symbol: &str,
    ) -> Result<Option<Company>, StockError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, symbol, name FROM companies WHERE symbol = ?",
        )
        .bind(normalize_symbol(symbol))
        .fetch_optional(&mut *conn)
        .await?;
        Ok(company)
    }

    /// Values in ascending time order; `limit` keeps the most recent points.
    pub async fn company_values(
        conn: &mut SqliteConnection,
        company_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<CompanyValue>, StockError> {
        // LIMIT -1 is unbounded in SQLite.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r#"SELECT ts, price FROM (
                   SELECT ts, price FROM company_values
                   WHERE company_id = ?
                   ORDER BY ts DESC
                   LIMIT ?
               ) ORDER BY ts ASC"#,
        )
        .bind(company_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(Self::row_to_value).collect()
    }

    /// Upsert every series inside one transaction.
    pub async fn write_series(
        conn: &mut SqliteConnection,
        series: &[TickerSeries],
    ) -> Result<LoadSummary, StockError> {
        let mut tx = conn.begin().await?;
        let mut summary = LoadSummary::default();

        for item in series {
            let symbol = normalize_symbol(&item.symbol);
            sqlx::query(
                r#"
                INSERT INTO companies (symbol, name) VALUES (?, ?)
                ON CONFLICT(symbol) DO UPDATE SET name = excluded.name
                "#,
            )
            .bind(&symbol)
            .bind(&item.name)
            .execute(&mut *tx)
            .await?;

            let rec: (i64,) = sqlx::query_as("SELECT id FROM companies WHERE symbol = ?")
                .bind(&symbol)
                .fetch_one(&mut *tx)
                .await?;
            summary.companies += 1;

            for value in &item.values {
                sqlx::query(
                    r#"
                    INSERT INTO company_values (company_id, ts, price) VALUES (?, ?, ?)
                    ON CONFLICT(company_id, ts) DO UPDATE SET price = excluded.price
                    "#,
                )
                .bind(rec.0)
                .bind(format_ts(&value.timestamp))
                .bind(value.price)
                .execute(&mut *tx)
                .await?;
                summary.values += 1;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }

    fn row_to_value(row: SqliteRow) -> Result<CompanyValue, StockError> {
        let ts: String = row.try_get("ts")?;
        let price: f64 = row.try_get("price")?;
        let timestamp = DateTime::parse_from_rfc3339(&ts)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(CompanyValue { timestamp, price })
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Fixed-width UTC text so lexical order is time order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
