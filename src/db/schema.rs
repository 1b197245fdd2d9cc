//! SQL DDL for the ticker tables.

/// `companies` keyed by an upper-case `symbol`; `company_values` holds one
/// price per company and timestamp.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS company_values (
    company_id INTEGER NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    ts TEXT NOT NULL, -- RFC3339, UTC
    price REAL NOT NULL,
    PRIMARY KEY (company_id, ts)
);
"#;

/// Children first so the foreign key never dangles.
pub const DROP_TABLES: &str = r#"
DROP TABLE IF EXISTS company_values;
DROP TABLE IF EXISTS companies;
"#;

/// Split a script into statements; `sqlx::query` runs one at a time.
pub(crate) fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}
