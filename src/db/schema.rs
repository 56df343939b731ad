use sqlx::PgConnection;
use tracing::debug;

use crate::error::Result;

// The storage check on phones is looser than `validate_phone` (13 vs 11).
pub const CREATE_CLIENTS: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id SERIAL PRIMARY KEY,
    first_name VARCHAR(40) NOT NULL,
    last_name VARCHAR(40) NOT NULL,
    email VARCHAR(40) UNIQUE NOT NULL,
    CONSTRAINT uc_full_name UNIQUE (first_name, last_name)
)
"#;

pub const CREATE_PHONES: &str = r#"
CREATE TABLE IF NOT EXISTS phones (
    id SERIAL PRIMARY KEY,
    phone VARCHAR(13) NOT NULL CHECK (LENGTH(phone) BETWEEN 7 AND 13),
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    CONSTRAINT uc_phone UNIQUE (phone, client_id)
)
"#;

/// Dependents first.
pub const DROP_TABLES: [&str; 2] = [
    "DROP TABLE IF EXISTS phones",
    "DROP TABLE IF EXISTS clients",
];

pub async fn create_schema(conn: &mut PgConnection) -> Result<()> {
    for ddl in [CREATE_CLIENTS, CREATE_PHONES] {
        debug!(sql = ddl.trim(), "create");
        sqlx::query(ddl).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn drop_schema(conn: &mut PgConnection) -> Result<()> {
    for ddl in DROP_TABLES {
        debug!(sql = ddl, "drop");
        sqlx::query(ddl).execute(&mut *conn).await?;
    }
    Ok(())
}
