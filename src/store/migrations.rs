//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! Ledgers created before version tracking already hold `email_reviews`;
//! V1 uses `IF NOT EXISTS` throughout so it is safe to apply over them, and
//! V2 backfills the `risk_flag` column those ledgers may lack.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS email_reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT,
                sender TEXT,
                subject TEXT,
                category TEXT,
                confidence REAL,
                original_body TEXT,
                suggested_reply TEXT,
                status TEXT,
                reviewer_notes TEXT,
                received_date TEXT,
                created_at TEXT
            );

            CREATE TABLE IF NOT EXISTS scenario_templates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scenario_key TEXT NOT NULL UNIQUE,
                tags TEXT NOT NULL DEFAULT '',
                language TEXT NOT NULL DEFAULT 'en',
                title TEXT NOT NULL DEFAULT '',
                reply_template TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "review_risk_flag",
        // Handled specially: the column may already exist.
        sql: "ALTER TABLE email_reviews ADD COLUMN risk_flag TEXT",
    },
    Migration {
        version: 3,
        name: "review_indexes",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_email_reviews_created_at ON email_reviews(created_at);
            CREATE INDEX IF NOT EXISTS idx_email_reviews_status ON email_reviews(status);
        "#,
    },
];

/// Run all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let already_applied = migration.name == "review_risk_flag"
            && column_exists(conn, "email_reviews", "risk_flag").await?;
        if already_applied {
            tracing::debug!("risk_flag column already present, recording V2 only");
        } else {
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
        }
        seed_version(conn, migration.version, migration.name).await?;
    }

    let version = get_current_version(conn).await?;
    tracing::debug!(version, "Database migrations complete");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

/// Whether `table` has a column called `column`.
async fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"),
            libsql::params![column],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to inspect {table}: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to inspect {table}: {e}")))?;

    Ok(row.and_then(|r| r.get::<i64>(0).ok()).unwrap_or(0) > 0)
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    async fn count(conn: &Connection, sql: &str) -> i64 {
        let mut rows = conn.query(sql, ()).await.unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test]
    async fn fresh_database_reaches_latest_version() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        assert_eq!(get_current_version(&conn).await.unwrap(), 3);
        assert!(column_exists(&conn, "email_reviews", "risk_flag").await.unwrap());
        assert!(column_exists(&conn, "scenario_templates", "scenario_key").await.unwrap());
    }

    #[tokio::test]
    async fn migration_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let conn = test_conn().await;
        let fut = run_migrations(&conn);
        assert_send(&fut);
        fut.await.unwrap();
    }

    #[tokio::test]
    async fn running_twice_is_a_no_op() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM _migrations").await, 3);
    }

    #[tokio::test]
    async fn ledger_without_tracking_is_adopted() {
        let conn = test_conn().await;

        // Ledger written before version tracking, risk_flag already present.
        conn.execute_batch(
            "CREATE TABLE email_reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT, sender TEXT, subject TEXT, category TEXT,
                confidence REAL, original_body TEXT, suggested_reply TEXT,
                status TEXT, reviewer_notes TEXT, received_date TEXT,
                risk_flag TEXT, created_at TEXT
            );
            INSERT INTO email_reviews (email_id, category, risk_flag, created_at)
                VALUES ('old-1', 'Other', 'high', '2026-02-06T09:00:00');",
        )
        .await
        .unwrap();

        run_migrations(&conn).await.unwrap();

        assert_eq!(get_current_version(&conn).await.unwrap(), 3);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM email_reviews").await, 1);
    }

    #[tokio::test]
    async fn ledger_without_risk_flag_gets_column() {
        let conn = test_conn().await;
        conn.execute_batch(
            "CREATE TABLE email_reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT, sender TEXT, subject TEXT, category TEXT,
                confidence REAL, original_body TEXT, suggested_reply TEXT,
                status TEXT, reviewer_notes TEXT, received_date TEXT, created_at TEXT
            );",
        )
        .await
        .unwrap();

        run_migrations(&conn).await.unwrap();
        assert!(column_exists(&conn, "email_reviews", "risk_flag").await.unwrap());
    }

    #[tokio::test]
    async fn version_tracking() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT version, name FROM _migrations ORDER BY version", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
        assert_eq!(row.get::<String>(1).unwrap(), "initial_schema");
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(1).unwrap(), "review_risk_flag");
    }
}
