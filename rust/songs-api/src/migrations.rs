//! Embedded, versioned schema migrations applied at startup.

use anyhow::{Context, Result};
use diesel::sql_types::BigInt;
use diesel::QueryableByName;
use diesel_async::{AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    /// Migration body plus its bookkeeping row, wrapped in one transaction.
    fn script(&self) -> String {
        format!(
            "BEGIN;\n{}\nINSERT INTO schema_migrations (version, name) VALUES ({}, '{}');\nCOMMIT;",
            self.sql.trim_end(),
            self.version,
            self.name.replace('\'', "''"),
        )
    }
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_songs",
    sql: include_str!("../migrations/0001_create_songs.sql"),
}];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
);";

#[derive(QueryableByName)]
struct AppliedVersion {
    #[diesel(sql_type = BigInt)]
    version: i64,
}

/// Applies every migration not yet recorded and returns the versions run.
pub async fn run(conn: &mut AsyncPgConnection) -> Result<Vec<i64>> {
    conn.batch_execute(TRACKING_TABLE)
        .await
        .context("failed to create schema_migrations table")?;

    let applied: HashSet<i64> = diesel::sql_query("SELECT version FROM schema_migrations")
        .load::<AppliedVersion>(conn)
        .await
        .context("failed to read applied migrations")?
        .into_iter()
        .map(|row| row.version)
        .collect();

    let mut ran = Vec::new();
    for migration in pending(MIGRATIONS, &applied) {
        conn.batch_execute(&migration.script())
            .await
            .with_context(|| {
                format!(
                    "failed to apply migration {} ({})",
                    migration.version, migration.name
                )
            })?;
        info!(version = migration.version, name = migration.name, "applied migration");
        ran.push(migration.version);
    }

    if ran.is_empty() {
        debug!("schema up to date");
    }
    Ok(ran)
}

fn pending<'a>(
    migrations: &'a [Migration],
    applied: &'a HashSet<i64>,
) -> impl Iterator<Item = &'a Migration> + 'a {
    migrations
        .iter()
        .filter(move |migration| !applied.contains(&migration.version))
}
