//! Explicit database provisioning for integration tests.
//!
//! Tests only touch a database when TEST_DATABASE_URL is set. Each test gets
//! its own freshly created database so tests can run in parallel and never
//! see each other's schema. DATABASE_URL is never read.

#![allow(dead_code)]

use std::path::Path;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Returns the base URL, or `None` when database tests should be skipped.
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())
}

/// A database that exists for the lifetime of a single test.
pub struct IsolatedTestDb {
    pool: PgPool,
    db_name: String,
    base_url: String,
}

impl IsolatedTestDb {
    /// Creates a uniquely named database, or returns `None` without
    /// TEST_DATABASE_URL.
    pub async fn create(test_name: &str) -> Option<Self> {
        let Some(base_url) = database_url() else {
            eprintln!("skipping {}: TEST_DATABASE_URL not set", test_name);
            return None;
        };

        // UUID suffix prevents collisions when tests run in parallel
        let db_name = format!(
            "migrathor_test_{}_{}",
            sanitize_db_name(test_name),
            uuid::Uuid::new_v4().simple()
        );

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&base_url)
            .await
            .expect("connect to TEST_DATABASE_URL");

        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin)
            .await
            .expect("create test database");
        admin.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&replace_db_name(&base_url, &db_name))
            .await
            .expect("connect to test database");

        Some(Self {
            pool,
            db_name,
            base_url,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn execute(&self, sql: &str) {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .expect("execute test setup SQL");
    }

    /// Whether a table exists in the current schema.
    pub async fn table_exists(&self, table: &str) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_tables WHERE schemaname = current_schema() AND tablename = $1)",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .expect("query pg_tables")
    }

    /// Whether `table` has a column called `column`.
    pub async fn column_exists(&self, table: &str, column: &str) -> bool {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await
        .expect("query information_schema")
    }

    /// Migration names in the history table, in insertion order.
    pub async fn history(&self, table: &str) -> Vec<String> {
        sqlx::query_scalar::<_, String>(&format!(
            "SELECT migration FROM {} ORDER BY id ASC",
            table
        ))
        .fetch_all(&self.pool)
        .await
        .expect("query history table")
    }

    /// Drops the test database.
    pub async fn cleanup(self) {
        self.pool.close().await;

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .expect("connect to TEST_DATABASE_URL");

        // Force disconnect other connections and drop
        let _ = sqlx::query(&format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
            self.db_name
        ))
        .execute(&admin)
        .await;

        let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\"", self.db_name))
            .execute(&admin)
            .await;
    }
}

/// Writes `files` into `dir`.
pub fn write_migrations(dir: &Path, files: &[(&str, &str)]) {
    for (name, sql) in files {
        std::fs::write(dir.join(name), sql).expect("write migration file");
    }
}

/// Sanitize a test name for use in a database name.
fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(32)
        .collect::<String>()
        .to_lowercase()
}

/// Replace the database name in a connection URL.
fn replace_db_name(url: &str, new_db: &str) -> String {
    if let Some(idx) = url.rfind('/') {
        let base = &url[..=idx];
        if let Some(query_idx) = url[idx + 1..].find('?') {
            let query = &url[idx + 1 + query_idx..];
            format!("{}{}{}", base, new_db, query)
        } else {
            format!("{}{}", base, new_db)
        }
    } else {
        format!("{}/{}", url, new_db)
    }
}
