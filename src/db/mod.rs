//! Database module for SQLite persistence.
//!
//! SQLite holds every review, its flattened metadata tree, and the chat
//! around it.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviewers (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            first_name TEXT NOT NULL DEFAULT '',
            last_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL,
            affiliation TEXT NOT NULL DEFAULT ''
        );
        "#,
    )
    .execute(pool)
    .await?;

    // DOI uniqueness is a property of the ingestion flow, not of the schema.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            reviewer_id TEXT REFERENCES reviewers(id) ON DELETE SET NULL,
            doi TEXT NOT NULL,
            site_url TEXT NOT NULL,
            revision INTEGER NOT NULL,
            accepted INTEGER NOT NULL DEFAULT 0,
            date TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metadatablocks (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compounds (
            id TEXT PRIMARY KEY,
            metadatablock_id TEXT NOT NULL REFERENCES metadatablocks(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            accepted INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fields (
            id TEXT PRIMARY KEY,
            metadatablock_id TEXT REFERENCES metadatablocks(id) ON DELETE CASCADE,
            compound_id TEXT REFERENCES compounds(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            value TEXT NOT NULL,
            accepted INTEGER,
            history TEXT NOT NULL DEFAULT '{}',
            position INTEGER NOT NULL,
            CHECK ((metadatablock_id IS NULL) <> (compound_id IS NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            accepted INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            field_id TEXT REFERENCES fields(id) ON DELETE CASCADE,
            compound_id TEXT REFERENCES compounds(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            author TEXT,
            timestamp TEXT NOT NULL,
            CHECK ((field_id IS NULL) <> (compound_id IS NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_reviews_doi ON reviews(doi);
        CREATE INDEX IF NOT EXISTS idx_reviews_reviewer_id ON reviews(reviewer_id);
        CREATE INDEX IF NOT EXISTS idx_metadatablocks_review_id ON metadatablocks(review_id);
        CREATE INDEX IF NOT EXISTS idx_compounds_metadatablock_id ON compounds(metadatablock_id);
        CREATE INDEX IF NOT EXISTS idx_fields_metadatablock_id ON fields(metadatablock_id);
        CREATE INDEX IF NOT EXISTS idx_fields_compound_id ON fields(compound_id);
        CREATE INDEX IF NOT EXISTS idx_files_review_id ON files(review_id);
        CREATE INDEX IF NOT EXISTS idx_messages_field_id ON messages(field_id);
        CREATE INDEX IF NOT EXISTS idx_messages_compound_id ON messages(compound_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
