use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use std::collections::HashSet;
use tracing::info;

use crate::models::FetchedReport;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;

        // Run migrations
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    /// Report dates that already have a ledger row.
    pub async fn fetched_dates(&self) -> Result<HashSet<NaiveDate>> {
        let rows = sqlx::query("SELECT report_date FROM reports")
            .fetch_all(&self.pool)
            .await?;

        let dates = rows
            .into_iter()
            .map(|row| row.get::<NaiveDate, _>("report_date"))
            .collect();

        Ok(dates)
    }

    /// Records one fetched report, replacing any earlier row for the same
    /// date so a refetch overwrites here exactly like it does on disk.
    pub async fn record_report(&self, report: &FetchedReport) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reports WHERE report_date = ?")
            .bind(report.report_date)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO reports (report_date, file_path, fetched_at)
            VALUES (?, ?, ?)
            ",
        )
        .bind(report.report_date)
        .bind(&report.file_path)
        .bind(report.fetched_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}
