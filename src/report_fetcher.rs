use anyhow::Result;
use chrono::{Duration, Local};
use tracing::info;

use crate::config::Config;
use crate::database::Database;
use crate::error::PortalError;
use crate::ingest;
use crate::models::{FetchedReport, ProcessingWindow};
use crate::portal::PortalSession;
use crate::telegram::TelegramNotifier;

#[derive(Clone)]
pub struct ReportFetcher {
    config: Config,
    database: Database,
    telegram: TelegramNotifier,
}

impl ReportFetcher {
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        ingest::ensure_feed_dirs(&config.feeds)?;
        let database = Database::new(&config.database_url).await?;
        let telegram = TelegramNotifier::new();

        Ok(Self {
            config,
            database,
            telegram,
        })
    }

    pub fn schedule(&self) -> Option<&String> {
        self.config.schedule.as_ref()
    }

    /// One full fetch run: route raw drops, work out the window, drive the
    /// portal, then record and announce the outcome.
    pub async fn fetch_pending(&self) -> Result<()> {
        if let Some(raw_dir) = &self.config.raw_data_dir {
            let moved = ingest::distribute_raw_files(raw_dir, &self.config.feeds)?;
            if moved > 0 {
                info!("Routed {} raw file(s) into feed folders", moved);
            }
        }

        let yesterday = Local::now().date_naive() - Duration::days(1);
        let window = ProcessingWindow::for_run(
            yesterday,
            self.config.portal.trigger_weekday,
            self.config.portal.lookback_days,
        );

        let known = self.database.fetched_dates().await?;
        let refreshing = window
            .dates()
            .iter()
            .filter(|date| known.contains(date))
            .count();
        info!(
            "Fetching {} report date(s), {} already in the ledger",
            window.dates().len(),
            refreshing
        );

        self.telegram
            .send_message(&format!(
                "Turnover fetch started for {} date(s)",
                window.dates().len()
            ))
            .await;

        match self.run_portal(&window).await {
            Ok(reports) => {
                for report in &reports {
                    self.database.record_report(report).await?;
                }

                self.telegram
                    .send_message(&format!(
                        "Turnover fetch finished: {} file(s) downloaded",
                        reports.len()
                    ))
                    .await;
                info!("Fetch run complete: {} file(s)", reports.len());

                Ok(())
            }
            Err(err) => {
                self.telegram
                    .send_message(&format!("Turnover fetch FAILED: {err}"))
                    .await;

                Err(err.into())
            }
        }
    }

    async fn run_portal(&self, window: &ProcessingWindow) -> Result<Vec<FetchedReport>, PortalError> {
        let session =
            PortalSession::launch(&self.config.portal, &self.config.download_dir).await?;
        session.run(window).await
    }
}
