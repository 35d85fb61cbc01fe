use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

mod config;
mod database;
mod error;
mod ingest;
mod models;
mod portal;
mod report_fetcher;
mod telegram;

use report_fetcher::ReportFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting Turnover Report Fetcher");

    let fetcher = ReportFetcher::new().await?;

    let Some(schedule) = fetcher.schedule().cloned() else {
        // One-shot mode: a failed run must fail the process.
        return fetcher.fetch_pending().await;
    };

    // Run once immediately, then keep going on the schedule
    if let Err(e) = fetcher.fetch_pending().await {
        error!("Error during initial fetch: {}", e);
    }

    let sched = JobScheduler::new().await?;

    let job_fetcher = fetcher.clone();
    sched
        .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let fetcher = job_fetcher.clone();
            Box::pin(async move {
                if let Err(e) = fetcher.fetch_pending().await {
                    error!("Error during scheduled fetch: {}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started with cron '{}'", schedule);
    sched.start().await?;

    // Keep the program running
    loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
    }
}
