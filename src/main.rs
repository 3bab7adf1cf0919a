use chrono::Local;
use clap::Parser;
use naukri_scrap::{info_time, process_site, Cli, Result, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "naukri_scrap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let start_time = Local::now();
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;

    let reports = process_site(settings).await?;
    for report in &reports {
        match report.termination.error() {
            Some(error) => tracing::warn!(
                filter = %report.filter,
                pages = report.pages_fetched,
                unique_jobs = report.unique_jobs,
                %error,
                "filter stopped early"
            ),
            None => tracing::info!(
                filter = %report.filter,
                pages = report.pages_fetched,
                unique_jobs = report.unique_jobs,
                written = report.written.len(),
                "filter done"
            ),
        }
    }
    info_time!(start_time, "Full program time");

    Ok(())
}
