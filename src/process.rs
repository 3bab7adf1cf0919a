use std::path::PathBuf;

use chrono::Local;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::fetch::{HttpFetcher, PageFetcher};
use crate::parse::{normalize_page, JobRecord, SeenJobs};
use crate::persist::{save_csv, save_json, RunOutput};
use crate::request::{ObservedPattern, PageRequest, SeoPagination};
use crate::settings::Settings;
use crate::token::{self, TokenGenerator};
use crate::{info_time, Error, Result};

/// Runs every configured filter against the live API.
pub async fn process_site(settings: Settings) -> Result<Vec<FilterReport>> {
    let fetcher = HttpFetcher::new(&settings.base_url, settings.request_timeout())?;
    let tokens = token::from_setting(settings.token.as_deref());
    let scraper = Scraper::new(settings, Box::new(fetcher), tokens);
    Ok(scraper.process_campaign().await)
}

/// Why a filter run stopped.
#[derive(Debug)]
pub enum Termination {
    /// An empty `jobDetails` list after the first page.
    EndOfResults { page: u32 },
    /// Reached `max_pages`.
    PageLimit,
    /// `jobDetails` was missing on a page past the tolerated threshold.
    MissingJobs { page: u32 },
    /// Token or fetch failure. Whatever was collected before `page` is still persisted.
    Aborted { page: u32, error: Error },
    /// The output directory couldn't be created, nothing was fetched.
    Skipped { error: Error },
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Aborted { .. } | Termination::Skipped { .. })
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Termination::Aborted { error, .. } | Termination::Skipped { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FilterReport {
    pub filter: String,
    pub output: Option<RunOutput>,
    pub pages_fetched: u32,
    pub raw_jobs: usize,
    pub unique_jobs: usize,
    /// Artifacts actually written. Empty collections don't produce a file.
    pub written: Vec<PathBuf>,
    pub termination: Termination,
}

enum PageOutcome {
    Continue,
    EndOfResults,
    MissingJobs,
}

/// Accumulators of one (keyword, filter) run. Never shared between filters.
#[derive(Debug)]
pub struct FilterRun {
    filter: String,
    output: RunOutput,
    pages_fetched: u32,
    raw_responses: Vec<Value>,
    job_details: Vec<Value>,
    jobs: Vec<JobRecord>,
    seen: SeenJobs,
}

impl FilterRun {
    fn new(filter: &str, output: RunOutput) -> Self {
        Self {
            filter: filter.into(),
            output,
            pages_fetched: 0,
            raw_responses: Vec::new(),
            job_details: Vec::new(),
            jobs: Vec::new(),
            seen: SeenJobs::new(),
        }
    }

    /// Stores the page body and its jobs, then decides whether the loop goes on.
    fn absorb(&mut self, page: u32, body: Value, missing_jobs_threshold: u32) -> PageOutcome {
        self.pages_fetched += 1;

        let outcome = match body.get("jobDetails").and_then(Value::as_array) {
            Some(jobs) => {
                info!(page, filter = %self.filter, jobs = jobs.len(), "found jobs");
                let fresh = normalize_page(jobs, &self.output.timestamp, &mut self.seen);
                self.jobs.extend(fresh);
                self.job_details.extend(jobs.iter().cloned());

                if jobs.is_empty() && page > 1 {
                    info!(page, filter = %self.filter, "empty jobDetails, assuming end of results");
                    PageOutcome::EndOfResults
                } else {
                    PageOutcome::Continue
                }
            }
            None => {
                warn!(page, filter = %self.filter, "'jobDetails' missing or not a list");
                if page > missing_jobs_threshold {
                    warn!(filter = %self.filter, "stopping filter, 'jobDetails' still missing");
                    PageOutcome::MissingJobs
                } else {
                    PageOutcome::Continue
                }
            }
        };

        self.raw_responses.push(body);
        outcome
    }

    /// Writes the three artifacts. A failing artifact is logged and the others are still written.
    fn persist(&self, csv_columns: &[String]) -> Vec<PathBuf> {
        let results = [
            (
                &self.output.raw_responses,
                save_json(&self.raw_responses, &self.output.raw_responses),
            ),
            (
                &self.output.job_details,
                save_json(&self.job_details, &self.output.job_details),
            ),
            (
                &self.output.csv,
                save_csv(&self.jobs, csv_columns, &self.output.csv),
            ),
        ];

        let mut written = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(true) => written.push(path.clone()),
                Ok(false) => {}
                Err(e) => error!(path = %path.display(), error = %e, "couldn't save artifact"),
            }
        }
        written
    }

    fn into_report(self, termination: Termination, written: Vec<PathBuf>) -> FilterReport {
        FilterReport {
            filter: self.filter,
            output: Some(self.output),
            pages_fetched: self.pages_fetched,
            raw_jobs: self.job_details.len(),
            unique_jobs: self.jobs.len(),
            written,
            termination,
        }
    }
}

/// Drives the filter loop. One instance per campaign.
pub struct Scraper {
    settings: Settings,
    fetcher: Box<dyn PageFetcher>,
    tokens: Box<dyn TokenGenerator>,
    pattern: Box<dyn SeoPagination>,
}

impl Scraper {
    pub fn new(
        settings: Settings,
        fetcher: Box<dyn PageFetcher>,
        tokens: Box<dyn TokenGenerator>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            tokens,
            pattern: Box::new(ObservedPattern),
        }
    }

    /// Replaces the `seoKey`/`sid` pagination pattern.
    pub fn with_pattern(mut self, pattern: Box<dyn SeoPagination>) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Processes the filters one after another. A failing filter never stops the campaign.
    pub async fn process_campaign(&self) -> Vec<FilterReport> {
        let start_time = Local::now();
        let filters = &self.settings.filters;
        info!(
            keyword = %self.settings.keyword,
            filters = ?filters,
            max_pages = self.settings.max_pages,
            output_dir = %self.settings.output_dir.display(),
            "Started scraping"
        );

        if filters.is_empty() {
            warn!("no CTC filters configured, nothing to do");
            return Vec::new();
        }

        let mut reports = Vec::with_capacity(filters.len());
        for (i, filter) in filters.iter().enumerate() {
            reports.push(self.process_filter(filter).await);

            if i + 1 < filters.len() {
                let delay = self.settings.inter_filter_delay();
                info!(delay_secs = delay.as_secs_f64(), "sleeping before next filter");
                sleep(delay).await;
            }
        }

        let failed = reports.iter().filter(|r| r.termination.is_failure()).count();
        info_time!(
            start_time,
            filters = reports.len(),
            failed,
            "All CTC filter processing finished"
        );
        reports
    }

    /// Runs the page loop for one filter and persists whatever it collected.
    pub async fn process_filter(&self, filter: &str) -> FilterReport {
        let start_time = Local::now();
        let keyword = &self.settings.keyword;
        info!(%keyword, filter, "Starting scrape");

        let output = match RunOutput::create(
            &self.settings.output_dir,
            keyword,
            filter,
            start_time,
        ) {
            Ok(output) => output,
            Err(error) => {
                error!(filter, %error, "skipping filter");
                return FilterReport {
                    filter: filter.into(),
                    output: None,
                    pages_fetched: 0,
                    raw_jobs: 0,
                    unique_jobs: 0,
                    written: Vec::new(),
                    termination: Termination::Skipped { error },
                };
            }
        };

        let mut run = FilterRun::new(filter, output);
        let termination = self.page_loop(&mut run).await;

        info!(
            filter,
            pages = run.raw_responses.len(),
            raw_jobs = run.job_details.len(),
            unique_jobs = run.jobs.len(),
            "Scraping loop finished"
        );
        let written = run.persist(&self.settings.csv_columns);
        info_time!(start_time, filter, ?termination, "Finished processing filter");

        run.into_report(termination, written)
    }

    async fn page_loop(&self, run: &mut FilterRun) -> Termination {
        let max_pages = self.settings.max_pages;
        for page in 1..=max_pages {
            let request = match PageRequest::new(
                &self.settings,
                self.pattern.as_ref(),
                self.tokens.as_ref(),
                &run.filter,
                page,
            ) {
                Ok(request) => request,
                Err(error) => {
                    error!(page, filter = %run.filter, %error, "token error, stopping filter");
                    return Termination::Aborted { page, error };
                }
            };

            info!(page, filter = %run.filter, "Fetching page");
            let body = match self.fetcher.fetch(&request).await {
                Ok(body) => body,
                Err(error) => {
                    log_fetch_error(page, &run.filter, &error);
                    return Termination::Aborted { page, error };
                }
            };

            match run.absorb(page, body, self.settings.missing_jobs_threshold) {
                PageOutcome::Continue => {}
                PageOutcome::EndOfResults => return Termination::EndOfResults { page },
                PageOutcome::MissingJobs => return Termination::MissingJobs { page },
            }

            if page < max_pages {
                let delay = self.settings.page_delay();
                info!(delay_secs = delay.as_secs_f64(), "Sleeping");
                sleep(delay).await;
            }
        }
        Termination::PageLimit
    }
}

fn log_fetch_error(page: u32, filter: &str, error: &Error) {
    match error {
        e if e.is_auth_or_rate_limit() => {
            error!(page, filter, error = %e, "likely token or rate limit issue, stopping filter")
        }
        Error::HttpStatus { .. } | Error::TransientNetwork(_) => {
            error!(page, filter, error = %error, "request failed, stopping filter")
        }
        Error::MalformedResponse(_) => {
            error!(page, filter, error = %error, "bad response body, stopping filter")
        }
        other => error!(page, filter, error = ?other, "unexpected error, stopping filter"),
    }
}
