//! Process wide settings. Defaults mirror the search the scraper was first written for,
//! an optional JSON file is layered over them and the CLI/environment goes on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::request::{Headers, Params};
use crate::{Error, Result};

const BASE_URL: &str = "https://www.naukri.com/jobapi/v3/search";
const KEYWORD: &str = "sre";
const CTC_FILTERS: &[&str] = &["25to50"];
const EXPERIENCE: &str = "6";
const MAX_PAGES_PER_FILTER: u32 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 45;
const FETCH_DELAY_BASE: f64 = 2.5;
const FETCH_DELAY_RANDOM: f64 = 2.0;
const INTER_FILTER_DELAY: f64 = 5.0;
/// Pages past this number without a `jobDetails` list end the filter.
const MISSING_JOBS_THRESHOLD: u32 = 5;
const OUTPUT_DIR: &str = "output";
const BASE_SID: &str = "17457332530584631";
const LOCATION_SEO: &str = "in-bangalore";
const CSV_COLUMNS: &[&str] = &[
    "jobId",
    "title",
    "companyName",
    "experience",
    "salary",
    "location",
    "tagsAndSkills",
    "jobDescription",
    "jdURL",
    "fetchTimestamp",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub keyword: String,
    pub filters: Vec<String>,
    pub experience: String,
    pub base_url: String,
    pub max_pages: u32,
    pub request_timeout_secs: u64,
    /// Seconds slept after every page.
    pub fetch_delay_base: f64,
    /// Upper bound (exclusive) of the jitter added to `fetch_delay_base`.
    pub fetch_delay_random: f64,
    pub inter_filter_delay: f64,
    pub missing_jobs_threshold: u32,
    pub output_dir: PathBuf,
    pub base_params: Params,
    pub base_headers: Headers,
    pub base_sid: String,
    pub location_seo: String,
    pub csv_columns: Vec<String>,
    pub token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let base_params = [
            ("noOfResults", "20"),
            ("urlType", "search_by_key_loc"),
            ("searchType", "adv"),
            ("keyword", KEYWORD),
            ("sort", "r"),
            ("experience", EXPERIENCE),
            ("k", KEYWORD),
            ("nignbevent_src", "jobsearchDeskGNB"),
            ("src", "jobsearchDesk"),
            ("latLong", ""),
        ];
        let base_headers = [
            ("accept", "application/json"),
            ("appid", "109"),
            ("clientid", "d3skt0p"),
            ("gid", "LOCATION,INDUSTRY,EDUCATION,FAREA_ROLE"),
            ("host", "www.naukri.com"),
            ("systemid", "Naukri"),
            ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36"),
            ("sec-ch-ua", "\"Google Chrome\";v=\"135\", \"Not-A.Brand\";v=\"8\", \"Chromium\";v=\"135\""),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", "\"Windows\""),
        ];

        Self {
            keyword: KEYWORD.into(),
            filters: CTC_FILTERS.iter().map(|f| f.to_string()).collect(),
            experience: EXPERIENCE.into(),
            base_url: BASE_URL.into(),
            max_pages: MAX_PAGES_PER_FILTER,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            fetch_delay_base: FETCH_DELAY_BASE,
            fetch_delay_random: FETCH_DELAY_RANDOM,
            inter_filter_delay: INTER_FILTER_DELAY,
            missing_jobs_threshold: MISSING_JOBS_THRESHOLD,
            output_dir: OUTPUT_DIR.into(),
            base_params: pairs(&base_params),
            base_headers: pairs(&base_headers),
            base_sid: BASE_SID.into(),
            location_seo: LOCATION_SEO.into(),
            csv_columns: CSV_COLUMNS.iter().map(|c| c.to_string()).collect(),
            token: None,
        }
    }
}

fn pairs(entries: &[(&str, &str)]) -> Params {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Settings {
    /// Reads a JSON settings file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("can't read {}: {e}", path.display())))?;
        let settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid settings in {}: {e}", path.display())))?;
        Ok(settings.synced())
    }

    /// Defaults or the `--config` file, with the remaining CLI flags applied on top.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(keyword) = &cli.keyword {
            settings.keyword = keyword.clone();
        }
        if let Some(filters) = &cli.filters {
            settings.filters = filters
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        if let Some(max_pages) = cli.max_pages {
            settings.max_pages = max_pages;
        }
        if let Some(output_dir) = &cli.output_dir {
            settings.output_dir = output_dir.clone();
        }
        if let Some(timeout) = cli.timeout_secs {
            settings.request_timeout_secs = timeout;
        }
        if let Some(token) = &cli.token {
            settings.token = Some(token.clone());
        }

        Ok(settings.synced())
    }

    /// Keeps the keyword and experience inside `base_params` in line with the top level values.
    pub fn synced(mut self) -> Self {
        self.base_params.insert("keyword".into(), self.keyword.clone());
        self.base_params.insert("k".into(), self.keyword.clone());
        self.base_params.insert("experience".into(), self.experience.clone());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inter_filter_delay(&self) -> Duration {
        secs(self.inter_filter_delay)
    }

    /// Base delay plus a jitter taken from the fractional wall clock, in `[0, fetch_delay_random)`.
    pub fn page_delay(&self) -> Duration {
        let now = chrono::Local::now();
        let epoch_secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6;
        let jitter = if self.fetch_delay_random > 0.0 {
            epoch_secs % self.fetch_delay_random
        } else {
            0.0
        };
        secs(self.fetch_delay_base + jitter)
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

/// Command-line interface. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "naukri-scrap", about = "Scrape job search results per CTC filter")]
pub struct Cli {
    /// JSON settings file layered over the built-in defaults
    #[arg(long, env = "NAUKRI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Search keyword
    #[arg(long, env = "NAUKRI_KEYWORD")]
    pub keyword: Option<String>,

    /// CTC filters to process, comma separated
    #[arg(long, env = "NAUKRI_FILTERS", value_delimiter = ',')]
    pub filters: Option<Vec<String>>,

    /// Maximum pages fetched per filter
    #[arg(long, env = "NAUKRI_MAX_PAGES")]
    pub max_pages: Option<u32>,

    /// Root directory for the per filter run directories
    #[arg(long, env = "NAUKRI_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "NAUKRI_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// `nkparam` value captured from a browser session
    #[arg(long, env = "NAUKRI_TOKEN")]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_the_reference_search() {
        let settings = Settings::default();
        assert_eq!(settings.keyword, "sre");
        assert_eq!(settings.filters, vec!["25to50"]);
        assert_eq!(settings.max_pages, 500);
        assert_eq!(settings.request_timeout(), Duration::from_secs(45));
        assert_eq!(settings.csv_columns.len(), 10);
        assert_eq!(settings.csv_columns[0], "jobId");
        assert_eq!(settings.base_params["noOfResults"], "20");
        assert!(settings.token.is_none());
    }

    #[test]
    fn page_delay_is_bounded() {
        let settings = Settings::default();
        for _ in 0..10 {
            let delay = settings.page_delay().as_secs_f64();
            assert!((2.5..4.5).contains(&delay), "{delay}");
        }
    }

    #[test]
    fn zero_delays_do_not_sleep() {
        let settings = Settings {
            fetch_delay_base: 0.0,
            fetch_delay_random: 0.0,
            inter_filter_delay: 0.0,
            ..Settings::default()
        };
        assert_eq!(settings.page_delay(), Duration::ZERO);
        assert_eq!(settings.inter_filter_delay(), Duration::ZERO);
    }

    #[test]
    fn file_overrides_only_present_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"keyword": "devops", "filters": ["3to6", "6to10"], "experience": "3"}}"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.keyword, "devops");
        assert_eq!(settings.filters, vec!["3to6", "6to10"]);
        assert_eq!(settings.max_pages, 500);
        assert_eq!(settings.base_params["keyword"], "devops");
        assert_eq!(settings.base_params["k"], "devops");
        assert_eq!(settings.base_params["experience"], "3");
    }

    #[test]
    fn broken_or_missing_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"keyword": "devops", "#).unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");

        let dir = tempfile::tempdir().unwrap();
        let err = Settings::from_file(dir.path().join("absent.json")).unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("absent.json"), "{msg}"),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn cli_flags_win_over_defaults() {
        let cli = Cli::parse_from([
            "naukri-scrap",
            "--keyword",
            "rust",
            "--filters",
            "0to3,3to6",
            "--max-pages",
            "4",
            "--token",
            "abc",
        ]);
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(settings.keyword, "rust");
        assert_eq!(settings.filters, vec!["0to3", "3to6"]);
        assert_eq!(settings.max_pages, 4);
        assert_eq!(settings.token.as_deref(), Some("abc"));
        assert_eq!(settings.base_params["k"], "rust");
    }
}
