use crate::country::Country;
use crate::error::Error;
use crate::phase::Phase;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";
pub const ENV_DATA_DIR: &str = "SUBPOLAR_DATA_DIR";

/// "top" listing time filter (`t=` query parameter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TopWindow {
    All,
    Year,
    Month,
    Week,
    Day,
}

impl TopWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TopWindow::All => "all",
            TopWindow::Year => "year",
            TopWindow::Month => "month",
            TopWindow::Week => "week",
            TopWindow::Day => "day",
        }
    }
}

/// API credentials, all three required.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            client_id: required_env(ENV_CLIENT_ID)?,
            client_secret: required_env(ENV_CLIENT_SECRET)?,
            user_agent: required_env(ENV_USER_AGENT)?,
        })
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn required_env(name: &'static str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::MissingEnv(name)),
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CollectorOptions {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub countries: Vec<Country>,
    pub phases: Vec<Phase>,
    pub progress: bool,

    // listing traversal
    pub page_size: u32,               // Reddit caps this at 100
    pub max_pages: usize,             // per listing
    pub top_windows: Vec<TopWindow>,
    pub stale_run: usize,             // consecutive too-old posts on "new" before stopping

    // retry / politeness
    pub max_retries: usize,           // transient errors, per page
    pub max_rate_limit_retries: usize,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub request_delay: Duration,      // between page requests
    pub pair_delay: Duration,         // between (country, phase) pairs
}

impl Default for CollectorOptions {
    fn default() -> Self {
        let data = PathBuf::from("./data");
        Self {
            raw_dir: data.join("raw"),
            clean_dir: data.join("clean"),
            processed_dir: data.join("processed"),
            data_dir: data,
            countries: Country::ALL.to_vec(),
            phases: Phase::ALL.to_vec(),
            progress: true,

            page_size: 100,
            max_pages: 10,
            top_windows: vec![
                TopWindow::All,
                TopWindow::Year,
                TopWindow::Month,
                TopWindow::Week,
                TopWindow::Day,
            ],
            stale_run: 10,

            max_retries: 3,
            max_rate_limit_retries: 8,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(120),
            // ~100 requests/minute is the OAuth allowance
            request_delay: Duration::from_millis(700),
            pair_delay: Duration::from_secs(2),
        }
    }
}

impl CollectorOptions {
    /// Apply `SUBPOLAR_DATA_DIR` when set.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(ENV_DATA_DIR) {
            Ok(dir) if !dir.trim().is_empty() => self.with_data_dir(dir.trim()),
            _ => self,
        }
    }
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let base = dir.as_ref().to_path_buf();
        self.raw_dir = base.join("raw");
        self.clean_dir = base.join("clean");
        self.processed_dir = base.join("processed");
        self.data_dir = base;
        self
    }
    pub fn with_countries<I: IntoIterator<Item = Country>>(mut self, countries: I) -> Self {
        self.countries = countries.into_iter().collect();
        self
    }
    pub fn with_phases<I: IntoIterator<Item = Phase>>(mut self, phases: I) -> Self {
        self.phases = phases.into_iter().collect();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_page_size(mut self, n: u32) -> Self {
        self.page_size = n.clamp(1, 100);
        self
    }
    pub fn with_max_pages(mut self, n: usize) -> Self {
        self.max_pages = n.max(1);
        self
    }
    pub fn with_top_windows<I: IntoIterator<Item = TopWindow>>(mut self, windows: I) -> Self {
        self.top_windows = windows.into_iter().collect();
        self
    }
    pub fn with_stale_run(mut self, n: usize) -> Self {
        self.stale_run = n.max(1);
        self
    }
    pub fn with_retries(mut self, transient: usize, rate_limited: usize) -> Self {
        self.max_retries = transient;
        self.max_rate_limit_retries = rate_limited;
        self
    }
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max.max(base);
        self
    }
    pub fn with_delays(mut self, request: Duration, pair: Duration) -> Self {
        self.request_delay = request;
        self.pair_delay = pair;
        self
    }
    /// Zero every sleep. Meant for tests and offline sources.
    pub fn without_delays(self) -> Self {
        self.with_backoff(Duration::ZERO, Duration::ZERO)
            .with_delays(Duration::ZERO, Duration::ZERO)
    }

    /// Exponential backoff for retry `attempt` (0-based), capped at `backoff_max`.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16) as u32).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }
}
