use crate::config::{CollectorOptions, TopWindow};
use crate::country::Country;
use crate::export::Exporter;
use crate::fetch::fetch_window;
use crate::merge::{MergeReport, MergeSource};
use crate::phase::Phase;
use crate::post::Post;
use crate::progress::PairProgress;
use crate::reddit::ListingSource;
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

/// Sequential collector over every configured (country, phase) pair.
#[derive(Clone, Debug, Default)]
pub struct RedditCollector {
    pub(crate) opts: CollectorOptions,
}

/// Counts for a pair that was fetched and exported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairReport {
    pub country: Country,
    pub phase: Phase,
    pub raw: usize,
    pub political: usize,
    pub pages: usize,
    pub stopped_early: bool,
}

/// A pair whose fetch or export was abandoned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompletePair {
    pub country: Country,
    pub phase: Phase,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub completed: Vec<PairReport>,
    pub incomplete: Vec<IncompletePair>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
    pub fn total_raw(&self) -> usize {
        self.completed.iter().map(|p| p.raw).sum()
    }
    pub fn total_political(&self) -> usize {
        self.completed.iter().map(|p| p.political).sum()
    }
}

impl RedditCollector {
    pub fn new() -> Self {
        Self { opts: CollectorOptions::default() }
    }
    pub fn with_options(opts: CollectorOptions) -> Self {
        Self { opts }
    }
    pub fn options(&self) -> &CollectorOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn countries<I: IntoIterator<Item = Country>>(mut self, c: I) -> Self { self.opts = self.opts.with_countries(c); self }
    pub fn phases<I: IntoIterator<Item = Phase>>(mut self, p: I) -> Self { self.opts = self.opts.with_phases(p); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn page_size(mut self, n: u32) -> Self { self.opts = self.opts.with_page_size(n); self }
    pub fn max_pages(mut self, n: usize) -> Self { self.opts = self.opts.with_max_pages(n); self }
    pub fn top_windows<I: IntoIterator<Item = TopWindow>>(mut self, w: I) -> Self { self.opts = self.opts.with_top_windows(w); self }
    pub fn stale_run(mut self, n: usize) -> Self { self.opts = self.opts.with_stale_run(n); self }
    pub fn retries(mut self, transient: usize, rate_limited: usize) -> Self { self.opts = self.opts.with_retries(transient, rate_limited); self }
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self { self.opts = self.opts.with_backoff(base, max); self }
    pub fn delays(mut self, request: Duration, pair: Duration) -> Self { self.opts = self.opts.with_delays(request, pair); self }
    pub fn without_delays(mut self) -> Self { self.opts = self.opts.without_delays(); self }

    pub fn exporter(&self) -> Exporter {
        Exporter::from_options(&self.opts)
    }

    fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.opts.raw_dir, &self.opts.clean_dir, &self.opts.processed_dir] {
            fs::create_dir_all(dir).with_context(|| format!("create data directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Fetch, filter and export every pair. A failing pair is recorded in the
    /// report and the run moves on; only directory setup errors abort.
    pub fn collect<S>(&self, source: &mut S) -> Result<RunReport>
    where
        S: ListingSource + ?Sized,
    {
        init_tracing_once();
        self.ensure_dirs()?;

        let pairs: Vec<(Country, Phase)> = self
            .opts
            .countries
            .iter()
            .flat_map(|&c| self.opts.phases.iter().map(move |&p| (c, p)))
            .collect();
        tracing::info!("collecting {} (country, phase) pairs", pairs.len());

        let progress = PairProgress::new(self.opts.progress, pairs.len() as u64);
        let mut report = RunReport::default();

        for (i, &(country, phase)) in pairs.iter().enumerate() {
            if i > 0 {
                sleep(self.opts.pair_delay);
            }
            progress.set_pair(format!("{} {}", country, phase));
            match self.collect_pair(&mut *source, country, phase) {
                Ok(pair) => report.completed.push(pair),
                Err(e) => {
                    tracing::error!("[{} {}] incomplete: {:#}", country, phase, e);
                    report.incomplete.push(IncompletePair { country, phase, reason: format!("{:#}", e) });
                }
            }
            progress.inc();
        }
        progress.finish("collection done");

        tracing::info!(
            "collected {} posts ({} political) across {} pairs; {} incomplete",
            report.total_raw(),
            report.total_political(),
            report.completed.len(),
            report.incomplete.len()
        );
        for miss in &report.incomplete {
            tracing::warn!("incomplete pair: {} {} ({})", miss.country, miss.phase, miss.reason);
        }
        Ok(report)
    }

    /// One pair: fetch in-window posts, classify, export raw and political together.
    pub fn collect_pair<S>(&self, source: &mut S, country: Country, phase: Phase) -> Result<PairReport>
    where
        S: ListingSource + ?Sized,
    {
        let window = phase.window();
        tracing::info!("[{} {}] r/{} {}", country, phase, country.subreddit(), window);

        let fetched = fetch_window(source, country, phase, &self.opts)
            .with_context(|| format!("fetch r/{} for {}", country.subreddit(), phase))?;
        tracing::info!(
            "[{} {}] {} unique posts in window ({} scanned over {} pages)",
            country, phase, fetched.posts.len(), fetched.scanned, fetched.pages
        );

        let political: Vec<Post> = fetched.posts.iter().filter(|p| p.is_political()).cloned().collect();
        if political.is_empty() {
            tracing::info!("[{} {}] no political posts", country, phase);
        }
        self.exporter().export_pair(country, phase, &fetched.posts, &political)?;

        Ok(PairReport {
            country,
            phase,
            raw: fetched.posts.len(),
            political: political.len(),
            pages: fetched.pages,
            stopped_early: fetched.stopped_early,
        })
    }

    /// Collect every pair, then build the unified dataset from the clean files.
    pub fn run<S>(&self, source: &mut S) -> Result<(RunReport, MergeReport)>
    where
        S: ListingSource + ?Sized,
    {
        let report = self.collect(source)?;
        let merged = self.merge(MergeSource::Clean)?;
        Ok((report, merged))
    }
}
