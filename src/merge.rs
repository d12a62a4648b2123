//! Merge the per-(country, phase) dataset files into one unified CSV, deriving
//! `full_text` and `clean_text` and re-running the keyword classifier.

use crate::classify::classify;
use crate::export::{read_csv, write_csv, DatasetKind};
use crate::phase::Phase;
use crate::pipeline::RedditCollector;
use crate::post::{clean_text, full_text, PostRow, UnifiedRow};
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Which per-pair files feed the unified dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeSource {
    /// `clean/*_politics.csv` → `processed/unified_posts.csv`
    #[default]
    Clean,
    /// `raw/*.csv` → `processed/unified_raw.csv`
    Raw,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub output: PathBuf,
    pub rows: usize,
    pub political: usize,
    pub files_read: usize,
    pub missing: Vec<PathBuf>,
    /// Files that exist but could not be loaded, with the reason.
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Derive the unified columns for one stored row. The country must be known.
pub fn unify_row(row: PostRow) -> Result<UnifiedRow> {
    let full = full_text(&row.title, &row.selftext);
    let is_political = classify(&full, &row.country).with_context(|| format!("classify post {}", row.id))?;
    if row.is_political != is_political {
        tracing::debug!("post {}: is_political {} -> {}", row.id, row.is_political, is_political);
    }
    Ok(UnifiedRow {
        clean_text: clean_text(&full),
        full_text: full,
        is_political,
        id: row.id,
        title: row.title,
        selftext: row.selftext,
        created: row.created,
        country: row.country,
        phase: row.phase,
        score: row.score,
        flair: row.flair,
        author: row.author,
        num_comments: row.num_comments,
        upvote_ratio: row.upvote_ratio,
        permalink: row.permalink,
        url: row.url,
        subreddit: row.subreddit,
        is_self: row.is_self,
        over_18: row.over_18,
    })
}

/// Rows whose timestamp is outside their phase window would break the dataset
/// invariant; they only appear if a file was edited by hand.
fn in_window(row: &PostRow) -> Result<bool> {
    let phase: Phase = row.phase.parse()?;
    Ok(phase.window().contains(row.created_at()?))
}

/// Read one per-pair file and unify its in-window rows. Any undecodable row,
/// unknown country or bad timestamp fails the whole file.
fn load_pair(path: &Path) -> Result<Vec<UnifiedRow>> {
    let stored: Vec<PostRow> = read_csv(path)?;
    tracing::info!("loaded {} rows from {}", stored.len(), path.display());
    let mut out = Vec::with_capacity(stored.len());
    for row in stored {
        if !in_window(&row).with_context(|| format!("post {}", row.id))? {
            tracing::warn!("{}: post {} dated {} is outside {}; dropped", path.display(), row.id, row.created, row.phase);
            continue;
        }
        out.push(unify_row(row)?);
    }
    Ok(out)
}

impl RedditCollector {
    pub fn unified_path(&self, source: MergeSource) -> PathBuf {
        let name = match source {
            MergeSource::Clean => "unified_posts.csv",
            MergeSource::Raw => "unified_raw.csv",
        };
        self.opts.processed_dir.join(name)
    }

    /// Concatenate every available per-pair file in configuration order and
    /// write the unified dataset. Missing and unreadable files are skipped
    /// with a warning and listed in the report.
    pub fn merge(&self, source: MergeSource) -> Result<MergeReport> {
        init_tracing_once();
        let kind = match source {
            MergeSource::Clean => DatasetKind::Clean,
            MergeSource::Raw => DatasetKind::Raw,
        };
        let exporter = self.exporter();
        let mut report = MergeReport { output: self.unified_path(source), ..Default::default() };
        let mut rows: Vec<UnifiedRow> = Vec::new();

        for &country in &self.opts.countries {
            for &phase in &self.opts.phases {
                let path = exporter.path(country, phase, kind);
                if !path.exists() {
                    tracing::warn!("[{} {}] no dataset at {}; skipped", country, phase, path.display());
                    report.missing.push(path);
                    continue;
                }
                match load_pair(&path) {
                    Ok(pair_rows) => {
                        report.files_read += 1;
                        rows.extend(pair_rows);
                    }
                    Err(e) => {
                        tracing::warn!("[{} {}] cannot load {}: {:#}; skipped", country, phase, path.display(), e);
                        report.unreadable.push((path, format!("{:#}", e)));
                    }
                }
            }
        }

        report.rows = rows.len();
        report.political = rows.iter().filter(|r| r.is_political).count();
        write_csv(&report.output, &UnifiedRow::HEADERS, &rows)?;
        tracing::info!(
            "unified dataset: {} rows ({} political) from {} files -> {}",
            report.rows,
            report.political,
            report.files_read,
            report.output.display()
        );
        if !report.unreadable.is_empty() {
            tracing::warn!("{} dataset files could not be read", report.unreadable.len());
        }
        Ok(report)
    }
}
