//! CSV dataset files: deterministic per-(country, phase) paths, staged writes
//! that replace the previous run's file, and typed read-back.

use crate::config::CollectorOptions;
use crate::country::Country;
use crate::phase::Phase;
use crate::post::{Post, PostRow};
use crate::util::{promote, staging_path};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Which collection a dataset file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetKind {
    /// Every in-window post.
    Raw,
    /// Only posts the keyword classifier marked political.
    Clean,
}

#[derive(Clone, Debug)]
pub struct Exporter {
    raw_dir: PathBuf,
    clean_dir: PathBuf,
}

impl Exporter {
    pub fn new(raw_dir: impl AsRef<Path>, clean_dir: impl AsRef<Path>) -> Self {
        Self { raw_dir: raw_dir.as_ref().to_path_buf(), clean_dir: clean_dir.as_ref().to_path_buf() }
    }

    pub fn from_options(opts: &CollectorOptions) -> Self {
        Self::new(&opts.raw_dir, &opts.clean_dir)
    }

    /// `raw/<country>_<phase>.csv` or `clean/<country>_<phase>_politics.csv`.
    pub fn path(&self, country: Country, phase: Phase, kind: DatasetKind) -> PathBuf {
        match kind {
            DatasetKind::Raw => self.raw_dir.join(format!("{}_{}.csv", country, phase)),
            DatasetKind::Clean => self.clean_dir.join(format!("{}_{}_politics.csv", country, phase)),
        }
    }

    /// Write `posts` for one pair, replacing any earlier file. Posts tagged for
    /// another pair, or dated outside the phase window, are refused.
    pub fn export(&self, country: Country, phase: Phase, kind: DatasetKind, posts: &[Post]) -> Result<PathBuf> {
        let rows = rows_for(country, phase, posts)?;
        let path = self.path(country, phase, kind);
        let n = write_csv(&path, &PostRow::HEADERS, &rows)?;
        tracing::info!("saved {} {:?} posts to {}", n, kind, path.display());
        Ok(path)
    }

    /// Write the raw and clean files of one pair together. Both are staged
    /// before either is promoted, so a failure while writing leaves the
    /// previous run's pair untouched. If the clean file cannot be promoted
    /// after the raw one was, the stale clean file is removed rather than left
    /// next to the new raw data.
    pub fn export_pair(&self, country: Country, phase: Phase, raw: &[Post], political: &[Post]) -> Result<(PathBuf, PathBuf)> {
        let raw_rows = rows_for(country, phase, raw)?;
        let clean_rows = rows_for(country, phase, political)?;
        let raw_path = self.path(country, phase, DatasetKind::Raw);
        let clean_path = self.path(country, phase, DatasetKind::Clean);

        let raw_tmp = stage_csv(&raw_path, &PostRow::HEADERS, &raw_rows)?;
        let clean_tmp = match stage_csv(&clean_path, &PostRow::HEADERS, &clean_rows) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&raw_tmp);
                return Err(e);
            }
        };

        if let Err(e) = promote(&raw_tmp, &raw_path) {
            let _ = fs::remove_file(&raw_tmp);
            let _ = fs::remove_file(&clean_tmp);
            return Err(e);
        }
        if let Err(e) = promote(&clean_tmp, &clean_path) {
            let _ = fs::remove_file(&clean_tmp);
            if clean_path.is_file() {
                let _ = fs::remove_file(&clean_path);
            }
            return Err(e).with_context(|| format!("{} was replaced but {} was not", raw_path.display(), clean_path.display()));
        }
        tracing::info!("saved {} raw posts to {}", raw_rows.len(), raw_path.display());
        tracing::info!("saved {} political posts to {}", clean_rows.len(), clean_path.display());
        Ok((raw_path, clean_path))
    }
}

fn rows_for(country: Country, phase: Phase, posts: &[Post]) -> Result<Vec<PostRow>> {
    let window = phase.window();
    for p in posts {
        if p.country != country || p.phase != phase {
            bail!("post {} is tagged {}/{}, not {}/{}", p.id, p.country, p.phase, country, phase);
        }
        if !window.contains(p.created) {
            bail!("post {} created {} lies outside {} window {}", p.id, p.created, phase, window);
        }
    }
    posts.iter().map(Post::to_row).collect()
}

/// Write a header row then `rows`, via a staging file promoted over `path`.
/// The header is written even when `rows` is empty.
pub fn write_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<usize> {
    let tmp = stage_csv(path, headers, rows)?;
    promote(&tmp, path)?;
    Ok(rows.len())
}

/// Write the staging file for `path` and return its location. A partial
/// staging file is removed on failure.
fn stage_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = staging_path(path);
    let written = (|| -> Result<()> {
        let f = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(BufWriter::new(f));
        w.write_record(headers)?;
        for row in rows {
            w.serialize(row).with_context(|| format!("write row to {}", tmp.display()))?;
        }
        let mut inner = w.into_inner().map_err(|e| anyhow::anyhow!("flush {}: {}", tmp.display(), e.error()))?;
        inner.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (i, rec) in rdr.deserialize::<T>().enumerate() {
        let row = rec.with_context(|| format!("{}: row {}", path.display(), i + 1))?;
        out.push(row);
    }
    Ok(out)
}
