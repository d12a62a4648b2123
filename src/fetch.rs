//! Window-filtered retrieval for one (country, phase) pair.
//!
//! Reddit has no date-range query, so the fetcher pages through the "new"
//! listing and each configured "top" listing, keeps posts whose timestamp
//! falls inside the phase window, and dedupes by id across listings.
//!
//! "new" is most-recent-first: after `stale_run` consecutive posts older than
//! the window start the rest of that listing is skipped. "new" only reaches
//! back ~1000 posts, so older windows are covered mostly by "top". Nothing here
//! guarantees a complete window; the result is whatever the listings expose.

use crate::config::CollectorOptions;
use crate::country::Country;
use crate::error::FetchError;
use crate::phase::{Phase, PhaseWindow};
use crate::post::Post;
use crate::reddit::{Listing, ListingPost, ListingSource, Page};
use ahash::AHashSet;
use std::thread::sleep;

/// In-window posts for one pair, plus traversal counters for the run report.
#[derive(Clone, Debug, Default)]
pub struct FetchOutcome {
    pub posts: Vec<Post>,
    pub pages: usize,
    pub scanned: usize,
    pub stopped_early: bool,
}

/// Every listing the fetcher walks, in order.
pub fn listings_for(opts: &CollectorOptions) -> Vec<Listing> {
    let mut v = vec![Listing::New];
    v.extend(opts.top_windows.iter().copied().map(Listing::Top));
    v
}

pub fn fetch_window<S>(
    source: &mut S,
    country: Country,
    phase: Phase,
    opts: &CollectorOptions,
) -> Result<FetchOutcome, FetchError>
where
    S: ListingSource + ?Sized,
{
    let window = phase.window();
    let subreddit = country.subreddit();
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut out = FetchOutcome::default();

    for listing in listings_for(opts) {
        let before = out.posts.len();
        let mut keep = |lp: ListingPost| {
            if seen.insert(lp.id.clone()) {
                out.posts.push(tag(lp, country, phase));
            }
        };
        let walk = walk_listing(&mut *source, subreddit, listing, window, opts, &mut keep)?;
        out.pages += walk.pages;
        out.scanned += walk.scanned;
        out.stopped_early |= walk.stopped_early;
        tracing::debug!(
            "r/{} {}: {} pages, {} scanned, {} new in window",
            subreddit, listing, walk.pages, walk.scanned, out.posts.len() - before
        );
    }

    Ok(out)
}

fn tag(lp: ListingPost, country: Country, phase: Phase) -> Post {
    Post {
        id: lp.id,
        title: lp.title,
        selftext: lp.selftext,
        created: lp.created,
        country,
        phase,
        score: lp.score,
        flair: lp.flair,
        author: lp.author,
        num_comments: lp.num_comments,
        upvote_ratio: lp.upvote_ratio,
        permalink: lp.permalink,
        url: lp.url,
        subreddit: lp.subreddit,
        is_self: lp.is_self,
        over_18: lp.over_18,
    }
}

#[derive(Default)]
struct Walk {
    pages: usize,
    scanned: usize,
    stopped_early: bool,
}

fn walk_listing<S, F>(
    source: &mut S,
    subreddit: &str,
    listing: Listing,
    window: PhaseWindow,
    opts: &CollectorOptions,
    keep: &mut F,
) -> Result<Walk, FetchError>
where
    S: ListingSource + ?Sized,
    F: FnMut(ListingPost),
{
    let mut walk = Walk::default();
    let mut after: Option<String> = None;
    let mut stale = 0usize;

    for page_no in 0..opts.max_pages {
        if page_no > 0 {
            sleep(opts.request_delay);
        }
        let page = fetch_with_retry(&mut *source, subreddit, listing, after.as_deref(), opts)?;
        walk.pages += 1;

        for lp in page.posts {
            walk.scanned += 1;
            if window.contains(lp.created) {
                stale = 0;
                keep(lp);
            } else if listing == Listing::New && window.is_before(lp.created) {
                stale += 1;
                if stale >= opts.stale_run {
                    tracing::debug!("r/{} new: passed window start ({}), stopping", subreddit, window.start);
                    walk.stopped_early = true;
                    return Ok(walk);
                }
            } else {
                stale = 0;
            }
        }

        match page.after {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }
    Ok(walk)
}

/// Fetch one page, backing off on rate limits and retrying transient failures
/// on the same cursor.
fn fetch_with_retry<S>(
    source: &mut S,
    subreddit: &str,
    listing: Listing,
    after: Option<&str>,
    opts: &CollectorOptions,
) -> Result<Page, FetchError>
where
    S: ListingSource + ?Sized,
{
    let mut transient = 0usize;
    let mut limited = 0usize;
    loop {
        match source.fetch_page(subreddit, listing, after, opts.page_size) {
            Ok(page) => return Ok(page),
            Err(FetchError::RateLimited { retry_after }) if limited < opts.max_rate_limit_retries => {
                let wait = retry_after
                    .map(|d| d.min(opts.backoff_max))
                    .unwrap_or_else(|| opts.backoff_for(limited));
                limited += 1;
                tracing::warn!(
                    "r/{} {}: rate limited, waiting {:?} (attempt {}/{})",
                    subreddit, listing, wait, limited, opts.max_rate_limit_retries
                );
                sleep(wait);
            }
            Err(FetchError::Transient(msg)) if transient < opts.max_retries => {
                let wait = opts.backoff_for(transient);
                transient += 1;
                tracing::warn!(
                    "r/{} {}: {} (retry {}/{} in {:?})",
                    subreddit, listing, msg, transient, opts.max_retries, wait
                );
                sleep(wait);
            }
            Err(e) => {
                tracing::error!("r/{} {}: giving up on page: {}", subreddit, listing, e);
                return Err(e);
            }
        }
    }
}
