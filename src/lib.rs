mod config;
mod country;
mod phase;
mod error;

mod classify;
mod post;
mod reddit;
mod fetch;
mod export;
mod merge;
mod progress;
mod util;
mod pipeline;

pub use crate::config::{CollectorOptions, Credentials, TopWindow};
pub use crate::country::Country;
pub use crate::phase::{Phase, PhaseWindow};
pub use crate::error::{Error, FetchError};
pub use crate::pipeline::{IncompletePair, PairReport, RedditCollector, RunReport};

// classifier and derived text fields
pub use crate::classify::{classify, is_political, KeywordSet};
pub use crate::post::{clean_text, full_text, Post, PostRow, UnifiedRow};

// listing access; implement `ListingSource` to feed the fetcher from elsewhere
pub use crate::reddit::{parse_listing, Listing, ListingPost, ListingSource, Page, RedditClient};
pub use crate::fetch::{fetch_window, listings_for, FetchOutcome};

// dataset files
pub use crate::export::{read_csv, write_csv, DatasetKind, Exporter};
pub use crate::merge::{unify_row, MergeReport, MergeSource};

pub use crate::progress::PairProgress;
pub use crate::util::init_tracing_once;
