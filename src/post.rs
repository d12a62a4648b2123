//! Post model and the derived text fields shared by the exporter and merger.

use crate::country::Country;
use crate::phase::Phase;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A fetched submission, tagged with the (country, phase) it was collected for.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub created: OffsetDateTime,
    pub country: Country,
    pub phase: Phase,
    pub score: i64,
    pub flair: Option<String>,
    pub author: String,
    pub num_comments: u64,
    pub upvote_ratio: Option<f64>,
    pub permalink: String,
    /// Link target; the permalink itself for self posts.
    pub url: String,
    pub subreddit: String,
    pub is_self: bool,
    pub over_18: bool,
}

impl Post {
    pub fn full_text(&self) -> String {
        full_text(&self.title, &self.selftext)
    }

    pub fn is_political(&self) -> bool {
        crate::classify::is_political(&self.full_text(), self.country)
    }

    pub fn to_row(&self) -> Result<PostRow> {
        let created = self
            .created
            .format(&Rfc3339)
            .with_context(|| format!("format created timestamp of post {}", self.id))?;
        Ok(PostRow {
            id: self.id.clone(),
            title: self.title.clone(),
            selftext: self.selftext.clone(),
            created,
            country: self.country.as_str().to_string(),
            phase: self.phase.as_str().to_string(),
            score: self.score,
            flair: self.flair.clone().unwrap_or_default(),
            author: self.author.clone(),
            num_comments: self.num_comments,
            upvote_ratio: self.upvote_ratio,
            permalink: self.permalink.clone(),
            url: self.url.clone(),
            subreddit: self.subreddit.clone(),
            is_self: self.is_self,
            over_18: self.over_18,
            full_text: self.full_text(),
            is_political: self.is_political(),
        })
    }
}

/// One row of a per-(country, phase) dataset file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub created: String, // RFC 3339, UTC
    pub country: String,
    pub phase: String,
    pub score: i64,
    #[serde(default)]
    pub flair: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub is_political: bool,
}

impl PostRow {
    pub const HEADERS: [&'static str; 18] = [
        "id", "title", "selftext", "created", "country", "phase", "score", "flair",
        "author", "num_comments", "upvote_ratio", "permalink", "url", "subreddit",
        "is_self", "over_18", "full_text", "is_political",
    ];

    pub fn created_at(&self) -> Result<OffsetDateTime> {
        OffsetDateTime::parse(&self.created, &Rfc3339)
            .with_context(|| format!("parse created `{}` of post {}", self.created, self.id))
    }
}

/// One row of the unified dataset: a `PostRow` plus the normalized text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRow {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub created: String,
    pub country: String,
    pub phase: String,
    pub score: i64,
    pub flair: String,
    pub author: String,
    pub num_comments: u64,
    pub upvote_ratio: Option<f64>,
    pub permalink: String,
    pub url: String,
    pub subreddit: String,
    pub is_self: bool,
    pub over_18: bool,
    pub full_text: String,
    pub clean_text: String,
    pub is_political: bool,
}

impl UnifiedRow {
    pub const HEADERS: [&'static str; 19] = [
        "id", "title", "selftext", "created", "country", "phase", "score", "flair",
        "author", "num_comments", "upvote_ratio", "permalink", "url", "subreddit",
        "is_self", "over_18", "full_text", "clean_text", "is_political",
    ];
}

/// `title + " " + selftext`; just the title when the body is empty.
pub fn full_text(title: &str, selftext: &str) -> String {
    let title = title.trim();
    let body = selftext.trim();
    match (title.is_empty(), body.is_empty()) {
        (_, true) => title.to_string(),
        (true, false) => body.to_string(),
        (false, false) => format!("{} {}", title, body),
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("static URL regex"))
}

/// Lowercase, drop URLs, collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = url_regex().replace_all(&lower, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
