//! Reddit listing access: the `ListingSource` seam used by the fetcher, the
//! listing JSON decoder, and a blocking OAuth (client-credentials) client.

use crate::config::{Credentials, TopWindow};
use crate::error::{Error, FetchError};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::thread::sleep;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Which subreddit listing to page through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Listing {
    New,
    Top(TopWindow),
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listing::New => f.write_str("new"),
            Listing::Top(w) => write!(f, "top/{}", w.as_str()),
        }
    }
}

/// A submission as returned by a listing, before (country, phase) tagging.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingPost {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub created: OffsetDateTime,
    pub score: i64,
    pub flair: Option<String>,
    pub author: String,
    pub num_comments: u64,
    pub upvote_ratio: Option<f64>,
    pub permalink: String,
    pub url: String,
    pub subreddit: String,
    pub is_self: bool,
    pub over_18: bool,
}

/// One page of a listing plus the cursor for the next one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub posts: Vec<ListingPost>,
    pub after: Option<String>,
}

/// Anything that can serve subreddit listing pages.
pub trait ListingSource {
    fn fetch_page(
        &mut self,
        subreddit: &str,
        listing: Listing,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Page, FetchError>;
}

// -------- listing JSON --------

#[derive(Deserialize)]
struct RawListing {
    data: RawListingData,
}

#[derive(Deserialize)]
struct RawListingData {
    #[serde(default)]
    children: Vec<RawChild>,
    after: Option<String>,
}

#[derive(Deserialize)]
struct RawChild {
    kind: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct RawPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    link_flair_text: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    num_comments: u64,
    upvote_ratio: Option<f64>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    over_18: bool,
}

impl RawPost {
    fn into_post(self) -> Option<ListingPost> {
        let created = match OffsetDateTime::from_unix_timestamp(self.created_utc as i64) {
            Ok(ts) => ts,
            Err(_) => {
                tracing::warn!("post {} has out-of-range created_utc {}; skipped", self.id, self.created_utc);
                return None;
            }
        };
        let permalink = if self.permalink.starts_with('/') {
            format!("https://reddit.com{}", self.permalink)
        } else {
            self.permalink
        };
        Some(ListingPost {
            id: self.id,
            title: self.title,
            selftext: self.selftext,
            created,
            score: self.score,
            flair: self.link_flair_text.filter(|f| !f.trim().is_empty()),
            author: if self.author.is_empty() { "[deleted]".to_string() } else { self.author },
            num_comments: self.num_comments,
            upvote_ratio: self.upvote_ratio,
            permalink,
            url: self.url,
            subreddit: self.subreddit,
            is_self: self.is_self,
            over_18: self.over_18,
        })
    }
}

/// Decode a listing body. Non-submission children are ignored; an undecodable
/// body is treated as transient (Reddit serves HTML error pages under load).
pub fn parse_listing(body: &str) -> Result<Page, FetchError> {
    let raw: RawListing = serde_json::from_str(body)
        .map_err(|e| FetchError::Transient(format!("malformed listing body: {}", e)))?;
    let posts = raw
        .data
        .children
        .into_iter()
        .filter(|c| c.kind == "t3")
        .filter_map(|c| match serde_json::from_value::<RawPost>(c.data) {
            Ok(p) => p.into_post(),
            Err(e) => {
                tracing::warn!("skipping undecodable submission: {}", e);
                None
            }
        })
        .collect();
    Ok(Page { posts, after: raw.data.after.filter(|a| !a.is_empty()) })
}

// -------- OAuth client --------

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Blocking Reddit API client using the application-only OAuth flow.
pub struct RedditClient {
    http: Client,
    creds: Credentials,
    auth_url: String,
    api_base: String,
    token: Option<AccessToken>,
}

impl RedditClient {
    pub fn new(creds: Credentials) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(creds.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            creds,
            auth_url: REDDIT_AUTH_URL.to_string(),
            api_base: REDDIT_API_BASE.to_string(),
            token: None,
        })
    }

    /// Build a client and obtain the first token; credentials that Reddit
    /// rejects surface here, before any fetching starts.
    pub fn connect(creds: Credentials) -> anyhow::Result<Self> {
        let mut client = Self::new(creds)?;
        client.authenticate()?;
        Ok(client)
    }

    pub fn with_endpoints(mut self, auth_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn authenticate(&mut self) -> Result<(), Error> {
        let resp = self
            .http
            .post(&self.auth_url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| Error::Auth(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("token endpoint returned {}", status)));
        }
        let body: TokenResponse = resp.json().map_err(|e| Error::Auth(e.to_string()))?;
        if let Some(err) = body.error {
            return Err(Error::Auth(err));
        }
        let value = body.access_token.ok_or_else(|| Error::Auth("no access_token in response".into()))?;
        let ttl = Duration::from_secs(body.expires_in.unwrap_or(3600));
        self.token = Some(AccessToken { value, expires_at: Instant::now() + ttl });
        tracing::info!("authenticated with Reddit API (token valid for {}s)", ttl.as_secs());
        Ok(())
    }

    fn bearer(&mut self) -> Result<String, FetchError> {
        let fresh = self
            .token
            .as_ref()
            .map(|t| t.expires_at > Instant::now() + Duration::from_secs(60))
            .unwrap_or(false);
        if !fresh {
            tracing::debug!("refreshing Reddit access token");
            self.authenticate().map_err(|e| FetchError::Transient(e.to_string()))?;
        }
        self.token
            .as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| FetchError::Transient("no access token".into()))
    }

    /// Honour the `x-ratelimit-*` headers: when the window is exhausted, wait
    /// for the reset before handing the response back.
    fn respect_quota(resp: &Response) {
        let header_f64 = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok())
        };
        if let (Some(remaining), Some(reset)) = (header_f64("x-ratelimit-remaining"), header_f64("x-ratelimit-reset")) {
            tracing::debug!("ratelimit remaining={} reset={}s", remaining, reset);
            // NaN, negative or infinite resets are ignored
            let wait = (reset.is_finite() && reset > 0.0)
                .then(|| Duration::try_from_secs_f64(reset.min(600.0)).ok())
                .flatten();
            if let (true, Some(wait)) = (remaining < 1.0, wait) {
                tracing::warn!("request quota exhausted; sleeping {:?} until reset", wait);
                sleep(wait);
            }
        }
    }
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl ListingSource for RedditClient {
    fn fetch_page(
        &mut self,
        subreddit: &str,
        listing: Listing,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Page, FetchError> {
        let url = match listing {
            Listing::New => format!("{}/r/{}/new", self.api_base, subreddit),
            Listing::Top(_) => format!("{}/r/{}/top", self.api_base, subreddit),
        };
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string()), ("raw_json", "1".to_string())];
        if let Listing::Top(w) = listing {
            query.push(("t", w.as_str().to_string()));
        }
        if let Some(a) = after {
            query.push(("after", a.to_string()));
        }

        let token = self.bearer()?;
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = resp.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(FetchError::RateLimited { retry_after: retry_after(&resp) });
            }
            StatusCode::UNAUTHORIZED => {
                // force a new token on the retry
                self.token = None;
                return Err(FetchError::Transient("access token rejected (401)".into()));
            }
            s if s.is_server_error() => {
                return Err(FetchError::Transient(format!("{} from {}", s, url)));
            }
            s if !s.is_success() => {
                return Err(FetchError::Fatal(format!("{} from {}", s, url)));
            }
            _ => {}
        }

        Self::respect_quota(&resp);
        let body = resp.text().map_err(|e| FetchError::Transient(e.to_string()))?;
        parse_listing(&body)
    }
}
