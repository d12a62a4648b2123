#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::path::{Path, PathBuf};
use subpolar::{Credentials, FetchError, Listing, ListingPost, ListingSource, Page, RedditClient, RedditCollector};
use time::OffsetDateTime;

/// Build a listing post with sensible defaults for the fields tests don't care about.
pub fn post(id: &str, title: &str, selftext: &str, created: OffsetDateTime) -> ListingPost {
    ListingPost {
        id: id.to_string(),
        title: title.to_string(),
        selftext: selftext.to_string(),
        created,
        score: 1,
        flair: None,
        author: "tester".to_string(),
        num_comments: 0,
        upvote_ratio: Some(1.0),
        permalink: format!("https://reddit.com/r/test/comments/{}/", id),
        url: format!("https://reddit.com/r/test/comments/{}/", id),
        subreddit: "test".to_string(),
        is_self: true,
        over_18: false,
    }
}

/// In-memory `ListingSource`: posts per (subreddit, listing), served in pages of
/// `page_size` with `p<N>` cursors. Errors can be queued or made permanent per subreddit.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<(String, Listing), Vec<Page>>,
    queued_errors: VecDeque<FetchError>,
    broken: HashSet<String>,
    pub calls: Vec<(String, Listing, Option<String>)>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, sub: &str, listing: Listing, posts: Vec<ListingPost>, page_size: usize) -> Self {
        let chunks: Vec<Vec<ListingPost>> = posts.chunks(page_size.max(1)).map(|c| c.to_vec()).collect();
        let n = chunks.len();
        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(i, posts)| Page { posts, after: (i + 1 < n).then(|| format!("p{}", i + 1)) })
            .collect();
        self.pages.insert((sub.to_string(), listing), pages);
        self
    }

    pub fn fail_next(mut self, err: FetchError) -> Self {
        self.queued_errors.push_back(err);
        self
    }

    /// Every request for `sub` fails with a transient error.
    pub fn broken_subreddit(mut self, sub: &str) -> Self {
        self.broken.insert(sub.to_string());
        self
    }

    pub fn calls_for(&self, sub: &str, listing: Listing) -> Vec<Option<String>> {
        self.calls
            .iter()
            .filter(|(s, l, _)| s == sub && *l == listing)
            .map(|(_, _, after)| after.clone())
            .collect()
    }
}

impl ListingSource for FakeSource {
    fn fetch_page(&mut self, subreddit: &str, listing: Listing, after: Option<&str>, _limit: u32) -> Result<Page, FetchError> {
        self.calls.push((subreddit.to_string(), listing, after.map(str::to_string)));
        if self.broken.contains(subreddit) {
            return Err(FetchError::Transient("connection reset".into()));
        }
        if let Some(err) = self.queued_errors.pop_front() {
            return Err(err);
        }
        let idx = after.and_then(|a| a.strip_prefix('p')).and_then(|n| n.parse::<usize>().ok()).unwrap_or(0);
        Ok(self
            .pages
            .get(&(subreddit.to_string(), listing))
            .and_then(|pages| pages.get(idx))
            .cloned()
            .unwrap_or_default())
    }
}

/// Collector rooted in a fresh temp dir, no sleeps, no progress bar.
pub fn collector_in(dir: &Path) -> RedditCollector {
    RedditCollector::new().data_dir(dir).progress(false).without_delays()
}

pub fn tempdir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// One canned HTTP reply.
pub struct Reply {
    pub status: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Reply {
    pub fn new(status: &'static str, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn token() -> Self {
        Self::new("200 OK", r#"{"access_token":"tok","token_type":"bearer","expires_in":3600}"#)
    }
}

/// A request as the stub saw it: request line plus lowercased header lines.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub line: String,
    pub headers: Vec<String>,
}

/// Serves `replies` in order, one connection each, on a local port.
pub struct HttpStub {
    pub addr: SocketAddr,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl HttpStub {
    pub fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        thread::spawn(move || {
            for reply in replies {
                let Ok((stream, _)) = listener.accept() else { return };
                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let mut headers = Vec::new();
                let mut length = 0usize;
                loop {
                    let mut h = String::new();
                    reader.read_line(&mut h).unwrap();
                    let h = h.trim_end().to_lowercase();
                    if h.is_empty() {
                        break;
                    }
                    if let Some(v) = h.strip_prefix("content-length:") {
                        length = v.trim().parse().unwrap_or(0);
                    }
                    headers.push(h);
                }
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body).unwrap();
                log.lock().unwrap().push(SeenRequest { line: line.trim_end().to_string(), headers });

                let mut out = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                    reply.status,
                    reply.body.len()
                );
                for (name, value) in &reply.headers {
                    out.push_str(&format!("{}: {}\r\n", name, value));
                }
                out.push_str("\r\n");
                out.push_str(&reply.body);
                let mut stream = reader.into_inner();
                stream.write_all(out.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
        });
        Self { addr, seen }
    }

    pub fn client(&self) -> RedditClient {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            user_agent: "subpolar-tests/0.1".to_string(),
        };
        RedditClient::new(creds)
            .unwrap()
            .with_endpoints(format!("http://{}/api/v1/access_token", self.addr), format!("http://{}", self.addr))
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}
