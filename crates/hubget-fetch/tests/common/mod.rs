//! In-memory hosting service for driving the downloader end to end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use hubget_fetch::{BoxStream, FetchError, HttpClient, RemoteHead, Result, check_range_response};
use hubget_verify::{GitBlobHasher, Sha256Hasher};
use serde_json::json;

pub const ENDPOINT: &str = "http://hub.test";
pub const REPO: &str = "owner/name";

/// Files at or above this size are listed as large-file-storage entries.
const LFS_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Body never yields a chunk.
    Stall,
    /// First byte of every body is flipped.
    Corrupt,
    /// Range requests starting at or after the offset answer 404.
    FailRangesFrom(u64),
    /// Every request for the file answers 401.
    Unauthorized,
    /// Bodies stop after half of the requested bytes.
    Truncate,
    /// The next `n` range requests answer 416.
    RangeNotSatisfiable(u32),
    /// Range requests are answered with the whole body and `200`.
    IgnoreRanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: &'static str,
    pub path:   String,
    pub range:  Option<Range<u64>>,
}

#[derive(Debug, Default)]
struct State {
    commit:    String,
    missing:   bool,
    files:     Vec<(String, Vec<u8>)>,
    behaviors: HashMap<String, Behavior>,
    log:       Vec<Request>,
}

#[derive(Debug, Clone)]
pub struct MockHub {
    state:       Arc<Mutex<State>>,
    ranges:      bool,
    chunk:       usize,
    chunk_delay: Option<Duration>,
    active:      Arc<AtomicUsize>,
    peak:        Arc<AtomicUsize>,
}

impl MockHub {
    pub fn new() -> Self {
        Self {
            state:       Arc::new(Mutex::new(State {
                commit: "c1".into(),
                ..State::default()
            })),
            ranges:      true,
            chunk:       64 * 1024,
            chunk_delay: None,
            active:      Arc::new(AtomicUsize::new(0)),
            peak:        Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn file(self, path: &str, content: Vec<u8>) -> Self {
        self.state.lock().unwrap().files.push((path.into(), content));
        self
    }

    pub fn chunked(mut self, chunk: usize, delay: Option<Duration>) -> Self {
        self.chunk = chunk;
        self.chunk_delay = delay;
        self
    }

    pub fn without_ranges(mut self) -> Self {
        self.ranges = false;
        self
    }

    pub fn behave(&self, path: &str, behavior: Behavior) {
        self.state.lock().unwrap().behaviors.insert(path.into(), behavior);
    }

    pub fn heal(&self) { self.state.lock().unwrap().behaviors.clear(); }

    pub fn set_commit(&self, commit: &str) { self.state.lock().unwrap().commit = commit.into(); }

    pub fn set_missing(&self, missing: bool) { self.state.lock().unwrap().missing = missing; }

    pub fn requests(&self) -> Vec<Request> { self.state.lock().unwrap().log.clone() }

    pub fn clear_log(&self) { self.state.lock().unwrap().log.clear(); }

    /// File requests (HEAD or GET) for `path`.
    pub fn file_requests(&self, path: &str) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.path == path).collect()
    }

    /// Body requests for `path`, in the order they were made.
    pub fn streams(&self, path: &str) -> Vec<Option<Range<u64>>> {
        self.file_requests(path)
            .into_iter()
            .filter(|r| r.method == "GET")
            .map(|r| r.range)
            .collect()
    }

    pub fn peak_streams(&self) -> usize { self.peak.load(Ordering::SeqCst) }

    fn manifest(&self) -> Result<Bytes> {
        let state = self.state.lock().unwrap();
        if state.missing {
            return Err(FetchError::NotFound("repository".into()));
        }
        let siblings: Vec<_> = state
            .files
            .iter()
            .map(|(path, content)| {
                if content.len() >= LFS_THRESHOLD {
                    json!({
                        "rfilename": path,
                        "size": content.len(),
                        "blobId": "0".repeat(40),
                        "lfs": {
                            "sha256": hex::encode(Sha256Hasher::digest(content)),
                            "size": content.len(),
                            "pointerSize": 134,
                        },
                    })
                } else {
                    json!({
                        "rfilename": path,
                        "size": content.len(),
                        "blobId": hex::encode(GitBlobHasher::digest(content)),
                    })
                }
            })
            .collect();
        let body = json!({ "id": REPO, "sha": state.commit, "siblings": siblings });
        Ok(Bytes::from(body.to_string()))
    }

    /// Resolves a file URL to its content and configured behavior.
    fn lookup(
        &self,
        method: &'static str,
        url: &str,
        range: Option<Range<u64>>,
    ) -> Result<(Vec<u8>, Option<Behavior>)> {
        let mut state = self.state.lock().unwrap();
        let rest = url
            .split_once("/resolve/")
            .map(|(_, rest)| rest)
            .ok_or_else(|| FetchError::NotFound(url.into()))?;
        let (commit, path) = rest.split_once('/').ok_or_else(|| FetchError::NotFound(url.into()))?;

        let ranged = range.is_some();
        state.log.push(Request {
            method,
            path: path.into(),
            range,
        });
        if commit != state.commit {
            return Err(FetchError::NotFound(format!("{path}@{commit}")));
        }
        let content = state
            .files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| FetchError::NotFound(path.into()))?;

        let behavior = state.behaviors.get(path).copied();
        if let (Some(Behavior::RangeNotSatisfiable(n)), true) = (behavior, ranged) {
            if n <= 1 {
                state.behaviors.remove(path);
            } else {
                state.behaviors.insert(path.into(), Behavior::RangeNotSatisfiable(n - 1));
            }
        }
        Ok((content, behavior))
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

impl HttpClient for MockHub {
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        if url.starts_with(&format!("{ENDPOINT}/api/")) {
            self.manifest()
        } else {
            Err(FetchError::NotFound(url.into()))
        }
    }

    async fn head(&self, url: &str) -> Result<RemoteHead> {
        let (content, behavior) = self.lookup("HEAD", url, None)?;
        if behavior == Some(Behavior::Unauthorized) {
            return Err(FetchError::Unauthorized(url.into()));
        }
        Ok(RemoteHead {
            content_length: Some(content.len() as u64),
            accept_ranges:  self.ranges,
        })
    }

    async fn stream(
        &self,
        url: &str,
        range: Option<Range<u64>>,
    ) -> Result<BoxStream<'static, Result<Bytes>>> {
        let (mut content, behavior) = self.lookup("GET", url, range.clone())?;

        match behavior {
            Some(Behavior::Unauthorized) => return Err(FetchError::Unauthorized(url.into())),
            Some(Behavior::FailRangesFrom(offset))
                if range.as_ref().is_some_and(|r| r.start >= offset) =>
            {
                return Err(FetchError::NotFound(url.into()));
            }
            Some(Behavior::RangeNotSatisfiable(_)) if range.is_some() => {
                return Err(FetchError::RangeNotSatisfiable(url.into()));
            }
            Some(Behavior::IgnoreRanges) => check_range_response(200, range.is_some(), url)?,
            Some(Behavior::Stall) => return Ok(Box::pin(stream::pending())),
            Some(Behavior::Corrupt) => {
                if let Some(first) = content.first_mut() {
                    *first ^= 0xff;
                }
            }
            _ => {}
        }

        if !self.ranges {
            check_range_response(200, range.is_some(), url)?;
        }
        let mut body = match range {
            Some(range) if range.end as usize > content.len() || range.is_empty() => {
                return Err(FetchError::RangeNotSatisfiable(url.into()));
            }
            Some(range) => content[range.start as usize..range.end as usize].to_vec(),
            None => content,
        };
        if behavior == Some(Behavior::Truncate) {
            body.truncate(body.len() / 2);
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard(self.active.clone());

        let chunks: Vec<Bytes> = body.chunks(self.chunk.max(1)).map(Bytes::copy_from_slice).collect();
        let delay = self.chunk_delay;
        let body = stream::iter(chunks).then(move |chunk| {
            let _ = &guard;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            }
        });
        Ok(Box::pin(body))
    }
}

/// Deterministic test content.
pub fn content(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
