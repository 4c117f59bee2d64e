use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::data::RemoteFileEntry;
use crate::error::{FetchError, Result};

/// Compiled allow/deny globs.
///
/// `*` stays within one path segment and `**` crosses segments. A path is
/// included when it matches some allow pattern (or there are none) and no
/// deny pattern. Deny always wins.
///
/// # Examples
///
/// ```
/// use hubget_fetch::PatternSet;
///
/// let patterns = PatternSet::new(["*.safetensors", "configs/"], ["*.md"]).unwrap();
/// assert!(patterns.matches("model.safetensors"));
/// assert!(patterns.matches("configs/a/b.json"));
/// assert!(!patterns.matches("README.md"));
/// assert!(!patterns.matches("onnx/model.onnx"));
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet {
    allow:     GlobSet,
    deny:      GlobSet,
    has_allow: bool,
}

impl Default for PatternSet {
    fn default() -> Self { Self::all() }
}

impl PatternSet {
    pub fn new<A, D>(allow: A, deny: D) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let (allow, allow_count) = compile(allow)?;
        let (deny, _) = compile(deny)?;
        Ok(Self {
            allow,
            deny,
            has_allow: allow_count > 0,
        })
    }

    /// Matches every path.
    pub fn all() -> Self {
        Self {
            allow:     GlobSet::empty(),
            deny:      GlobSet::empty(),
            has_allow: false,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        (!self.has_allow || self.allow.is_match(path)) && !self.deny.is_match(path)
    }

    /// Keeps matching entries in order and returns how many were excluded.
    pub fn filter(&self, entries: Vec<RemoteFileEntry>) -> (Vec<RemoteFileEntry>, usize) {
        let total = entries.len();
        let kept: Vec<_> = entries.into_iter().filter(|e| self.matches(&e.path)).collect();
        let excluded = total - kept.len();
        (kept, excluded)
    }
}

fn compile<I>(patterns: I) -> Result<(GlobSet, usize)>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(&expand(pattern))
            .literal_separator(true)
            .build()
            .map_err(|source| FetchError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
        count += 1;
    }
    let set = builder.build().map_err(|source| FetchError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })?;
    Ok((set, count))
}

/// `dir/` is shorthand for everything below `dir`.
fn expand(pattern: &str) -> String {
    if pattern.ends_with('/') { format!("{pattern}**") } else { pattern.to_string() }
}
