use crate::error::{FetchError, Result};

/// Returns `true` if the HTTP status code indicates a redirect.
///
/// # Examples
///
/// ```
/// use hubget_fetch::is_redirect;
///
/// assert!(is_redirect(301));
/// assert!(is_redirect(302));
/// assert!(!is_redirect(200));
/// assert!(!is_redirect(404));
/// ```
pub fn is_redirect(status: u16) -> bool { matches!(status, 301 | 302 | 303 | 307 | 308) }

/// Maps a response status to the failure taxonomy.
///
/// `error_code` is the service's `X-Error-Code` header, which disambiguates
/// the 401 it returns for repositories that do not exist.
pub fn check_status(status: u16, error_code: Option<&str>, url: &str) -> Result<()> {
    let what = || format!("HTTP {status} for {url}");
    match error_code {
        Some("RepoNotFound" | "RevisionNotFound" | "EntryNotFound") if status >= 400 => {
            return Err(FetchError::NotFound(what()));
        }
        Some("GatedRepo") if status >= 400 => return Err(FetchError::Unauthorized(what())),
        _ => {}
    }
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(FetchError::Unauthorized(what())),
        404 | 410 => Err(FetchError::NotFound(what())),
        416 => Err(FetchError::RangeNotSatisfiable(what())),
        408 | 425 | 429 | 500..=599 => Err(FetchError::Transient(what())),
        s if is_redirect(s) => Err(FetchError::Protocol(format!("unfollowed redirect: {}", what()))),
        _ => Err(FetchError::Protocol(what())),
    }
}

/// A ranged request must be answered with `206 Partial Content`. A server
/// that ignores the `Range` header sends the whole body with `200`, which
/// would land at the wrong offset.
pub fn check_range_response(status: u16, ranged: bool, url: &str) -> Result<()> {
    if ranged && status != 206 {
        return Err(FetchError::Protocol(format!(
            "range request to {url} answered with HTTP {status}"
        )));
    }
    Ok(())
}
