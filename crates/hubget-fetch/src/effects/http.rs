use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::Result;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// What a `HEAD` on a file URL tells us, after redirects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteHead {
    pub content_length: Option<u64>,
    /// `Accept-Ranges: bytes` was advertised.
    pub accept_ranges:  bool,
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations follow redirects, attach credentials, and map failures
/// into [`FetchError`](crate::FetchError) so the failure taxonomy survives
/// the seam.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - In-memory implementations for testing
pub trait HttpClient: Send + Sync {
    /// Fetches a small response body in full (the repository listing).
    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Bytes>> + Send;

    fn head(&self, url: &str) -> impl Future<Output = Result<RemoteHead>> + Send;

    /// Opens a body stream, optionally for a byte range (end exclusive).
    ///
    /// A ranged request answered with anything but `206 Partial Content` is
    /// an error; `416` maps to `RangeNotSatisfiable`.
    fn stream(
        &self,
        url: &str,
        range: Option<Range<u64>>,
    ) -> impl Future<Output = Result<BoxStream<'static, Result<Bytes>>>> + Send;
}

/// Proxy settings read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http:     Option<String>,
    pub https:    Option<String>,
    pub all:      Option<String>,
    pub no_proxy: Option<String>,
}

/// Explicit client configuration. Nothing below this reads the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub token:           Option<String>,
    pub proxy:           ProxyConfig,
    pub connect_timeout: Duration,
    pub user_agent:      String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("proxy", &self.proxy)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token:           None,
            proxy:           ProxyConfig::default(),
            connect_timeout: Duration::from_secs(30),
            user_agent:      concat!("hubget/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;
    use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderValue, RANGE};
    use reqwest::{NoProxy, Proxy, RequestBuilder, Response};
    use tracing::debug;

    use super::*;
    use crate::core::{check_range_response, check_status};
    use crate::error::FetchError;

    const ERROR_CODE: &str = "x-error-code";

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
        token:  Option<String>,
    }

    impl ReqwestClient {
        /// Builds a client from explicit configuration.
        ///
        /// System proxy detection is disabled; only the proxies in `config`
        /// are used.
        pub fn new(config: &ClientConfig) -> Result<Self> {
            let mut builder = reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .connect_timeout(config.connect_timeout)
                .no_proxy();

            let no_proxy = config.proxy.no_proxy.as_deref().and_then(NoProxy::from_string);
            let proxies = [
                ("https", &config.proxy.https),
                ("http", &config.proxy.http),
                ("all", &config.proxy.all),
            ];
            for (scheme, url) in proxies {
                let Some(url) = url.as_deref().filter(|u| !u.is_empty()) else {
                    continue;
                };
                let proxy = match scheme {
                    "https" => Proxy::https(url),
                    "http" => Proxy::http(url),
                    _ => Proxy::all(url),
                }
                .map_err(|e| FetchError::InvalidConfig(format!("{scheme} proxy {url:?}: {e}")))?;
                builder = builder.proxy(proxy.no_proxy(no_proxy.clone()));
            }

            let client = builder
                .build()
                .map_err(|e| FetchError::InvalidConfig(format!("HTTP client: {e}")))?;
            Ok(Self {
                client,
                token: config.token.clone(),
            })
        }

        fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
            match &self.token {
                Some(token) => request.bearer_auth(token),
                None => request,
            }
        }

        async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
            let response = self.authorized(request).send().await.map_err(map_reqwest)?;
            let error_code = response
                .headers()
                .get(ERROR_CODE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            check_status(response.status().as_u16(), error_code.as_deref(), url)?;
            Ok(response)
        }
    }

    fn map_reqwest(e: reqwest::Error) -> FetchError {
        if e.is_builder() {
            FetchError::Protocol(e.to_string())
        } else {
            FetchError::Transient(e.to_string())
        }
    }

    fn header_u64(value: Option<&HeaderValue>) -> Option<u64> {
        value?.to_str().ok()?.trim().parse().ok()
    }

    impl HttpClient for ReqwestClient {
        async fn get_bytes(&self, url: &str) -> Result<Bytes> {
            debug!(url, "GET");
            let response = self.send(self.client.get(url), url).await?;
            response.bytes().await.map_err(map_reqwest)
        }

        async fn head(&self, url: &str) -> Result<RemoteHead> {
            debug!(url, "HEAD");
            let response = self.send(self.client.head(url), url).await?;
            let headers = response.headers();
            // `Response::content_length` reports the (empty) body size for HEAD.
            Ok(RemoteHead {
                content_length: header_u64(headers.get(CONTENT_LENGTH)),
                accept_ranges:  headers
                    .get(ACCEPT_RANGES)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.split(',').any(|unit| unit.trim() == "bytes")),
            })
        }

        async fn stream(
            &self,
            url: &str,
            range: Option<Range<u64>>,
        ) -> Result<BoxStream<'static, Result<Bytes>>> {
            let mut request = self.client.get(url);
            if let Some(range) = &range {
                if range.is_empty() {
                    return Err(FetchError::RangeNotSatisfiable(format!("empty range for {url}")));
                }
                request = request.header(RANGE, format!("bytes={}-{}", range.start, range.end - 1));
            }
            debug!(url, ?range, "GET stream");

            let response = self.send(request, url).await?;
            check_range_response(response.status().as_u16(), range.is_some(), url)?;

            let stream = response.bytes_stream().map(|chunk| chunk.map_err(map_reqwest));
            Ok(Box::pin(stream))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
