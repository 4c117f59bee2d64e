use std::env;

use hubget_fetch::ProxyConfig;

/// Process environment, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct HubEnv {
    proxy: ProxyConfig,
}

impl HubEnv {
    pub fn from_env() -> Self { Self::from_lookup(|name| env::var(name).ok()) }

    /// Upper-case names win over lower-case ones; blank values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .or_else(|| lookup(&name.to_ascii_lowercase()))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            proxy: ProxyConfig {
                http:     var("HTTP_PROXY"),
                https:    var("HTTPS_PROXY"),
                all:      var("ALL_PROXY"),
                no_proxy: var("NO_PROXY"),
            },
        }
    }

    pub fn proxy(&self) -> &ProxyConfig { &self.proxy }
}
