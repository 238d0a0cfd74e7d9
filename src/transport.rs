//! Shared HTTP client construction: proxy, TLS, timeout and default headers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;

/// Scheme assumed for a SOCKS address given as bare `host:port`.
const DEFAULT_SOCKS_SCHEME: &str = "socks5h";

/// Network settings consumed once to build the provider HTTP client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportConfig {
    pub proxy_url: String,
    pub socks_url: String,
    /// Overall request deadline. Zero disables it.
    pub timeout: Duration,
    /// `Key=Value` pairs added to every request.
    pub headers: Vec<String>,
    pub skip_verify: bool,
}

/// Which proxy, if any, outgoing requests are routed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    Direct,
    Http(Url),
    Socks(Url),
}

/// Pick the proxy route: `proxy_url` first, then `socks_url`, else direct.
///
/// The two settings are mutually exclusive; when both are set the SOCKS
/// address is ignored.
pub fn select_proxy(cfg: &TransportConfig) -> Result<ProxyRoute, TransportError> {
    let proxy_url = cfg.proxy_url.trim();
    if !proxy_url.is_empty() {
        let url = Url::parse(proxy_url).map_err(|e| TransportError::InvalidProxyUrl {
            url: proxy_url.to_string(),
            reason: e.to_string(),
        })?;
        if !cfg.socks_url.trim().is_empty() {
            warn!("Both proxy_url and socks_url are set; ignoring socks_url");
        }
        return Ok(ProxyRoute::Http(url));
    }

    let socks_url = cfg.socks_url.trim();
    if !socks_url.is_empty() {
        let normalized = if socks_url.contains("://") {
            socks_url.to_string()
        } else {
            format!("{}://{}", DEFAULT_SOCKS_SCHEME, socks_url)
        };
        let url = Url::parse(&normalized).map_err(|e| TransportError::InvalidSocksUrl {
            url: socks_url.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(ProxyRoute::Socks(url));
    }

    Ok(ProxyRoute::Direct)
}

/// Parse `Key=Value` strings into a header map.
///
/// Entries with no `=`, an empty key or an empty value, or that are not
/// valid HTTP header syntax, are skipped.
pub fn parse_headers(entries: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            debug!("Skipping header without '=': {:?}", entry);
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            debug!("Skipping header with empty key or value: {:?}", entry);
            continue;
        }
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!("Skipping unrepresentable header: {:?}", entry),
        }
    }
    headers
}

/// Build the HTTP client every provider client sends through.
pub fn build_transport(cfg: &TransportConfig) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder().default_headers(parse_headers(&cfg.headers));

    if cfg.skip_verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    if !cfg.timeout.is_zero() {
        builder = builder.timeout(cfg.timeout);
    }

    builder = match select_proxy(cfg)? {
        ProxyRoute::Direct => builder,
        ProxyRoute::Http(url) => {
            let proxy = reqwest::Proxy::all(url.as_str()).map_err(|e| {
                TransportError::InvalidProxyUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;
            builder.proxy(proxy)
        }
        ProxyRoute::Socks(url) => {
            let proxy = reqwest::Proxy::all(url.as_str()).map_err(|e| {
                TransportError::InvalidSocksUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;
            builder.proxy(proxy)
        }
    };

    builder.build().map_err(TransportError::Build)
}
