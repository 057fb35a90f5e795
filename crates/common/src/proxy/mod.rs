//! Static resource proxy
//!
//! Fetches files from one configured upstream origin so the browser can load
//! them same-origin. Paths are always resolved below the upstream base url.

use crate::config::ProxyConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use reqwest::{header::CONTENT_TYPE, Url};
use std::time::Duration;
use tracing::debug;

/// Fallback when the upstream sends no content type
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upstream response, passed through unchanged
#[derive(Debug, Clone)]
pub struct ProxiedResource {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ProxiedResource {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client bound to the upstream origin
pub struct ResourceProxy {
    client: reqwest::Client,
    base: Url,
    cache_max_age_secs: u64,
    max_body_bytes: usize,
}

impl ResourceProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let mut base = config.upstream_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| AppError::Configuration {
            message: format!("Invalid proxy.upstream_base {:?}: {}", config.upstream_base, e),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base,
            cache_max_age_secs: config.cache_max_age_secs,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// `Cache-Control` value for successful responses
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age_secs)
    }

    /// Resolve a client supplied path against the upstream base
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let path = path.trim();
        if path.is_empty() {
            return Err(AppError::MissingField {
                field: "path".to_string(),
            });
        }

        let lowered = path.to_ascii_lowercase();
        let escapes_base = path.starts_with("//")
            || path.starts_with("\\\\")
            || lowered.contains("://")
            || lowered.contains("%2e%2e")
            || path.split(['/', '\\']).any(|segment| segment == "..");
        if escapes_base {
            return Err(AppError::InvalidFormat {
                message: "path must be relative to the resource origin".to_string(),
            });
        }

        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::InvalidFormat {
                message: format!("invalid path: {}", e),
            })?;

        // dot segments can arrive in encodings the checks above miss; the
        // joined url is what gets fetched, so it must still sit under the base
        if !self.contains(&url) {
            return Err(AppError::InvalidFormat {
                message: "path must be relative to the resource origin".to_string(),
            });
        }
        Ok(url)
    }

    fn contains(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default()
            && url.as_str().starts_with(self.base.as_str())
    }

    /// One GET against the upstream; non-success statuses are returned, not raised
    pub async fn fetch(&self, path: &str) -> Result<ProxiedResource> {
        let url = self.resolve(path)?;
        debug!(url = %url, "Proxying resource");

        let mut response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_proxy(0);
                return Err(AppError::Upstream {
                    message: format!("Failed to fetch {}: {}", url.path(), e),
                });
            }
        };

        let status = response.status().as_u16();
        metrics::record_proxy(status);

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let too_large = || AppError::Upstream {
            message: format!(
                "Resource {} exceeds {} bytes",
                url.path(),
                self.max_body_bytes
            ),
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        // content-length may be absent or wrong, so the cap is enforced while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| AppError::Upstream {
            message: format!("Failed to read {}: {}", url.path(), e),
        })? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ProxiedResource {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn proxy_for(base: &str) -> ResourceProxy {
        ResourceProxy::new(&ProxyConfig {
            upstream_base: base.to_string(),
            ..ProxyConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_resolve_stays_below_base() {
        let proxy = proxy_for("https://cdn.example.com/site");
        assert_eq!(
            proxy.resolve("images/logo.png").unwrap().as_str(),
            "https://cdn.example.com/site/images/logo.png"
        );
        assert_eq!(
            proxy.resolve("/docs/brochure.pdf").unwrap().as_str(),
            "https://cdn.example.com/site/docs/brochure.pdf"
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let proxy = proxy_for("https://cdn.example.com/site/");
        for bad in [
            "https://evil.example/x",
            "//evil.example/x",
            "../secret",
            "a/../../b",
            "a/%2E%2E/b",
            ".%2e/x",
            "%2e./x",
            ".%2e/.%2e/admin/secret",
            "a/.%2E/.%2E/.%2E/x",
            "",
        ] {
            let err = proxy.resolve(bad).unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST, "{bad}");
        }
    }

    #[test]
    fn test_resolve_keeps_deep_base_path() {
        let proxy = proxy_for("https://cdn.example.com/site/public/");
        assert!(proxy.resolve("a/.%2e/.%2e/b.png").is_err());
        assert_eq!(
            proxy.resolve("a/.%2e/b.png").unwrap().as_str(),
            "https://cdn.example.com/site/public/b.png"
        );
        assert_eq!(
            proxy.resolve("a/./b.png").unwrap().as_str(),
            "https://cdn.example.com/site/public/a/b.png"
        );
    }

    #[test]
    fn test_invalid_base_is_configuration_error() {
        let result = ResourceProxy::new(&ProxyConfig {
            upstream_base: "not a url".to_string(),
            ..ProxyConfig::default()
        });
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_cache_control_uses_configured_max_age() {
        assert_eq!(proxy_for("https://x.test/").cache_control(), "public, max-age=300");
    }

    #[tokio::test]
    async fn test_fetch_passes_bytes_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/logo.svg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/svg+xml")
                    .set_body_bytes(b"<svg/>".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let proxy = proxy_for(&server.uri());
        let resource = proxy.fetch("assets/logo.svg").await.unwrap();
        assert!(resource.is_success());
        assert_eq!(resource.content_type, "image/svg+xml");
        assert_eq!(resource.body, b"<svg/>");
    }

    #[tokio::test]
    async fn test_fetch_returns_upstream_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resource = proxy_for(&server.uri()).fetch("missing.png").await.unwrap();
        assert_eq!(resource.status, 404);
        assert!(!resource.is_success());
    }

    #[tokio::test]
    async fn test_oversized_body_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let proxy = ResourceProxy::new(&ProxyConfig {
            upstream_base: server.uri(),
            max_body_bytes: 32,
            ..ProxyConfig::default()
        })
        .unwrap();
        let err = proxy.fetch("grande.bin").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));

        let proxy = ResourceProxy::new(&ProxyConfig {
            upstream_base: server.uri(),
            max_body_bytes: 64,
            ..ProxyConfig::default()
        })
        .unwrap();
        assert_eq!(proxy.fetch("grande.bin").await.unwrap().body.len(), 64);
    }

    #[tokio::test]
    async fn test_transport_failure_is_upstream_error() {
        // nothing listens on port 9 locally
        let proxy = proxy_for("http://127.0.0.1:9/");
        let err = proxy.fetch("x.png").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { .. }));
    }
}
