//! HTTP fetcher backed by `reqwest`.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::time::Duration;
use tracing::debug;

use crate::config::HttpConfig;

use super::{FetchError, FetchedPage, Fetcher};

/// Fetches targets over HTTP(S).
///
/// Targets that are absolute `http`/`https` URLs are requested as-is; anything
/// else is resolved against the configured site base URL.
pub struct HttpFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    /// Create a new fetcher from HTTP settings and an optional site base URL.
    pub fn new(config: &HttpConfig, site_base_url: Option<&str>) -> Result<Self, FetchError> {
        let client = build_client(config)?;

        let base_url = site_base_url
            .map(|base| {
                Url::parse(base).map_err(|e| FetchError::Client(format!("invalid base URL {base}: {e}")))
            })
            .transpose()?;

        Ok(Self { client, base_url })
    }

    /// Turns a target into the URL to request.
    pub fn resolve(&self, target: &str) -> Result<Url, FetchError> {
        if let Ok(url) = Url::parse(target) {
            return match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(FetchError::InvalidTarget {
                    target: target.to_string(),
                    reason: format!("unsupported scheme {other}"),
                }),
            };
        }

        let base = self.base_url.as_ref().ok_or_else(|| FetchError::InvalidTarget {
            target: target.to_string(),
            reason: "relative target without a site base URL".to_string(),
        })?;

        base.join(target).map_err(|e| FetchError::InvalidTarget {
            target: target.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builds the shared client used for page and page-list requests.
pub(crate) fn build_client(config: &HttpConfig) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// Maps a transport error the same way for every request.
fn map_request_error(url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, target: &str) -> Result<FetchedPage, FetchError> {
        let url = self.resolve(target)?;
        debug!(page = target, url = %url, "Fetching page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        debug!(page = target, bytes = body.len(), "Fetched page");

        Ok(FetchedPage::new(body.to_vec(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base: Option<&str>) -> HttpFetcher {
        HttpFetcher::new(&HttpConfig::default(), base).unwrap()
    }

    #[test]
    fn test_resolve_absolute_and_relative() {
        let f = fetcher(Some("https://example.org"));
        assert_eq!(
            f.resolve("https://other.org/a.html").unwrap().as_str(),
            "https://other.org/a.html"
        );
        assert_eq!(
            f.resolve("/about/").unwrap().as_str(),
            "https://example.org/about/"
        );
        assert_eq!(
            f.resolve("a.html").unwrap().as_str(),
            "https://example.org/a.html"
        );
    }

    #[test]
    fn test_resolve_relative_without_base_fails() {
        let f = fetcher(None);
        let err = f.resolve("/about/").unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        let f = fetcher(Some("https://example.org"));
        let err = f.resolve("ftp://example.org/file.txt").unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpFetcher::new(&HttpConfig::default(), Some("not a url"));
        assert!(matches!(result, Err(FetchError::Client(_))));
    }

    #[tokio::test]
    async fn test_fetch_success_with_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about/"))
            .and(header("user-agent", "mirror-bot/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=UTF-8")
                    .set_body_string("<html>about</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = HttpConfig {
            user_agent: "mirror-bot/1.0".to_string(),
            ..Default::default()
        };
        let f = HttpFetcher::new(&config, Some(&server.uri())).unwrap();
        let page = f.fetch("/about/").await.unwrap();

        assert_eq!(page.body, b"<html>about</html>".to_vec());
        assert_eq!(page.media_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let f = fetcher(Some(&server.uri()));
        let err = f.fetch("/missing.html").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = HttpConfig {
            timeout_secs: 1,
            ..Default::default()
        };
        let f = HttpFetcher::new(&config, Some(&server.uri())).unwrap();
        let err = f.fetch("/slow.html").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }
}
