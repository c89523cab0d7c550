//! Shared HTTP client for source backends and AI providers.
//!
//! Provides:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff (count set by the caller's config)
//! - Response caching for idempotent GETs with a short TTL
//! - A hard per-call timeout so no request blocks indefinitely

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::debug;

use crate::config::{Config, api};
use crate::error::{ClientError, ClientResult};

/// Request header as name/value pair.
pub type Header<'a> = (&'a str, &'a str);

/// HTTP client shared by every adapter, the content reader and the providers.
#[derive(Clone)]
pub struct HttpClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response body cache (`None` when disabled).
    cache: Option<Cache<String, String>>,
}

impl HttpClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("paper-screening/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(api::MAX_KEEPALIVE)
            .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
            .gzip(true)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(10))
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = (config.response_cache_max_size > 0).then(|| {
            Cache::builder()
                .max_capacity(config.response_cache_max_size)
                .time_to_live(config.response_cache_ttl)
                .build()
        });

        Ok(Self { client, cache })
    }

    /// GET a URL and return the body as text.
    ///
    /// Successful bodies are cached by method, URL and query parameters.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[Header<'_>],
        timeout: Duration,
    ) -> ClientResult<String> {
        let cache_key = self.cache_key("GET", url, params);
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cache_key).await {
                debug!(url, "response cache hit");
                return Ok(cached);
            }
        }

        let request = with_headers(self.client.get(url).query(params), headers);
        let body = self.send(request, timeout).await?;

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, body.clone()).await;
        }
        Ok(body)
    }

    /// GET a URL and decode the JSON body.
    pub async fn get_json<T>(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[Header<'_>],
        timeout: Duration,
    ) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = self.get_text(url, params, headers, timeout).await?;
        serde_json::from_str(&body).map_err(ClientError::from)
    }

    /// POST a JSON body and decode the JSON response. Never cached.
    pub async fn post_json<T>(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[Header<'_>],
        body: &serde_json::Value,
        timeout: Duration,
    ) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let body_str = serde_json::to_string(body)?;

        let request = self
            .client
            .post(url)
            .query(params)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body_str);
        let text = self.send(with_headers(request, headers), timeout).await?;

        serde_json::from_str(&text).map_err(ClientError::from)
    }

    /// Send a request under a hard timeout and read the body.
    async fn send(&self, request: RequestBuilder, timeout: Duration) -> ClientResult<String> {
        let exchange = async {
            let response = request.send().await?;
            let response = self.handle_response(response).await?;
            let body = response.text().await?;
            Ok::<_, ClientError>(body)
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| ClientError::Timeout(timeout))?
    }

    /// Handle API response status codes.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            code @ (401 | 403) => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::unauthorized(code, text))
            }
            404 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::not_found(text))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }

    /// Generate cache key.
    fn cache_key(&self, method: &str, url: &str, params: &[(String, String)]) -> String {
        use md5::{Digest, Md5};

        let mut hasher = Md5::new();
        hasher.update(method.as_bytes());
        hasher.update(b"|");
        hasher.update(url.as_bytes());
        hasher.update(b"|");

        for (k, v) in params {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"&");
        }

        format!("{:x}", hasher.finalize())
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[Header<'_>]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("cache_enabled", &self.cache.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_cache_key_depends_on_params() {
        let client = HttpClient::new(&Config::default()).unwrap();
        let a = client.cache_key("GET", "http://x/search", &params(&[("q", "agents")]));
        let b = client.cache_key("GET", "http://x/search", &params(&[("q", "robots")]));
        let c = client.cache_key("GET", "http://x/search", &params(&[("q", "agents")]));
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_testing_config_disables_cache() {
        let client = HttpClient::new(&Config::for_testing("http://127.0.0.1:1")).unwrap();
        assert!(format!("{client:?}").contains("cache_enabled: false"));
    }
}
