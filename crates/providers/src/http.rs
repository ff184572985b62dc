//! Shared HTTP client with an optional response cache.

use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::error::{ProviderError, ProviderResult};

/// Query parameters whose values are coordinates and get rounded in cache keys.
const COORDINATE_PARAMS: &[&str] = &["lat", "lon", "latitude", "longitude", "locations"];

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("biosample-enricher/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    86_400
}

fn default_coord_precision() -> u32 {
    4
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Decimal places kept for coordinates in cache keys.
    #[serde(default = "default_coord_precision")]
    pub coord_precision: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            coord_precision: default_coord_precision(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            cache: CacheConfig::default(),
        }
    }
}

/// Per-request cache control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub read_from_cache: bool,
    pub write_to_cache: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            read_from_cache: true,
            write_to_cache: true,
        }
    }
}

impl RequestOptions {
    /// Neither read nor write the cache.
    pub fn bypass() -> Self {
        Self {
            read_from_cache: false,
            write_to_cache: false,
        }
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Whether the response came from the cache.
    pub cached: bool,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> ProviderResult<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ProviderError::Parse(format!("response is not UTF-8: {}", e)))
    }

    pub fn json<T: DeserializeOwned>(&self) -> ProviderResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into [`ProviderError::Status`].
    pub fn error_for_status(self, url: &str) -> ProviderResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ProviderError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

fn round_coordinate(value: &str, precision: u32) -> String {
    value
        .split(',')
        .map(|part| match part.trim().parse::<f64>() {
            Ok(v) => format!("{:.*}", precision as usize, v),
            Err(_) => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Canonical cache key: method, URL and sorted parameters with coordinates
/// rounded to `precision` decimals.
pub fn cache_key(method: &str, url: &str, params: &[(&str, String)], precision: u32) -> String {
    let mut canonical: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            let value = if COORDINATE_PARAMS.contains(k) {
                round_coordinate(v, precision)
            } else {
                v.clone()
            };
            (k.to_string(), value)
        })
        .collect();
    canonical.sort();

    let query = canonical
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        format!("{} {}", method, url)
    } else {
        format!("{} {}?{}", method, url, query)
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Get,
    PostForm,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::PostForm => "POST",
        }
    }
}

/// HTTP client shared by all providers.
pub struct HttpClient {
    client: reqwest::Client,
    cache: Option<ResponseCache>,
    coord_precision: u32,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        let cache = config
            .cache
            .enabled
            .then(|| ResponseCache::new(config.cache.max_entries, config.cache.ttl_secs));

        Ok(Self {
            client,
            cache,
            coord_precision: config.cache.coord_precision,
        })
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// GET `url` with query parameters.
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        options: RequestOptions,
    ) -> ProviderResult<HttpResponse> {
        self.send(Method::Get, url, params, options).await
    }

    /// POST `form` to `url` as `application/x-www-form-urlencoded`.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        options: RequestOptions,
    ) -> ProviderResult<HttpResponse> {
        self.send(Method::PostForm, url, form, options).await
    }

    #[instrument(skip(self, params, options), fields(method = method.as_str()))]
    async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, String)],
        options: RequestOptions,
    ) -> ProviderResult<HttpResponse> {
        let key = cache_key(method.as_str(), url, params, self.coord_precision);

        if options.read_from_cache {
            if let Some(cache) = &self.cache {
                if let Some((status, body)) = cache.get(&key).await {
                    debug!("Cache hit");
                    return Ok(HttpResponse {
                        status,
                        body,
                        cached: true,
                    });
                }
            }
        }

        let request = match method {
            Method::Get => self.client.get(url).query(params),
            Method::PostForm => self.client.post(url).form(params),
        };
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        debug!(status, bytes = body.len(), "Fetched");

        let response = HttpResponse {
            status,
            body,
            cached: false,
        };

        if options.write_to_cache && response.is_success() {
            if let Some(cache) = &self.cache {
                cache.put(key, status, response.body.clone()).await;
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_sorts_and_rounds() {
        let a = cache_key(
            "GET",
            "https://api.example.org/v1",
            &[("longitude", "-85.400001".into()), ("latitude", "42.50003".into())],
            4,
        );
        let b = cache_key(
            "GET",
            "https://api.example.org/v1",
            &[("latitude", "42.5".into()), ("longitude", "-85.4".into())],
            4,
        );
        assert_eq!(a, b);
        assert_eq!(a, "GET https://api.example.org/v1?latitude=42.5000&longitude=-85.4000");
    }

    #[test]
    fn test_cache_key_leaves_other_params() {
        let key = cache_key("GET", "u", &[("start_date", "2018-07-12".into()), ("hourly", "a,b".into())], 2);
        assert_eq!(key, "GET u?hourly=a,b&start_date=2018-07-12");
    }

    #[test]
    fn test_cache_key_rounds_location_pairs() {
        let key = cache_key("GET", "u", &[("locations", "42.123456,-85.987654".into())], 3);
        assert_eq!(key, "GET u?locations=42.123,-85.988");
    }

    #[test]
    fn test_cache_key_distinguishes_method() {
        assert_ne!(cache_key("GET", "u", &[], 4), cache_key("POST", "u", &[], 4));
        assert_eq!(cache_key("GET", "u", &[], 4), "GET u");
    }

    #[test]
    fn test_response_accessors() {
        let response = HttpResponse {
            status: 200,
            body: Bytes::from_static(br#"{"results":[{"elevation":-10.0}]}"#),
            cached: false,
        };
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["results"][0]["elevation"], -10.0);
        assert!(response.text().unwrap().contains("elevation"));

        let failed = HttpResponse { status: 404, body: Bytes::new(), cached: false };
        assert!(matches!(failed.error_for_status("u"), Err(ProviderError::Status { status: 404, .. })));
    }

    #[test]
    fn test_cached_response_served_without_network() {
        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let url = "https://invalid.example/gebco";
        let key = cache_key("GET", url, &[("locations", "0.0,-150.0".to_string())], 4);

        tokio_test::block_on(async {
            client.cache().unwrap().put(key, 200, Bytes::from_static(b"{}")).await;

            // Rounds to the stored key, so no request leaves the process.
            let params = [("locations", "0.00001,-150.00001".to_string())];
            let response = client.get(url, &params, RequestOptions::default()).await.unwrap();
            assert!(response.cached);
            assert_eq!(response.body, Bytes::from_static(b"{}"));
        });
    }

    #[test]
    fn test_config_defaults_from_empty_object() {
        let config: HttpConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.coord_precision, 4);
        assert!(config.user_agent.starts_with("biosample-enricher/"));
    }
}
