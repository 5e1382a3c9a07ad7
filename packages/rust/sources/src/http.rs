//! Thin wrapper over `reqwest` shared by all HTTP adapters.

use std::time::Duration;

use dailypaper_shared::{DailyPaperError, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

/// User-Agent string for all source requests.
const USER_AGENT: &str = concat!("DailyPaper/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// HTTP client with a default timeout; adapters may override it per request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DailyPaperError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Start a GET request.
    pub fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    /// Start a POST request.
    pub fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and return the body of a 2xx response.
    pub async fn send_text(&self, request: RequestBuilder, url: &Url) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| DailyPaperError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DailyPaperError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| DailyPaperError::Network(format!("{url}: failed to read body: {e}")))
    }

    /// Send a request and decode a 2xx JSON response.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T> {
        let body = self.send_text(request, url).await?;
        serde_json::from_str(&body).map_err(|e| DailyPaperError::parse(format!("{url}: {e}")))
    }
}

/// Join a configured base URL and an API path, keeping any path prefix on the base.
pub fn endpoint(base: &str, path: &str) -> Result<Url> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| DailyPaperError::config(format!("invalid URL {joined}: {e}")))
}

/// Decode each element of a JSON array on its own, skipping the ones that do not fit.
pub fn decode_items<T: DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(error = %e, what, "skipping malformed item");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_prefix() {
        let url = endpoint("https://proxy.example.com/s2/", "/graph/v1/paper/search").unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/s2/graph/v1/paper/search");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(endpoint("not a url", "/x").is_err());
    }

    #[test]
    fn decode_items_skips_bad_entries() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: String,
        }
        let raw = serde_json::json!([{"id": "a"}, {"id": 3}, {"other": true}, {"id": "b"}]);
        let serde_json::Value::Array(items) = raw else {
            unreachable!()
        };
        let decoded: Vec<Item> = decode_items(items, "test");
        let ids: Vec<&str> = decoded.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let http = HttpClient::new(5).unwrap();
        let url = endpoint(&server.uri(), "/anything").unwrap();
        let err = http.send_text(http.get(url.clone()), &url).await.unwrap_err();
        assert!(matches!(err, DailyPaperError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn post_sends_user_agent_and_body() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/api/v1/items"))
            .and(wiremock::matchers::header("User-Agent", USER_AGENT))
            .and(wiremock::matchers::body_json(serde_json::json!({"name": "x"})))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("{\"ok\": true}"))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::new(5).unwrap();
        let url = endpoint(&format!("{}/api", server.uri()), "/v1/items").unwrap();
        let request = http.post(url.clone()).json(&serde_json::json!({"name": "x"}));
        let body: serde_json::Value = http.send_json(request, &url).await.unwrap();
        assert_eq!(body["ok"], true);
    }
}
