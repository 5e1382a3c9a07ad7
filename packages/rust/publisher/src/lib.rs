//! Document API client for publishing reports.
//!
//! Talks to the Feishu/Lark open platform: exchanges app credentials for a
//! tenant token, inserts document blocks in batches, creates documents and
//! grants member permissions. Nothing is retried.

use dailypaper_markdown::Block;
use dailypaper_shared::{DailyPaperError, FeishuConfig, Result};
use dailypaper_sources::HttpClient;
use dailypaper_sources::http::endpoint;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

const TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
const DOCUMENTS_PATH: &str = "/open-apis/docx/v1/documents";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Common response envelope; `code == 0` means success.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChildrenPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    document: DocumentRef,
}

#[derive(Debug, Deserialize)]
struct DocumentRef {
    document_id: String,
}

#[derive(Serialize)]
struct InsertRequest<'a> {
    children: &'a [Block],
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
}

// ---------------------------------------------------------------------------
// Publish types
// ---------------------------------------------------------------------------

/// Where new content goes in an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Above the existing content, newest first.
    Prepend,
    /// After the existing content.
    Append,
}

/// Outcome of a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub inserted: usize,
    pub total: usize,
    pub failed_batches: usize,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed_batches == 0 && self.inserted == self.total
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client for one tenant.
#[derive(Debug, Clone)]
pub struct FeishuClient {
    http: HttpClient,
    base_url: String,
    token: String,
    batch_size: usize,
}

impl FeishuClient {
    /// Exchange app credentials for a tenant token.
    #[instrument(skip_all, fields(app_id = %config.app_id))]
    pub async fn connect(config: &FeishuConfig, app_secret: &str, timeout_secs: u64) -> Result<Self> {
        let http = HttpClient::new(timeout_secs)?;
        let url = endpoint(&config.base_url, TOKEN_PATH)?;
        let body = serde_json::json!({ "app_id": config.app_id, "app_secret": app_secret });

        let response: TokenResponse = send(http.post(url.clone()).json(&body), &url).await?;
        if response.code != 0 {
            return Err(DailyPaperError::Publish(format!(
                "token exchange failed: code {}: {}",
                response.code, response.msg
            )));
        }
        let token = response
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DailyPaperError::Publish("token exchange returned no token".into()))?;

        info!("obtained tenant access token");
        Ok(Self::from_parts(http, config, token))
    }

    /// Use an already issued token.
    pub fn with_token(config: &FeishuConfig, token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self::from_parts(HttpClient::new(timeout_secs)?, config, token.into()))
    }

    fn from_parts(http: HttpClient, config: &FeishuConfig, token: String) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            token,
            batch_size: config.batch_size.max(1),
        }
    }

    fn children_url(&self, doc_id: &str) -> Result<Url> {
        endpoint(
            &self.base_url,
            &format!("{DOCUMENTS_PATH}/{doc_id}/blocks/{doc_id}/children"),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Top-level blocks currently in the document.
    pub async fn list_children(&self, doc_id: &str) -> Result<Vec<serde_json::Value>> {
        let url = self.children_url(doc_id)?;
        let response: ApiResponse<ChildrenPage> =
            send(self.authorized(self.http.get(url.clone())), &url).await?;
        Ok(checked(response, "list blocks")?.unwrap_or_default().items)
    }

    /// Insert one batch at `index`, or at the end when `index` is `None`.
    pub async fn insert_children(&self, doc_id: &str, blocks: &[Block], index: Option<usize>) -> Result<()> {
        let url = self.children_url(doc_id)?;
        let body = InsertRequest {
            children: blocks,
            index,
        };
        let response: ApiResponse<serde_json::Value> =
            send(self.authorized(self.http.post(url.clone()).json(&body)), &url).await?;
        checked(response, "insert blocks").map(|_| ())
    }

    /// Write `blocks` plus a trailing divider into the document.
    ///
    /// Prepending only applies to a non-empty document; an empty one is
    /// appended to. A failed batch is counted and the remaining batches
    /// still run.
    #[instrument(skip(self, blocks), fields(blocks = blocks.len()))]
    pub async fn publish(&self, doc_id: &str, mut blocks: Vec<Block>, mode: InsertMode) -> Result<PublishReport> {
        let existing = self.list_children(doc_id).await?;
        blocks.push(Block::Divider);

        let mut index = (mode == InsertMode::Prepend && !existing.is_empty()).then_some(0);
        info!(existing = existing.len(), prepend = index.is_some(), "publishing blocks");

        let mut report = PublishReport {
            inserted: 0,
            total: blocks.len(),
            failed_batches: 0,
        };
        for (n, batch) in blocks.chunks(self.batch_size).enumerate() {
            match self.insert_children(doc_id, batch, index).await {
                Ok(()) => {
                    report.inserted += batch.len();
                    if let Some(i) = index.as_mut() {
                        *i += batch.len();
                    }
                    info!(batch = n + 1, count = batch.len(), "inserted batch");
                }
                Err(e) => {
                    report.failed_batches += 1;
                    warn!(batch = n + 1, error = %e, "batch insert failed");
                }
            }
        }

        info!(inserted = report.inserted, total = report.total, "publish finished");
        Ok(report)
    }

    /// Create an empty document and return its id.
    pub async fn create_document(&self, title: &str) -> Result<String> {
        let url = endpoint(&self.base_url, DOCUMENTS_PATH)?;
        let body = serde_json::json!({ "title": title });
        let response: ApiResponse<CreatedDocument> =
            send(self.authorized(self.http.post(url.clone()).json(&body)), &url).await?;
        let created = checked(response, "create document")?
            .ok_or_else(|| DailyPaperError::Publish("create document returned no data".into()))?;
        info!(doc_id = %created.document.document_id, "created document");
        Ok(created.document.document_id)
    }

    /// Give a member (by open id) full access to a document.
    pub async fn grant_permission(&self, doc_id: &str, member_id: &str) -> Result<()> {
        let mut url = endpoint(
            &self.base_url,
            &format!("/open-apis/drive/v1/permissions/{doc_id}/members"),
        )?;
        url.query_pairs_mut().append_pair("type", "docx");
        let body = serde_json::json!({
            "member_type": "openid",
            "member_id": member_id,
            "perm": "full_access",
        });
        let response: ApiResponse<serde_json::Value> =
            send(self.authorized(self.http.post(url.clone()).json(&body)), &url).await?;
        checked(response, "grant permission").map(|_| ())
    }
}

/// Send and decode the JSON body. Error statuses still carry an envelope, so
/// the body is decoded regardless of status.
async fn send<T: DeserializeOwned>(request: RequestBuilder, url: &Url) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| DailyPaperError::Network(format!("{url}: {e}")))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DailyPaperError::Network(format!("{url}: failed to read body: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|_| DailyPaperError::Network(format!("{url}: HTTP {status}")))
}

fn checked<T>(response: ApiResponse<T>, what: &str) -> Result<Option<T>> {
    if response.code != 0 {
        return Err(DailyPaperError::Publish(format!(
            "{what}: code {}: {}",
            response.code, response.msg
        )));
    }
    Ok(response.data)
}

#[cfg(test)]
mod tests {
    use dailypaper_markdown::parse_blocks;

    use super::*;

    fn config(base_url: String, batch_size: usize) -> FeishuConfig {
        FeishuConfig {
            base_url,
            app_id: "cli_test".into(),
            batch_size,
            ..FeishuConfig::default()
        }
    }

    const CHILDREN: &str = "/open-apis/docx/v1/documents/doc1/blocks/doc1/children";

    async fn mount_children(server: &wiremock::MockServer, items: serde_json::Value) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(CHILDREN))
            .and(wiremock::matchers::header("Authorization", "Bearer t-abc"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "success",
                "data": {"has_more": false, "items": items}
            })))
            .mount(server)
            .await;
    }

    async fn insert_bodies(server: &wiremock::MockServer) -> Vec<serde_json::Value> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn connect_exchanges_credentials() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(TOKEN_PATH))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "app_id": "cli_test",
                "app_secret": "s3cret"
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "msg": "ok",
                "tenant_access_token": "t-abc",
                "expire": 7200
            })))
            .mount(&server)
            .await;
        mount_children(&server, serde_json::json!([])).await;

        let client = FeishuClient::connect(&config(server.uri(), 30), "s3cret", 5)
            .await
            .unwrap();
        assert!(client.list_children("doc1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(TOKEN_PATH))
            .respond_with(wiremock::ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 10003,
                "msg": "invalid param"
            })))
            .mount(&server)
            .await;

        let err = FeishuClient::connect(&config(server.uri(), 30), "bad", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, DailyPaperError::Publish(_)));
        assert!(err.to_string().contains("10003"));
    }

    #[tokio::test]
    async fn prepend_advances_index_per_batch() {
        let server = wiremock::MockServer::start().await;
        mount_children(&server, serde_json::json!([{"block_id": "b1", "block_type": 2}])).await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(CHILDREN))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = FeishuClient::with_token(&config(server.uri(), 2), "t-abc", 5).unwrap();
        let blocks = parse_blocks("# Title\n- **a**: [b](https://c.d)\ntext");
        let report = client.publish("doc1", blocks, InsertMode::Prepend).await.unwrap();

        assert_eq!(
            report,
            PublishReport {
                inserted: 4,
                total: 4,
                failed_batches: 0
            }
        );
        assert!(report.is_complete());

        let bodies = insert_bodies(&server).await;
        assert_eq!(bodies[0]["index"], 0);
        assert_eq!(bodies[1]["index"], 2);
        assert_eq!(bodies[0]["children"][0]["block_type"], 3);
        assert_eq!(bodies[1]["children"][1], serde_json::json!({"block_type": 22, "divider": {}}));
    }

    #[tokio::test]
    async fn empty_document_is_appended_to() {
        let server = wiremock::MockServer::start().await;
        mount_children(&server, serde_json::json!([])).await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(CHILDREN))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0})))
            .mount(&server)
            .await;

        let client = FeishuClient::with_token(&config(server.uri(), 30), "t-abc", 5).unwrap();
        let report = client
            .publish("doc1", parse_blocks("one\ntwo"), InsertMode::Prepend)
            .await
            .unwrap();
        assert_eq!(report.inserted, 3);

        let bodies = insert_bodies(&server).await;
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].get("index").is_none());
    }

    #[tokio::test]
    async fn failed_batch_is_counted_and_others_continue() {
        let server = wiremock::MockServer::start().await;
        mount_children(&server, serde_json::json!([{"block_id": "b1"}])).await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(CHILDREN))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 1770001,
                "msg": "invalid param"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(CHILDREN))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0})))
            .mount(&server)
            .await;

        let client = FeishuClient::with_token(&config(server.uri(), 2), "t-abc", 5).unwrap();
        let report = client
            .publish("doc1", parse_blocks("a\nb\nc\nd\ne"), InsertMode::Prepend)
            .await
            .unwrap();

        assert_eq!(report.total, 6);
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.inserted, 4);
        assert!(!report.is_complete());

        // The failed first batch does not move the insertion point.
        let bodies = insert_bodies(&server).await;
        let indexes: Vec<i64> = bodies.iter().map(|b| b["index"].as_i64().unwrap()).collect();
        assert_eq!(indexes, [0, 0, 2]);
    }

    #[tokio::test]
    async fn create_document_and_grant_access() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(DOCUMENTS_PATH))
            .and(wiremock::matchers::body_json(serde_json::json!({"title": "Weekly"})))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {"document": {"document_id": "doxNew", "revision_id": 1}}
            })))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/open-apis/drive/v1/permissions/doxNew/members"))
            .and(wiremock::matchers::query_param("type", "docx"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "member_type": "openid",
                "member_id": "ou_123",
                "perm": "full_access"
            })))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0})))
            .expect(1)
            .mount(&server)
            .await;

        let client = FeishuClient::with_token(&config(server.uri(), 30), "t-abc", 5).unwrap();
        let doc_id = client.create_document("Weekly").await.unwrap();
        assert_eq!(doc_id, "doxNew");
        client.grant_permission(&doc_id, "ou_123").await.unwrap();
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_inserting() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(CHILDREN))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 99991663,
                "msg": "token invalid"
            })))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = FeishuClient::with_token(&config(server.uri(), 30), "t-abc", 5).unwrap();
        let err = client
            .publish("doc1", parse_blocks("x"), InsertMode::Append)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("99991663"));
    }
}
