use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::cms::client::base_url;
use crate::error::{CmsError, CmsResult};
use crate::models::config::StackConfig;

/// 管理 API 返回的条目详情，只保留发布流程关心的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryDetails {
    pub uid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "_workflow", alias = "workflow")]
    pub workflow: Value,
    #[serde(default)]
    pub publish_details: Value,
}

#[derive(Debug, Deserialize)]
struct EntryResponse {
    entry: EntryDetails,
}

/// 条目管理接口
#[async_trait]
pub trait ManagementApi: Send + Sync {
    async fn get_entry(&self, content_type_uid: &str, entry_uid: &str) -> CmsResult<EntryDetails>;

    async fn publish_entry(
        &self,
        content_type_uid: &str,
        entry_uid: &str,
        environments: &[String],
        locales: &[String],
    ) -> CmsResult<Value>;

    /// API 基础地址，用于状态展示
    fn api_url(&self) -> String;
}

/// 基于内容管理 REST API 的实现
#[derive(Clone)]
pub struct ManagementClient {
    http: reqwest::Client,
    api_key: String,
    token: String,
    base: Url,
}

impl ManagementClient {
    pub fn new(config: &StackConfig) -> CmsResult<Self> {
        let token = config.management.token.clone().unwrap_or_default();
        if token.is_empty() {
            warn!("management token is not configured; publishing will be rejected");
        }
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            token,
            base: base_url(&config.endpoints().content_management)?,
        })
    }

    pub fn entry_url(&self, content_type_uid: &str, entry_uid: &str) -> String {
        format!(
            "{}/v3/content_types/{}/entries/{}",
            self.base.as_str().trim_end_matches('/'),
            content_type_uid,
            entry_uid
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("api_key", &self.api_key)
            .header("authorization", &self.token)
    }
}

async fn check(response: reqwest::Response) -> CmsResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CmsError::Status {
        status: status.as_u16(),
        body,
    })
}

/// 发布请求体
pub fn publish_body(environments: &[String], locales: &[String]) -> Value {
    json!({
        "entry": {
            "environments": environments,
            "locales": locales,
        }
    })
}

#[async_trait]
impl ManagementApi for ManagementClient {
    async fn get_entry(&self, content_type_uid: &str, entry_uid: &str) -> CmsResult<EntryDetails> {
        let url = self.entry_url(content_type_uid, entry_uid);
        debug!(%url, "fetching entry details");

        let response = check(self.request(reqwest::Method::GET, &url).send().await?).await?;
        let body: EntryResponse = response.json().await?;
        Ok(body.entry)
    }

    async fn publish_entry(
        &self,
        content_type_uid: &str,
        entry_uid: &str,
        environments: &[String],
        locales: &[String],
    ) -> CmsResult<Value> {
        let url = format!("{}/publish", self.entry_url(content_type_uid, entry_uid));
        info!(
            entry_uid,
            content_type_uid,
            ?environments,
            %url,
            "publishing entry"
        );

        let response = check(
            self.request(reqwest::Method::POST, &url)
                .json(&publish_body(environments, locales))
                .send()
                .await?,
        )
        .await?;

        let body: Value = response.json().await.unwrap_or(Value::Null);
        info!(entry_uid, "entry published");
        Ok(body)
    }

    fn api_url(&self) -> String {
        self.base.as_str().trim_end_matches('/').to_string()
    }
}
