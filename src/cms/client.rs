use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::cms::editable::add_editable_tags;
use crate::error::{CmsError, CmsResult};
use crate::models::config::StackConfig;
use crate::models::{Author, BlogPost, Category, Footer, Header, Page};

/// 页面需要展开的引用
pub const PAGE_REFERENCES: &[&str] = &[
    "page_components.featured_article_section.article_ref",
    "page_components.featured_article_section.article_ref.author",
    "page_components.featured_article_section.article_ref.category",
    "page_components.recent_articles_list.categorie_filter",
];

/// 文章需要展开的引用
pub const POST_REFERENCES: &[&str] = &["author", "category"];

/// 最新文章默认条数
pub const DEFAULT_RECENT_LIMIT: usize = 3;

/// 一次实时预览会话，来自编辑器附加到 URL 上的参数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewContext {
    pub hash: String,
    pub content_type_uid: Option<String>,
    pub entry_uid: Option<String>,
}

/// 内容读取接口
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// 按 URL 获取页面
    async fn get_page(&self, url: &str) -> CmsResult<Option<Page>>;

    /// 最新文章，可按分类过滤
    async fn get_recent_blog_posts(
        &self,
        category_uid: Option<&str>,
        limit: usize,
    ) -> CmsResult<Vec<BlogPost>>;

    async fn get_blog_posts(&self) -> CmsResult<Vec<BlogPost>>;

    async fn get_blog_post(&self, slug: &str) -> CmsResult<Option<BlogPost>>;

    async fn get_similar_blog_posts(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>>;

    async fn get_author(&self, slug: &str) -> CmsResult<Option<Author>>;

    async fn get_author_articles(&self, author_uid: &str, limit: usize)
        -> CmsResult<Vec<BlogPost>>;

    async fn get_categories(&self) -> CmsResult<Vec<Category>>;

    async fn get_category(&self, slug: &str) -> CmsResult<Option<Category>>;

    async fn get_category_articles(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>>;

    async fn get_header(&self) -> CmsResult<Option<Header>>;

    async fn get_footer(&self) -> CmsResult<Option<Footer>>;

    /// 绑定到一次预览会话的读取器
    fn with_preview(&self, preview: PreviewContext) -> Arc<dyn ContentStore>;
}

/// 条目查询
#[derive(Debug, Clone)]
pub struct EntryQuery {
    content_type: String,
    conditions: Map<String, Value>,
    references: Vec<String>,
    order_desc: Option<String>,
    limit: Option<usize>,
}

impl EntryQuery {
    pub fn new(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            conditions: Map::new(),
            references: Vec::new(),
            order_desc: None,
            limit: None,
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn include_references(mut self, paths: &[&str]) -> Self {
        self.references.extend(paths.iter().map(|p| p.to_string()));
        self
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.to_string(), value.into());
        self
    }

    /// 任一字段匹配即可
    pub fn where_any(mut self, alternatives: Vec<(&str, Value)>) -> Self {
        let clauses: Vec<Value> = alternatives
            .into_iter()
            .map(|(field, value)| {
                let mut clause = Map::new();
                clause.insert(field.to_string(), value);
                Value::Object(clause)
            })
            .collect();
        self.conditions.insert("$or".to_string(), Value::Array(clauses));
        self
    }

    pub fn order_by_descending(mut self, field: &str) -> Self {
        self.order_desc = Some(field.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 内容分发 API 的查询参数
    pub fn params(&self, environment: &str, locale: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("environment".to_string(), environment.to_string()),
            ("locale".to_string(), locale.to_string()),
            ("include_fallback".to_string(), "true".to_string()),
        ];
        if !self.conditions.is_empty() {
            params.push((
                "query".to_string(),
                Value::Object(self.conditions.clone()).to_string(),
            ));
        }
        for reference in &self.references {
            params.push(("include[]".to_string(), reference.clone()));
        }
        if let Some(field) = &self.order_desc {
            params.push(("desc".to_string(), field.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    entries: Vec<Value>,
}

/// 连接参数，所有预览会话共享
#[derive(Debug)]
struct DeliverySettings {
    api_key: String,
    delivery_token: String,
    environment: String,
    locale: String,
    delivery_base: Url,
    preview_enabled: bool,
    preview_token: Option<String>,
    preview_base: Url,
}

/// 基于内容分发 REST API 的实现
#[derive(Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    settings: Arc<DeliverySettings>,
    preview: Option<PreviewContext>,
}

/// 主机名补全为 https 基础地址，已带协议的保持不变
pub fn base_url(host: &str) -> CmsResult<Url> {
    let host = host.trim().trim_end_matches('/');
    let candidate = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    Url::parse(&candidate).map_err(|e| CmsError::Config(format!("invalid host `{host}`: {e}")))
}

impl DeliveryClient {
    pub fn new(config: &StackConfig) -> CmsResult<Self> {
        if config.api_key.is_empty() || config.delivery_token.is_empty() {
            warn!("stack api_key or delivery_token is empty; content requests will be rejected");
        }
        let endpoints = config.endpoints();
        let settings = DeliverySettings {
            api_key: config.api_key.clone(),
            delivery_token: config.delivery_token.clone(),
            environment: config.environment.clone(),
            locale: config.locale.clone(),
            delivery_base: base_url(&endpoints.content_delivery)?,
            preview_enabled: config.preview.enable,
            preview_token: config.preview.token.clone(),
            preview_base: base_url(&endpoints.preview)?,
        };
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            settings: Arc::new(settings),
            preview: None,
        })
    }

    pub fn preview_enabled(&self) -> bool {
        self.settings.preview_enabled
    }

    /// 预览会话且有预览令牌时走预览主机
    fn uses_preview_host(&self) -> bool {
        self.settings.preview_enabled
            && self.preview.is_some()
            && self.settings.preview_token.is_some()
    }

    fn entries_url(&self, content_type: &str) -> String {
        let base = if self.uses_preview_host() {
            &self.settings.preview_base
        } else {
            &self.settings.delivery_base
        };
        format!(
            "{}/v3/content_types/{}/entries",
            base.as_str().trim_end_matches('/'),
            content_type
        )
    }

    async fn find<T: DeserializeOwned>(&self, query: &EntryQuery) -> CmsResult<Vec<T>> {
        let settings = &self.settings;
        let url = self.entries_url(query.content_type());
        debug!(content_type = %query.content_type(), %url, "querying entries");

        let mut request = self
            .http
            .get(&url)
            .query(&query.params(&settings.environment, &settings.locale))
            .header("api_key", &settings.api_key);

        request = match (&self.preview, &settings.preview_token) {
            (Some(preview), Some(token)) if self.uses_preview_host() => request
                .header("preview_token", token)
                .header("live_preview", &preview.hash),
            _ => request.header("access_token", &settings.delivery_token),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: EntriesResponse = response.json().await?;
        body.entries
            .into_iter()
            .map(|mut entry| {
                if settings.preview_enabled {
                    add_editable_tags(&mut entry, query.content_type(), &settings.locale);
                }
                serde_json::from_value(entry).map_err(|source| CmsError::Decode {
                    content_type: query.content_type().to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn find_one<T: DeserializeOwned>(&self, query: EntryQuery) -> CmsResult<Option<T>> {
        Ok(self.find(&query.limit(1)).await?.into_iter().next())
    }

    fn posts() -> EntryQuery {
        EntryQuery::new("blog_post")
            .include_references(POST_REFERENCES)
            .order_by_descending("published_date")
    }
}

/// slug 可以是 uid，也可以是 URL 的最后一段
fn slug_lookup(query: EntryQuery, prefix: &str, slug: &str) -> EntryQuery {
    query.where_any(vec![
        ("uid", Value::from(slug)),
        ("url", Value::from(format!("{prefix}/{slug}"))),
    ])
}

#[async_trait]
impl ContentStore for DeliveryClient {
    async fn get_page(&self, url: &str) -> CmsResult<Option<Page>> {
        let query = EntryQuery::new("page")
            .include_references(PAGE_REFERENCES)
            .where_eq("url", url);
        self.find_one(query).await
    }

    async fn get_recent_blog_posts(
        &self,
        category_uid: Option<&str>,
        limit: usize,
    ) -> CmsResult<Vec<BlogPost>> {
        debug!(?category_uid, limit, "fetching recent blog posts");
        let mut query = Self::posts().limit(limit);
        if let Some(uid) = category_uid {
            query = query.where_eq("category.uid", uid);
        }
        self.find(&query).await
    }

    async fn get_blog_posts(&self) -> CmsResult<Vec<BlogPost>> {
        self.find(&Self::posts()).await
    }

    async fn get_blog_post(&self, slug: &str) -> CmsResult<Option<BlogPost>> {
        self.find_one(slug_lookup(Self::posts(), "/blog", slug)).await
    }

    async fn get_similar_blog_posts(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>> {
        self.find(&Self::posts().where_eq("category.uid", category_uid))
            .await
    }

    async fn get_author(&self, slug: &str) -> CmsResult<Option<Author>> {
        self.find_one(slug_lookup(EntryQuery::new("author"), "/auteur", slug))
            .await
    }

    async fn get_author_articles(
        &self,
        author_uid: &str,
        limit: usize,
    ) -> CmsResult<Vec<BlogPost>> {
        self.find(&Self::posts().where_eq("author.uid", author_uid).limit(limit))
            .await
    }

    async fn get_categories(&self) -> CmsResult<Vec<Category>> {
        self.find(&EntryQuery::new("category")).await
    }

    async fn get_category(&self, slug: &str) -> CmsResult<Option<Category>> {
        self.find_one(slug_lookup(EntryQuery::new("category"), "/categorie", slug))
            .await
    }

    async fn get_category_articles(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>> {
        self.find(&Self::posts().where_eq("category.uid", category_uid))
            .await
    }

    async fn get_header(&self) -> CmsResult<Option<Header>> {
        self.find_one(EntryQuery::new("header")).await
    }

    async fn get_footer(&self) -> CmsResult<Option<Footer>> {
        self.find_one(EntryQuery::new("footer")).await
    }

    fn with_preview(&self, preview: PreviewContext) -> Arc<dyn ContentStore> {
        let mut client = self.clone();
        client.preview = Some(preview);
        Arc::new(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn recent_posts_query_carries_filter_order_and_limit() {
        let query = EntryQuery::new("blog_post")
            .include_references(POST_REFERENCES)
            .where_eq("category.uid", "cat1")
            .order_by_descending("published_date")
            .limit(3);

        let params = query.params("production", "en-us");
        assert_eq!(param(&params, "environment"), vec!["production"]);
        assert_eq!(param(&params, "include[]"), vec!["author", "category"]);
        assert_eq!(param(&params, "desc"), vec!["published_date"]);
        assert_eq!(param(&params, "limit"), vec!["3"]);

        let condition: Value = serde_json::from_str(param(&params, "query")[0]).unwrap();
        assert_eq!(condition, json!({ "category.uid": "cat1" }));
    }

    #[test]
    fn query_without_conditions_omits_query_param() {
        let params = EntryQuery::new("category").params("dev", "fr-fr");
        assert!(param(&params, "query").is_empty());
        assert_eq!(param(&params, "locale"), vec!["fr-fr"]);
    }

    #[test]
    fn slug_lookup_matches_uid_or_url() {
        let params = slug_lookup(EntryQuery::new("author"), "/auteur", "marie").params("dev", "en-us");
        let condition: Value = serde_json::from_str(param(&params, "query")[0]).unwrap();
        assert_eq!(
            condition,
            json!({ "$or": [{ "uid": "marie" }, { "url": "/auteur/marie" }] })
        );
    }

    #[test]
    fn base_url_adds_scheme_only_when_missing() {
        assert_eq!(
            base_url("eu-cdn.contentstack.com").unwrap().as_str(),
            "https://eu-cdn.contentstack.com/"
        );
        assert_eq!(
            base_url("http://localhost:9000/").unwrap().as_str(),
            "http://localhost:9000/"
        );
        assert!(base_url("exa mple").is_err());
    }

    #[test]
    fn preview_session_switches_to_preview_host() {
        let mut stack = StackConfig::default();
        stack.api_key = "key".to_string();
        stack.delivery_token = "token".to_string();
        stack.preview.enable = true;
        stack.preview.token = Some("preview".to_string());

        let client = DeliveryClient::new(&stack).unwrap();
        assert_eq!(
            client.entries_url("page"),
            "https://eu-cdn.contentstack.com/v3/content_types/page/entries"
        );

        let mut previewing = client.clone();
        previewing.preview = Some(PreviewContext {
            hash: "abc".to_string(),
            ..Default::default()
        });
        assert_eq!(
            previewing.entries_url("page"),
            "https://eu-rest-preview.contentstack.com/v3/content_types/page/entries"
        );
    }
}
