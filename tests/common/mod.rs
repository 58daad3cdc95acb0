//! 集成测试共用的内存实现和站点数据

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

use stack_blog::cms::{ContentStore, EntryDetails, ManagementApi, PreviewContext};
use stack_blog::core::{router, AppState, PublishSettings, SiteEngine, WebhookPublisher};
use stack_blog::error::{CmsError, CmsResult};
use stack_blog::models::{Author, BlogPost, Category, Config, Footer, Header, Page};
use stack_blog::ThemeRenderer;

fn from_json<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

fn failure(operation: &str) -> CmsError {
    CmsError::Status {
        status: 500,
        body: format!("{operation} unavailable"),
    }
}

/// 内存内容库
#[derive(Clone, Default)]
pub struct FakeStore {
    pub pages: HashMap<String, Page>,
    pub posts: Vec<BlogPost>,
    pub authors: Vec<Author>,
    pub categories: Vec<Category>,
    pub header: Option<Header>,
    pub footer: Option<Footer>,
    /// 这些操作返回错误
    pub failing: HashSet<&'static str>,
    /// 记录 with_preview 收到的会话
    pub previews: Arc<Mutex<Vec<PreviewContext>>>,
}

impl FakeStore {
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        let url = page.url.clone().unwrap_or_else(|| "/".to_string());
        self.pages.insert(url, page);
        self
    }

    pub fn recorded_previews(&self) -> Vec<PreviewContext> {
        self.previews.lock().unwrap().clone()
    }

    fn check(&self, operation: &'static str) -> CmsResult<()> {
        if self.failing.contains(operation) {
            Err(failure(operation))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn get_page(&self, url: &str) -> CmsResult<Option<Page>> {
        self.check("get_page")?;
        Ok(self.pages.get(url).cloned())
    }

    async fn get_recent_blog_posts(
        &self,
        category_uid: Option<&str>,
        limit: usize,
    ) -> CmsResult<Vec<BlogPost>> {
        self.check("get_recent_blog_posts")?;
        Ok(self
            .posts
            .iter()
            .filter(|p| category_uid.map_or(true, |uid| p.in_category(uid)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_blog_posts(&self) -> CmsResult<Vec<BlogPost>> {
        self.check("get_blog_posts")?;
        Ok(self.posts.clone())
    }

    async fn get_blog_post(&self, slug: &str) -> CmsResult<Option<BlogPost>> {
        self.check("get_blog_post")?;
        let url = format!("/blog/{slug}");
        Ok(self
            .posts
            .iter()
            .find(|p| p.uid == slug || p.url.as_deref() == Some(url.as_str()))
            .cloned())
    }

    async fn get_similar_blog_posts(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>> {
        self.check("get_similar_blog_posts")?;
        Ok(self
            .posts
            .iter()
            .filter(|p| p.in_category(category_uid))
            .cloned()
            .collect())
    }

    async fn get_author(&self, slug: &str) -> CmsResult<Option<Author>> {
        self.check("get_author")?;
        Ok(self.authors.iter().find(|a| a.uid == slug).cloned())
    }

    async fn get_author_articles(
        &self,
        author_uid: &str,
        limit: usize,
    ) -> CmsResult<Vec<BlogPost>> {
        self.check("get_author_articles")?;
        Ok(self
            .posts
            .iter()
            .filter(|p| p.has_author(author_uid))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_categories(&self) -> CmsResult<Vec<Category>> {
        self.check("get_categories")?;
        Ok(self.categories.clone())
    }

    async fn get_category(&self, slug: &str) -> CmsResult<Option<Category>> {
        self.check("get_category")?;
        Ok(self.categories.iter().find(|c| c.uid == slug).cloned())
    }

    async fn get_category_articles(&self, category_uid: &str) -> CmsResult<Vec<BlogPost>> {
        self.check("get_category_articles")?;
        Ok(self
            .posts
            .iter()
            .filter(|p| p.in_category(category_uid))
            .cloned()
            .collect())
    }

    async fn get_header(&self) -> CmsResult<Option<Header>> {
        self.check("get_header")?;
        Ok(self.header.clone())
    }

    async fn get_footer(&self) -> CmsResult<Option<Footer>> {
        self.check("get_footer")?;
        Ok(self.footer.clone())
    }

    fn with_preview(&self, preview: PreviewContext) -> Arc<dyn ContentStore> {
        self.previews.lock().unwrap().push(preview);
        Arc::new(self.clone())
    }
}

/// 一次发布调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub content_type_uid: String,
    pub entry_uid: String,
    pub environments: Vec<String>,
    pub locales: Vec<String>,
}

/// 内存管理 API
#[derive(Default)]
pub struct FakeManagement {
    pub fail_get: bool,
    pub fail_publish: bool,
    pub fetched: Mutex<Vec<String>>,
    pub published: Mutex<Vec<PublishCall>>,
}

impl FakeManagement {
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<PublishCall> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManagementApi for FakeManagement {
    async fn get_entry(&self, content_type_uid: &str, entry_uid: &str) -> CmsResult<EntryDetails> {
        self.fetched.lock().unwrap().push(entry_uid.to_string());
        if self.fail_get {
            return Err(CmsError::Status {
                status: 404,
                body: format!("{content_type_uid}/{entry_uid} not found"),
            });
        }
        Ok(EntryDetails {
            uid: entry_uid.to_string(),
            title: Some("Entrée de test".to_string()),
            workflow: json!({ "name": "Approved" }),
            publish_details: Value::Null,
        })
    }

    async fn publish_entry(
        &self,
        content_type_uid: &str,
        entry_uid: &str,
        environments: &[String],
        locales: &[String],
    ) -> CmsResult<Value> {
        if self.fail_publish {
            return Err(failure("publish_entry"));
        }
        self.published.lock().unwrap().push(PublishCall {
            content_type_uid: content_type_uid.to_string(),
            entry_uid: entry_uid.to_string(),
            environments: environments.to_vec(),
            locales: locales.to_vec(),
        });
        Ok(json!({ "notice": "The requested action has been performed." }))
    }

    fn api_url(&self) -> String {
        "https://eu-api.contentstack.com".to_string()
    }
}

pub fn marie() -> Author {
    from_json(json!({
        "uid": "marie",
        "title": "Marie Curie",
        "url": "/auteur/marie",
        "bio": "<p>Chercheuse et autrice.</p>",
        "contact": { "email": "marie@example.com" }
    }))
}

pub fn paul() -> Author {
    from_json(json!({ "uid": "paul", "title": "Paul Langevin" }))
}

pub fn rust_category() -> Category {
    from_json(json!({ "uid": "rust", "title": "Rust", "description": "Tout sur Rust" }))
}

pub fn web_category() -> Category {
    from_json(json!({ "uid": "web", "title": "Web" }))
}

pub fn post(uid: &str, title: &str, author: &str, category: &str, date: &str) -> BlogPost {
    from_json(json!({
        "uid": uid,
        "title": title,
        "url": format!("/blog/{uid}"),
        "summary": format!("Résumé de {title}"),
        "content": format!("<p>Contenu de {title}</p>"),
        "author": [{ "uid": author, "title": author }],
        "category": [{ "uid": category, "title": category }],
        "published_date": date,
        "reading_time": 4
    }))
}

pub fn home_page() -> Page {
    from_json(json!({
        "uid": "home",
        "title": "Accueil",
        "url": "/",
        "seo": { "metaTitle": "Le Blog Accueil", "metaDescription": "Un blog de test" },
        "page_components": [
            {
                "featured_article_section": {
                    "highlight_text": "A la une",
                    "background_color": { "hex": "#ff0000" },
                    "article_ref": [post("p1", "Ownership expliqué", "marie", "rust", "2024-03-05")]
                }
            },
            {
                "recent_articles_list": {
                    "title": "Derniers articles Rust",
                    "show_author": true,
                    "show_date": true,
                    "categorie_filter": [{ "uid": "rust", "title": "Rust" }]
                }
            },
            { "list_of_cards": { "section_title": "Nos catégories", "view_type": "grid", "cta_label": "Explorer" } },
            { "list_of_cards": { "section_title": "Tous les articles", "view_type": "list" } }
        ]
    }))
}

pub fn author_template_page() -> Page {
    from_json(json!({
        "uid": "author_template",
        "title": "Auteur",
        "url": "/auteur",
        "page_components": [
            { "author_profile": { "show_article_list": true, "article_list_limit": 10 } },
            { "list_of_cards": { "section_title": "Mes articles", "view_type": "grid" } }
        ]
    }))
}

pub fn about_page() -> Page {
    from_json(json!({
        "uid": "about",
        "title": "A propos",
        "url": "/a-propos",
        "page_components": [
            { "rich_text_section": { "body": "## Qui sommes-nous\n\nUn **petit** blog." } },
            { "author_profile": { "show_article_list": false } }
        ]
    }))
}

/// 默认站点数据
pub fn site_store() -> FakeStore {
    let store = FakeStore {
        posts: vec![
            post("p1", "Ownership expliqué", "marie", "rust", "2024-03-05"),
            post("p2", "Lifetimes en pratique", "paul", "rust", "2024-02-10"),
            post("p3", "HTML sémantique", "marie", "web", "2024-01-20"),
        ],
        authors: vec![marie(), paul()],
        categories: vec![rust_category(), web_category()],
        header: Some(from_json(json!({
            "uid": "header",
            "title": "Le Blog",
            "navigation": [
                { "nav_item_title": "Accueil", "nav_item_url": "/" },
                { "nav_item_title": "Rubrique Rust", "nav_item_url": { "title": "Rust", "href": "/categorie/rust" } }
            ]
        }))),
        footer: Some(from_json(json!({
            "uid": "footer",
            "title": "Pied de page",
            "site_description": "Un blog propulsé par un CMS headless",
            "links": [],
            "social_links": []
        }))),
        ..Default::default()
    };
    store
        .with_page(home_page())
        .with_page(author_template_page())
        .with_page(about_page())
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.title = "Le Blog".to_string();
    config.stack.api_key = "blt_api_key".to_string();
    config.stack.delivery_token = "cs_delivery".to_string();
    config
}

/// 用内存实现组装完整路由
pub fn test_app(store: FakeStore, management: Arc<FakeManagement>, config: Config) -> Router {
    let renderer = ThemeRenderer::embedded().unwrap();
    let publisher = WebhookPublisher::new(management, PublishSettings::from_config(&config));
    let engine = SiteEngine::new(config, Arc::new(store), renderer);
    router(AppState::new(engine, publisher), Path::new("public"))
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: &str,
    extra_headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    for (name, value) in extra_headers {
        request = request.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn workflow_payload(kind: &str, stage: &str) -> Value {
    json!({
        "module": "entry",
        "api_key": "blt_api_key",
        "data": {
            "workflow": {
                "type": kind,
                "entry": { "uid": "p1", "title": "Ownership expliqué" },
                "content_type": { "uid": "blog_post" },
                "log": { "name": stage }
            }
        }
    })
}
