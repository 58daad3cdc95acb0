use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use serde_json::json;
use tera::Context;
use tracing::{debug, info, warn};

use crate::cms::{ContentStore, DeliveryClient, PreviewContext};
use crate::core::composer::{CompositionContext, PageComposer};
use crate::error::{AppError, AppResult};
use crate::models::config::Config;
use crate::models::{BlogPost, Seo};
use crate::theme::renderer::ThemeRenderer;
use crate::utils::normalize_page_url;

/// 作者页共用的模板页面
pub const AUTHOR_TEMPLATE_PAGE: &str = "/auteur";

/// 文章页最多展示的相似文章数
pub const SIMILAR_ARTICLES_SHOWN: usize = 6;

/// 站点引擎：按路由拉取内容、组装页面并渲染
#[derive(Clone)]
pub struct SiteEngine {
    /// 站点配置
    config: Arc<Config>,
    /// 内容读取器
    store: Arc<dyn ContentStore>,
    /// 主题渲染器
    renderer: Arc<ThemeRenderer>,
}

/// 页面 SEO 信息
struct PageMeta {
    title: String,
    description: String,
    keywords: Vec<String>,
}

impl PageMeta {
    fn titled(title: &str, site_title: &str) -> Self {
        let title = if title.is_empty() || title == site_title {
            site_title.to_string()
        } else {
            format!("{} | {}", title, site_title)
        };
        Self {
            title,
            description: String::new(),
            keywords: Vec::new(),
        }
    }

    fn from_seo(seo: Option<&Seo>, fallback_title: &str, site_title: &str) -> Self {
        let mut meta = Self::titled(fallback_title, site_title);
        if let Some(seo) = seo {
            if let Some(title) = seo.meta_title.as_deref().filter(|t| !t.trim().is_empty()) {
                meta.title = title.to_string();
            }
            meta.description = seo.meta_description.clone().unwrap_or_default();
            meta.keywords = seo.keywords.clone();
        }
        meta
    }
}

impl SiteEngine {
    pub fn new(config: Config, store: Arc<dyn ContentStore>, renderer: ThemeRenderer) -> Self {
        Self {
            config: Arc::new(config),
            store,
            renderer: Arc::new(renderer),
        }
    }

    /// 用站点目录和配置创建引擎
    pub fn from_config(base_dir: &Path, config: Config) -> Result<Self> {
        info!("初始化站点引擎...");
        let store = DeliveryClient::new(&config.stack).context("Failed to create content client")?;
        let renderer = ThemeRenderer::new(base_dir, &config)?;
        info!(
            region = %config.stack.region(),
            environment = %config.stack.environment,
            preview = store.preview_enabled(),
            "content client ready"
        );
        Ok(Self::new(config, Arc::new(store), renderer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn renderer(&self) -> &ThemeRenderer {
        &self.renderer
    }

    pub fn preview_enabled(&self) -> bool {
        self.config.stack.preview.enable
    }

    /// 本次请求使用的读取器，实时预览关闭时忽略预览参数
    pub fn store_for(&self, preview: Option<PreviewContext>) -> Arc<dyn ContentStore> {
        match preview {
            Some(preview) if self.preview_enabled() => {
                debug!(hash = %preview.hash, "live preview request");
                self.store.with_preview(preview)
            }
            _ => self.store.clone(),
        }
    }

    /// 按路径分派到对应的渲染函数
    pub async fn render_path(&self, path: &str, preview: Option<PreviewContext>) -> AppResult<String> {
        let path = normalize_page_url(path);
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] => self.render_home(preview).await,
            ["auteur", slug] => self.render_author(slug, preview).await,
            ["categorie", slug] => self.render_category(slug, preview).await,
            ["blog", slug] | ["blog-post", slug] => self.render_blog_post(slug, preview).await,
            _ => self.render_page(&path, preview).await,
        }
    }

    pub async fn render_home(&self, preview: Option<PreviewContext>) -> AppResult<String> {
        self.render_page("/", preview).await
    }

    /// 通用页面：按 URL 取页面条目并组装区块
    pub async fn render_page(&self, url: &str, preview: Option<PreviewContext>) -> AppResult<String> {
        let url = normalize_page_url(url);
        let store = self.store_for(preview);

        let page = store
            .get_page(&url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("page {}", url)))?;
        debug!(uid = %page.uid, %url, "rendering page");

        let composed = PageComposer::new(store.clone())
            .compose(
                &page.page_components,
                CompositionContext {
                    content_type_uid: "page",
                    entry_uid: &page.uid,
                    author: None,
                },
            )
            .await;

        let meta = PageMeta::from_seo(page.seo.as_ref(), &page.title, &self.config.title);
        let mut context = self.base_context(store.as_ref(), meta).await;
        context.insert("entry", &page);
        context.insert("composed", &composed);

        Ok(self.renderer.render("page.html", &context)?)
    }

    /// 作者页：用 `/auteur` 页面的区块，并把作者放进组装上下文
    pub async fn render_author(&self, slug: &str, preview: Option<PreviewContext>) -> AppResult<String> {
        let store = self.store_for(preview);

        let author = store
            .get_author(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("author {}", slug)))?;

        let template = store.get_page(AUTHOR_TEMPLATE_PAGE).await?;
        if template.is_none() {
            warn!("作者模板页面 {} 不存在", AUTHOR_TEMPLATE_PAGE);
        }
        let components = template
            .as_ref()
            .map(|page| page.page_components.as_slice())
            .unwrap_or_default();

        let composed = PageComposer::new(store.clone())
            .compose(
                components,
                CompositionContext {
                    content_type_uid: "author",
                    entry_uid: &author.uid,
                    author: Some(&author),
                },
            )
            .await;

        let mut meta = PageMeta::titled(&author.title, &self.config.title);
        meta.description = author.bio.clone().unwrap_or_default();
        let mut context = self.base_context(store.as_ref(), meta).await;
        context.insert("author", &author);
        context.insert("composed", &composed);

        Ok(self.renderer.render("author.html", &context)?)
    }

    pub async fn render_category(&self, slug: &str, preview: Option<PreviewContext>) -> AppResult<String> {
        let store = self.store_for(preview);

        let category = store
            .get_category(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {}", slug)))?;
        let articles = store.get_category_articles(&category.uid).await?;
        debug!(uid = %category.uid, articles = articles.len(), "rendering category");

        let mut meta = PageMeta::titled(&category.title, &self.config.title);
        meta.description = category.description.clone().unwrap_or_default();
        let mut context = self.base_context(store.as_ref(), meta).await;
        context.insert("category", &category);
        context.insert("articles", &articles);

        Ok(self.renderer.render("category.html", &context)?)
    }

    pub async fn render_blog_post(&self, slug: &str, preview: Option<PreviewContext>) -> AppResult<String> {
        let store = self.store_for(preview);

        let post = store
            .get_blog_post(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blog post {}", slug)))?;

        let (similar, show_more) = match post.primary_category() {
            Some(category) => match store.get_similar_blog_posts(&category.uid).await {
                Ok(candidates) => select_similar(&post, candidates),
                Err(e) => {
                    warn!(error = %e, uid = %post.uid, "failed to load similar posts");
                    (Vec::new(), false)
                }
            },
            None => (Vec::new(), false),
        };

        let mut meta = PageMeta::titled(&post.title, &self.config.title);
        meta.description = post.summary.clone().unwrap_or_default();
        let mut context = self.base_context(store.as_ref(), meta).await;
        context.insert("post", &post);
        context.insert("similar", &similar);
        context.insert("show_more", &show_more);

        Ok(self.renderer.render("post.html", &context)?)
    }

    /// 404 页面
    pub async fn render_not_found(&self, message: &str) -> Result<String> {
        let meta = PageMeta::titled("Page introuvable", &self.config.title);
        let mut context = self.base_context(self.store.as_ref(), meta).await;
        context.insert("message", message);
        self.renderer.render("not_found.html", &context)
    }

    /// 所有页面共用的上下文；页眉页脚拉取失败只记录日志
    async fn base_context(&self, store: &dyn ContentStore, meta: PageMeta) -> Context {
        let (header, footer) = tokio::join!(store.get_header(), store.get_footer());
        let header = header.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load header");
            None
        });
        let footer = footer.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load footer");
            None
        });

        let stack = &self.config.stack;
        let mut context = Context::new();
        context.insert(
            "site",
            &json!({
                "title": self.config.title,
                "language": self.config.language,
                "locale": stack.locale,
            }),
        );
        context.insert(
            "seo",
            &json!({
                "title": meta.title,
                "description": meta.description,
                "keywords": meta.keywords,
            }),
        );
        context.insert(
            "preview",
            &json!({
                "enabled": stack.preview.enable,
                "api_key": stack.api_key,
                "environment": stack.environment,
                "app_host": stack.endpoints().application,
            }),
        );
        context.insert("header", &header);
        context.insert("footer", &footer);
        context
    }
}

/// 相似文章：排除当前文章后最多取 6 篇；候选总数超过 6 篇时显示“查看更多”
pub fn select_similar(post: &BlogPost, candidates: Vec<BlogPost>) -> (Vec<BlogPost>, bool) {
    let show_more = candidates.len() > SIMILAR_ARTICLES_SHOWN;
    let similar = candidates
        .into_iter()
        .filter(|candidate| candidate.uid != post.uid)
        .take(SIMILAR_ARTICLES_SHOWN)
        .collect();
    (similar, show_more)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(uid: &str) -> BlogPost {
        BlogPost {
            uid: uid.to_string(),
            title: uid.to_uppercase(),
            ..Default::default()
        }
    }

    #[test]
    fn similar_posts_exclude_current_and_cap_at_six() {
        let current = post("p0");
        let candidates: Vec<BlogPost> = (0..8).map(|i| post(&format!("p{i}"))).collect();

        let (similar, show_more) = select_similar(&current, candidates);
        assert_eq!(similar.len(), 6);
        assert!(similar.iter().all(|p| p.uid != "p0"));
        assert!(show_more);
    }

    #[test]
    fn show_more_counts_candidates_before_filtering() {
        let current = post("p0");
        let candidates: Vec<BlogPost> = (0..6).map(|i| post(&format!("p{i}"))).collect();

        let (similar, show_more) = select_similar(&current, candidates);
        assert_eq!(similar.len(), 5);
        assert!(!show_more);
    }

    #[test]
    fn seo_title_prefers_meta_title() {
        let seo = Seo {
            meta_title: Some("Titre SEO".to_string()),
            meta_description: Some("Description".to_string()),
            keywords: vec!["rust".to_string()],
        };
        let meta = PageMeta::from_seo(Some(&seo), "Accueil", "Le Blog");
        assert_eq!(meta.title, "Titre SEO");
        assert_eq!(meta.description, "Description");

        let plain = PageMeta::from_seo(None, "À propos", "Le Blog");
        assert_eq!(plain.title, "À propos | Le Blog");
    }
}
