//! 页面组装：把页面条目上按顺序排列的可选区块映射为可渲染的 [`Section`]。
//!
//! 每个区块各自拉取数据。某个区块拉取失败只会让它变成
//! [`Section::Unavailable`]，其余区块照常组装。

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cms::client::{ContentStore, DEFAULT_RECENT_LIMIT};
use crate::models::{Author, BlogPost, CardList, Category, PageComponent};
use crate::utils::markdown;

/// 精选区块的默认背景色
pub const DEFAULT_FEATURE_BACKGROUND: &str = "#4a34f3";

/// 作者文章列表的条数
pub const AUTHOR_ARTICLES_LIMIT: usize = 10;

/// 作者页上，标题含这些词的卡片列表展示该作者的文章
const AUTHOR_ARTICLE_KEYWORDS: &[&str] = &["articles", "publications", "mes articles", "écrits"];

/// 标题含这些词的卡片列表展示全部文章
const ARTICLE_KEYWORDS: &[&str] = &["article", "blog", "publication"];

const LOAD_ERROR: &str = "Erreur lors du chargement des données";
const ARTICLES_LOAD_ERROR: &str = "Erreur lors du chargement des articles";

/// 卡片列表区块的路由结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardListKind {
    AuthorArticles,
    ArticleList,
    CategoryList,
}

/// 根据区块标题判断卡片列表展示什么
pub fn classify_card_list(section_title: &str, has_author: bool) -> CardListKind {
    let title = section_title.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| title.contains(k));

    if has_author && mentions(AUTHOR_ARTICLE_KEYWORDS) {
        CardListKind::AuthorArticles
    } else if mentions(ARTICLE_KEYWORDS) {
        CardListKind::ArticleList
    } else {
        CardListKind::CategoryList
    }
}

/// 组装后的页面区块
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    AuthorProfile {
        author: Author,
        show_article_list: bool,
        article_list_limit: Option<u32>,
    },
    FeaturedArticle {
        highlight_text: String,
        background: String,
        article: BlogPost,
    },
    RecentArticles {
        title: String,
        show_author: bool,
        show_date: bool,
        category: Option<Category>,
        articles: Vec<BlogPost>,
    },
    AuthorArticles {
        list: CardList,
        author: Author,
        articles: Vec<BlogPost>,
    },
    ArticleList {
        list: CardList,
        articles: Vec<BlogPost>,
    },
    CategoryList {
        list: CardList,
        categories: Vec<Category>,
    },
    RichText {
        html: String,
    },
    /// 数据拉取失败的区块
    Unavailable {
        block: String,
        message: String,
    },
}

impl Section {
    pub fn kind(&self) -> &'static str {
        match self {
            Section::AuthorProfile { .. } => "author_profile",
            Section::FeaturedArticle { .. } => "featured_article",
            Section::RecentArticles { .. } => "recent_articles",
            Section::AuthorArticles { .. } => "author_articles",
            Section::ArticleList { .. } => "article_list",
            Section::CategoryList { .. } => "category_list",
            Section::RichText { .. } => "rich_text",
            Section::Unavailable { .. } => "unavailable",
        }
    }
}

/// 组装所需的上下文
#[derive(Debug, Clone, Copy)]
pub struct CompositionContext<'a> {
    /// 渲染目标的内容类型，写入 `data-contenttype`
    pub content_type_uid: &'a str,
    /// 渲染目标的条目 uid，写入 `data-pageref`
    pub entry_uid: &'a str,
    /// 作者页上的当前作者
    pub author: Option<&'a Author>,
}

/// 组装结果
#[derive(Debug, Clone, Serialize)]
pub struct ComposedPage {
    pub entry_uid: String,
    pub content_type_uid: String,
    pub sections: Vec<Section>,
}

/// 页面组装器
pub struct PageComposer {
    store: Arc<dyn ContentStore>,
}

impl PageComposer {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// 按区块顺序组装页面
    pub async fn compose(
        &self,
        components: &[PageComponent],
        context: CompositionContext<'_>,
    ) -> ComposedPage {
        debug!(
            entry_uid = context.entry_uid,
            blocks = components.len(),
            "composing page"
        );

        let mut sections = Vec::with_capacity(components.len());
        for (index, component) in components.iter().enumerate() {
            match self.compose_block(component, context.author).await {
                Some(section) => sections.push(section),
                None => debug!(index, "block produced no section"),
            }
        }

        ComposedPage {
            entry_uid: context.entry_uid.to_string(),
            content_type_uid: context.content_type_uid.to_string(),
            sections,
        }
    }

    /// 一个区块对象上可能同时有多个字段，按固定优先级取第一个能处理的
    async fn compose_block(
        &self,
        component: &PageComponent,
        author: Option<&Author>,
    ) -> Option<Section> {
        if let (Some(profile), Some(author)) = (&component.author_profile, author) {
            return Some(Section::AuthorProfile {
                author: author.clone(),
                show_article_list: profile.show_article_list,
                article_list_limit: profile.article_list_limit,
            });
        }

        if let Some(featured) = &component.featured_article_section {
            // 没有引用文章时整个区块不渲染
            let article = featured.article()?;
            let background = featured
                .background_color
                .as_ref()
                .and_then(|c| c.hex())
                .unwrap_or(DEFAULT_FEATURE_BACKGROUND)
                .to_string();
            return Some(Section::FeaturedArticle {
                highlight_text: featured.highlight_text.clone(),
                background,
                article: article.clone(),
            });
        }

        if let Some(recent) = &component.recent_articles_list {
            let category = recent.category_filter().cloned();
            let category_uid = category.as_ref().map(|c| c.uid.as_str());
            let result = self
                .store
                .get_recent_blog_posts(category_uid, DEFAULT_RECENT_LIMIT)
                .await;
            return Some(match result {
                Ok(articles) => Section::RecentArticles {
                    title: recent.title.clone(),
                    show_author: recent.show_author,
                    show_date: recent.show_date,
                    category,
                    articles,
                },
                Err(e) => {
                    warn!(error = %e, "failed to load recent articles");
                    unavailable("recent_articles", ARTICLES_LOAD_ERROR)
                }
            });
        }

        if let Some(list) = &component.list_of_cards {
            return Some(self.compose_card_list(list, author).await);
        }

        if let Some(rich_text) = &component.rich_text_section {
            return Some(match markdown::render(&rich_text.body) {
                Ok(html) => Section::RichText { html },
                Err(e) => {
                    warn!(error = %e, "failed to render rich text block");
                    unavailable("rich_text", LOAD_ERROR)
                }
            });
        }

        None
    }

    async fn compose_card_list(&self, list: &CardList, author: Option<&Author>) -> Section {
        let kind = classify_card_list(&list.section_title, author.is_some());
        debug!(title = %list.section_title, ?kind, "routing card list");

        match (kind, author) {
            (CardListKind::AuthorArticles, Some(author)) => {
                match self
                    .store
                    .get_author_articles(&author.uid, AUTHOR_ARTICLES_LIMIT)
                    .await
                {
                    Ok(articles) => Section::AuthorArticles {
                        list: list.clone(),
                        author: author.clone(),
                        articles,
                    },
                    Err(e) => {
                        warn!(error = %e, author_uid = %author.uid, "failed to load author articles");
                        unavailable("author_articles", ARTICLES_LOAD_ERROR)
                    }
                }
            }
            (CardListKind::ArticleList, _) | (CardListKind::AuthorArticles, None) => {
                match self.store.get_blog_posts().await {
                    Ok(articles) => Section::ArticleList {
                        list: list.clone(),
                        articles,
                    },
                    Err(e) => {
                        warn!(error = %e, "failed to load articles");
                        unavailable("article_list", LOAD_ERROR)
                    }
                }
            }
            (CardListKind::CategoryList, _) => match self.store.get_categories().await {
                Ok(categories) => Section::CategoryList {
                    list: list.clone(),
                    categories,
                },
                Err(e) => {
                    warn!(error = %e, "failed to load categories");
                    unavailable("category_list", LOAD_ERROR)
                }
            },
        }
    }
}

fn unavailable(block: &str, message: &str) -> Section {
    Section::Unavailable {
        block: block.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_keywords_only_route_with_author_context() {
        assert_eq!(
            classify_card_list("Mes Articles", true),
            CardListKind::AuthorArticles
        );
        assert_eq!(
            classify_card_list("Mes Articles", false),
            CardListKind::ArticleList
        );
        assert_eq!(
            classify_card_list("Ses écrits", true),
            CardListKind::AuthorArticles
        );
    }

    #[test]
    fn article_keywords_route_to_article_list() {
        assert_eq!(classify_card_list("Le Blog", false), CardListKind::ArticleList);
        assert_eq!(
            classify_card_list("Dernière publication", false),
            CardListKind::ArticleList
        );
        // 单数的 "article" 不会路由到作者文章
        assert_eq!(classify_card_list("Un article", true), CardListKind::ArticleList);
    }

    #[test]
    fn anything_else_routes_to_categories() {
        assert_eq!(
            classify_card_list("Nos catégories", true),
            CardListKind::CategoryList
        );
        assert_eq!(classify_card_list("", false), CardListKind::CategoryList);
    }

    #[test]
    fn section_kind_matches_serialized_tag() {
        let section = Section::RichText {
            html: "<p>x</p>".to_string(),
        };
        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["kind"], section.kind());
    }
}
