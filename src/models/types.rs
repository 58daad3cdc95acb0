use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 发布详情
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishDetails {
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub user: String,
}

/// 资源文件（图片等）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub uid: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// 超链接
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub href: String,
}

/// 作者联系方式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// SEO 元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seo {
    #[serde(default, rename = "metaTitle")]
    pub meta_title: Option<String>,
    #[serde(default, rename = "metaDescription")]
    pub meta_description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub keywords: Vec<String>,
}

/// 作者
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub uid: String,
    /// 作者显示名
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo: Option<File>,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    /// 实时预览的可编辑标签
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 分类
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Category {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<File>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 博客文章
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogPost {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// 正文（富文本 HTML）
    #[serde(default)]
    pub content: Option<String>,
    /// 引用字段在内容 API 中总是数组
    #[serde(default, deserialize_with = "nullable")]
    pub author: Vec<Author>,
    #[serde(default, deserialize_with = "nullable", alias = "categorie")]
    pub category: Vec<Category>,
    #[serde(default)]
    pub published_date: Option<String>,
    /// 阅读时间（分钟）
    #[serde(default, deserialize_with = "minutes")]
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub image: Option<File>,
    #[serde(default)]
    pub publish_details: Option<PublishDetails>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

impl BlogPost {
    /// 第一个引用的作者
    pub fn primary_author(&self) -> Option<&Author> {
        self.author.first()
    }

    /// 第一个引用的分类
    pub fn primary_category(&self) -> Option<&Category> {
        self.category.first()
    }

    pub fn has_author(&self, author_uid: &str) -> bool {
        self.author.iter().any(|a| a.uid == author_uid)
    }

    pub fn in_category(&self, category_uid: &str) -> bool {
        self.category.iter().any(|c| c.uid == category_uid)
    }
}

/// 取色器字段，旧数据里可能直接是字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    Hex(String),
    Picker {
        #[serde(default)]
        hex: Option<String>,
    },
}

impl ColorValue {
    pub fn hex(&self) -> Option<&str> {
        match self {
            ColorValue::Hex(hex) => Some(hex.as_str()),
            ColorValue::Picker { hex } => hex.as_deref(),
        }
        .filter(|hex| !hex.trim().is_empty())
    }
}

/// 精选文章区块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturedArticles {
    #[serde(default, deserialize_with = "nullable")]
    pub article_ref: Vec<BlogPost>,
    #[serde(default, deserialize_with = "nullable")]
    pub highlight_text: String,
    #[serde(default)]
    pub background_color: Option<ColorValue>,
}

impl FeaturedArticles {
    pub fn article(&self) -> Option<&BlogPost> {
        self.article_ref.first()
    }
}

/// 最新文章区块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentArticles {
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub show_author: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub show_date: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub categorie_filter: Vec<Category>,
    #[serde(default)]
    pub cta_label: Option<String>,
}

impl RecentArticles {
    pub fn category_filter(&self) -> Option<&Category> {
        self.categorie_filter.first()
    }
}

/// 作者简介区块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorProfileBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub show_article_list: bool,
    #[serde(default)]
    pub article_list_limit: Option<u32>,
}

/// 富文本区块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
}

/// 卡片列表的展示方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    List,
    #[default]
    #[serde(other)]
    Grid,
}

/// 通用卡片列表区块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardList {
    #[serde(default, deserialize_with = "nullable")]
    pub section_title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub view_type: ViewType,
    #[serde(default, deserialize_with = "nullable")]
    pub cta_label: String,
}

/// 页面上的一个模块化区块，每种区块都是可选的
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageComponent {
    #[serde(default)]
    pub featured_article_section: Option<FeaturedArticles>,
    #[serde(default)]
    pub recent_articles_list: Option<RecentArticles>,
    #[serde(default)]
    pub author_profile: Option<AuthorProfileBlock>,
    #[serde(default)]
    pub rich_text_section: Option<RichTextBlock>,
    #[serde(default)]
    pub list_of_cards: Option<CardList>,
}

/// 页面
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub seo: Option<Seo>,
    #[serde(default, deserialize_with = "nullable")]
    pub page_components: Vec<PageComponent>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 导航项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavItem {
    #[serde(default)]
    pub nav_item_title: String,
    #[serde(default, deserialize_with = "link_or_href")]
    pub nav_item_url: String,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 社交链接
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLink {
    #[serde(default, deserialize_with = "link_or_href")]
    pub url: String,
    #[serde(default)]
    pub icon: Option<File>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 站点页眉
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub logo: Option<File>,
    #[serde(default, deserialize_with = "nullable")]
    pub navigation: Vec<NavItem>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// 站点页脚
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Footer {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub site_description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub links: Vec<NavItem>,
    #[serde(default, deserialize_with = "nullable")]
    pub social_links: Vec<SocialLink>,
    #[serde(default, rename(serialize = "editable", deserialize = "$"))]
    pub editable: Value,
}

/// CMS 会把空字段写成 null
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 链接字段既可能是字符串，也可能是 `{title, href}` 对象
fn link_or_href<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Href(String),
        Link(Link),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Href(href) => href,
        Raw::Link(link) => link.href,
        Raw::Null(()) => String::new(),
    })
}

/// 数字字段可能带小数
fn minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| *v > 0.0).map(|v| v.round() as u32))
}
