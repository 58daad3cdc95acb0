use anyhow::{anyhow, Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera, Value};
use tracing::{debug, error, info};

use crate::cms::editable::cslp_for;
use crate::models::config::Config;
use crate::utils::{self, markdown};

/// 内置默认主题
pub mod templates {
    pub const STYLE_CSS: &str = include_str!("../../embed/theme/default/source/css/style.css");

    pub const LAYOUT_HTML: &str = include_str!("../../embed/theme/default/layout/layout.html");
    pub const PAGE_HTML: &str = include_str!("../../embed/theme/default/layout/page.html");
    pub const AUTHOR_HTML: &str = include_str!("../../embed/theme/default/layout/author.html");
    pub const CATEGORY_HTML: &str = include_str!("../../embed/theme/default/layout/category.html");
    pub const POST_HTML: &str = include_str!("../../embed/theme/default/layout/post.html");
    pub const NOT_FOUND_HTML: &str =
        include_str!("../../embed/theme/default/layout/not_found.html");

    pub const HEADER_HTML: &str =
        include_str!("../../embed/theme/default/layout/partials/header.html");
    pub const FOOTER_HTML: &str =
        include_str!("../../embed/theme/default/layout/partials/footer.html");
    pub const LIVE_PREVIEW_HTML: &str =
        include_str!("../../embed/theme/default/layout/partials/live_preview.html");
    pub const ARTICLE_CARD_HTML: &str =
        include_str!("../../embed/theme/default/layout/partials/article_card.html");
    pub const SECTION_HTML: &str =
        include_str!("../../embed/theme/default/layout/partials/section.html");

    pub const AUTHOR_PROFILE_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/author_profile.html");
    pub const FEATURED_ARTICLE_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/featured_article.html");
    pub const RECENT_ARTICLES_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/recent_articles.html");
    pub const ARTICLE_LIST_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/article_list.html");
    pub const CATEGORY_LIST_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/category_list.html");
    pub const RICH_TEXT_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/rich_text.html");
    pub const UNAVAILABLE_HTML: &str =
        include_str!("../../embed/theme/default/layout/sections/unavailable.html");

    /// 模板名与内容
    pub const ALL: &[(&str, &str)] = &[
        ("layout.html", LAYOUT_HTML),
        ("page.html", PAGE_HTML),
        ("author.html", AUTHOR_HTML),
        ("category.html", CATEGORY_HTML),
        ("post.html", POST_HTML),
        ("not_found.html", NOT_FOUND_HTML),
        ("partials/header.html", HEADER_HTML),
        ("partials/footer.html", FOOTER_HTML),
        ("partials/live_preview.html", LIVE_PREVIEW_HTML),
        ("partials/article_card.html", ARTICLE_CARD_HTML),
        ("partials/section.html", SECTION_HTML),
        ("sections/author_profile.html", AUTHOR_PROFILE_HTML),
        ("sections/featured_article.html", FEATURED_ARTICLE_HTML),
        ("sections/recent_articles.html", RECENT_ARTICLES_HTML),
        ("sections/article_list.html", ARTICLE_LIST_HTML),
        ("sections/category_list.html", CATEGORY_LIST_HTML),
        ("sections/rich_text.html", RICH_TEXT_HTML),
        ("sections/unavailable.html", UNAVAILABLE_HTML),
    ];
}

#[derive(Clone)]
pub struct ThemeRenderer {
    /// 主题目录，使用内置主题时为 None
    pub theme_dir: Option<PathBuf>,
    /// 模板引擎
    pub tera: Tera,
}

impl ThemeRenderer {
    /// 创建主题渲染器。`themes/<theme>/layout` 下的模板覆盖同名内置模板
    pub fn new(base_dir: &Path, config: &Config) -> Result<Self> {
        let theme_dir = base_dir.join("themes").join(&config.theme);
        let layout_dir = theme_dir.join("layout");

        if !layout_dir.exists() {
            debug!("主题目录不存在，使用内置主题: {}", theme_dir.display());
            return Self::embedded();
        }

        info!("加载主题: {}", theme_dir.display());
        let mut tera = Tera::new(&format!("{}/**/*.html", layout_dir.display()))
            .with_context(|| format!("Failed to load theme templates: {}", layout_dir.display()))?;

        let overridden: HashSet<String> = tera.get_template_names().map(String::from).collect();
        let missing: Vec<(&str, &str)> = templates::ALL
            .iter()
            .filter(|(name, _)| !overridden.contains(*name))
            .copied()
            .collect();
        debug!(
            overridden = overridden.len(),
            embedded = missing.len(),
            "merging theme templates"
        );
        tera.add_raw_templates(missing)
            .context("Failed to add embedded templates")?;

        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera);

        Ok(ThemeRenderer {
            theme_dir: Some(theme_dir),
            tera,
        })
    }

    /// 只使用内置模板
    pub fn embedded() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates::ALL.to_vec())
            .context("Failed to load embedded templates")?;

        Self::register_filters(&mut tera);
        Self::register_functions(&mut tera);

        Ok(ThemeRenderer {
            theme_dir: None,
            tera,
        })
    }

    /// 注册模板过滤器
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("date_fr", Self::date_fr_filter);
        tera.register_filter("date_short", Self::date_short_filter);
        tera.register_filter("markdown", Self::markdown_filter);
        tera.register_filter("plural", Self::plural_filter);
    }

    /// 注册模板函数
    fn register_functions(tera: &mut Tera) {
        tera.register_function("cslp", Self::cslp_function);
    }

    /// 渲染模板
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            error!("模板渲染失败: {} ({:?})", template, e);
            anyhow!(e).context(format!("Failed to render template {}", template))
        })
    }

    /// 检查布局是否存在
    pub fn has_layout(&self, layout: &str) -> bool {
        self.tera.get_template_names().any(|name| name == layout)
    }

    /// `{{ post.published_date | date_fr }}` → `5 mars 2024`
    fn date_fr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(value
            .as_str()
            .and_then(utils::format_date_fr)
            .map(Value::String)
            .unwrap_or_else(|| value.clone()))
    }

    fn date_short_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Ok(value
            .as_str()
            .and_then(utils::format_date_fr_short)
            .map(Value::String)
            .unwrap_or_else(|| value.clone()))
    }

    fn markdown_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        match value.as_str() {
            Some(text) => markdown::render(text)
                .map(Value::String)
                .map_err(|e| tera::Error::msg(format!("markdown 渲染失败: {}", e))),
            None => Ok(value.clone()),
        }
    }

    /// `{{ count | plural(word="article") }}`
    fn plural_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let count = value
            .as_u64()
            .ok_or_else(|| tera::Error::msg("plural 需要非负整数"))?;
        let word = args
            .get("word")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("缺少必要的参数: word"))?;
        Ok(Value::String(utils::pluralize(count as usize, word)))
    }

    /// `{{ cslp(tags=post.editable, field="title") | safe }}`，没有标签时输出空串
    fn cslp_function(args: &HashMap<String, Value>) -> tera::Result<Value> {
        let field = args
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| tera::Error::msg("缺少必要的参数: field"))?;
        let attribute = args
            .get("tags")
            .and_then(|tags| cslp_for(tags, field))
            .map(|path| format!(" data-cslp=\"{}\"", tera::escape_html(path)))
            .unwrap_or_default();
        Ok(Value::String(attribute))
    }
}
