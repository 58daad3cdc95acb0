use anyhow::Result;
use pulldown_cmark::{html, Options, Parser};

/// 将Markdown渲染为HTML
pub fn render(markdown: &str) -> Result<String> {
    // 创建Markdown解析选项
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    // 富文本区块里可能已经是 HTML，原样透传
    let parser = Parser::new_ext(markdown, options);

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    Ok(html_output)
}
