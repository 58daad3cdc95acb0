use chrono::{DateTime, Datelike, NaiveDate};

pub mod markdown;

const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// 确保路径以斜杠开头
pub fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// 页面 URL 规范化：以斜杠开头，去掉末尾斜杠（根路径除外）
pub fn normalize_page_url(path: &str) -> String {
    let path = ensure_leading_slash(path.trim());
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 解析 RFC 3339 时间或纯日期
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
        .or_else(|| value.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// 法语长日期，例如 `5 mars 2024`
pub fn format_date_fr(value: &str) -> Option<String> {
    let date = parse_date(value)?;
    let month = FRENCH_MONTHS[date.month0() as usize];
    Some(format!("{} {} {}", date.day(), month, date.year()))
}

/// 法语短日期，例如 `05/03/2024`
pub fn format_date_fr_short(value: &str) -> Option<String> {
    parse_date(value).map(|date| date.format("%d/%m/%Y").to_string())
}

/// 数量大于 1 时加 `s`
pub fn pluralize(count: usize, word: &str) -> String {
    if count > 1 {
        format!("{count} {word}s")
    } else {
        format!("{count} {word}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_long_french_dates() {
        assert_eq!(format_date_fr("2024-03-05").as_deref(), Some("5 mars 2024"));
        assert_eq!(
            format_date_fr("2023-08-14T09:30:00.000Z").as_deref(),
            Some("14 août 2023")
        );
        assert_eq!(format_date_fr("not a date"), None);
    }

    #[test]
    fn formats_short_french_dates() {
        assert_eq!(format_date_fr_short("2024-12-01").as_deref(), Some("01/12/2024"));
    }

    #[test]
    fn pluralizes_above_one() {
        assert_eq!(pluralize(0, "article"), "0 article");
        assert_eq!(pluralize(1, "élément"), "1 élément");
        assert_eq!(pluralize(3, "article"), "3 articles");
    }

    #[test]
    fn normalizes_page_urls() {
        assert_eq!(normalize_page_url(""), "/");
        assert_eq!(normalize_page_url("/"), "/");
        assert_eq!(normalize_page_url("about/"), "/about");
        assert_eq!(normalize_page_url("/a/b"), "/a/b");
    }
}
