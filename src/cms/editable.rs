//! 实时预览的可编辑标签。
//!
//! 可视化编辑器通过 `data-cslp` 属性定位字段，格式为
//! `<content_type>.<entry_uid>.<locale>.<field path>`。

use serde_json::{json, Map, Value};

/// 标签写入的键
pub const TAGS_KEY: &str = "$";

/// 给条目及其所有嵌套对象附加 `$` 标签映射
pub fn add_editable_tags(entry: &mut Value, content_type_uid: &str, locale: &str) {
    let Some(uid) = entry.get("uid").and_then(Value::as_str).map(str::to_owned) else {
        return;
    };
    let prefix = format!("{content_type_uid}.{uid}.{locale}");
    tag_object(entry, &prefix, locale);
}

fn tag_object(value: &mut Value, prefix: &str, locale: &str) {
    let Value::Object(map) = value else {
        return;
    };

    let mut tags = Map::new();
    for (key, child) in map.iter_mut() {
        if key == TAGS_KEY {
            continue;
        }
        let path = format!("{prefix}.{key}");
        tags.insert(key.clone(), json!({ "data-cslp": path }));
        tag_value(child, &path, locale);
    }
    map.insert(TAGS_KEY.to_string(), Value::Object(tags));
}

fn tag_value(value: &mut Value, path: &str, locale: &str) {
    match value {
        Value::Object(_) => match reference_prefix(value, locale) {
            // 被引用的条目从自己的类型和 uid 重新开始
            Some(prefix) => tag_object(value, &prefix, locale),
            None => tag_object(value, path, locale),
        },
        Value::Array(items) => {
            for (index, item) in items.iter_mut().enumerate() {
                tag_value(item, &format!("{path}.{index}"), locale);
            }
        }
        _ => {}
    }
}

fn reference_prefix(value: &Value, locale: &str) -> Option<String> {
    let uid = value.get("uid")?.as_str()?;
    let content_type = value.get("_content_type_uid")?.as_str()?;
    Some(format!("{content_type}.{uid}.{locale}"))
}

/// 取出某个字段的 `data-cslp` 值
pub fn cslp_for<'a>(tags: &'a Value, field: &str) -> Option<&'a str> {
    tags.get(field)?.get("data-cslp")?.as_str()
}
