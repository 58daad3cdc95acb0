use serde::Serialize;
use std::fmt;

/// 内容平台的数据中心区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    #[default]
    Na,
    Eu,
    AzureNa,
    AzureEu,
    GcpNa,
    GcpEu,
}

/// 一个区域的各类 API 主机
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    pub content_delivery: String,
    pub preview: String,
    pub application: String,
    pub content_management: String,
}

impl Region {
    /// 大小写不敏感，`_` 与 `-` 等价
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "na" | "us" | "aws-na" => Some(Region::Na),
            "eu" | "aws-eu" => Some(Region::Eu),
            "azure-na" => Some(Region::AzureNa),
            "azure-eu" => Some(Region::AzureEu),
            "gcp-na" => Some(Region::GcpNa),
            "gcp-eu" => Some(Region::GcpEu),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Na => "na",
            Region::Eu => "eu",
            Region::AzureNa => "azure-na",
            Region::AzureEu => "azure-eu",
            Region::GcpNa => "gcp-na",
            Region::GcpEu => "gcp-eu",
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        match self {
            // NA 是历史区域，主机名没有前缀
            Region::Na => Endpoints {
                content_delivery: "cdn.contentstack.io".to_string(),
                preview: "rest-preview.contentstack.com".to_string(),
                application: "app.contentstack.com".to_string(),
                content_management: "api.contentstack.io".to_string(),
            },
            other => {
                let prefix = other.as_str();
                Endpoints {
                    content_delivery: format!("{prefix}-cdn.contentstack.com"),
                    preview: format!("{prefix}-rest-preview.contentstack.com"),
                    application: format!("{prefix}-app.contentstack.com"),
                    content_management: format!("{prefix}-api.contentstack.com"),
                }
            }
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
