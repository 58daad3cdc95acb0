use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cms::region::{Endpoints, Region};

/// 配置文件名
pub const CONFIG_FILE: &str = "_config.yml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub language: String,
    pub theme: String,
    pub server: ServerConfig,
    pub stack: StackConfig,
    pub webhook: WebhookConfig,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 静态资源目录，挂载在 `/static`
    pub public_dir: String,
}

/// 内容平台（stack）连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub api_key: String,
    pub delivery_token: String,
    pub environment: String,
    pub region: String,
    pub locale: String,
    /// 覆盖区域默认的内容分发主机
    pub delivery_host: Option<String>,
    /// 覆盖区域默认的后台应用主机（实时预览编辑器）
    pub application_host: Option<String>,
    pub preview: PreviewConfig,
    pub management: ManagementConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enable: bool,
    pub token: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagementConfig {
    pub token: Option<String>,
    pub host: Option<String>,
}

/// 自动发布 webhook 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// 触发发布的工作流阶段名（不区分大小写）
    pub publish_stage: String,
    pub locales: Vec<String>,
    /// 若设置，请求头 `x-webhook-secret` 必须与之相同
    pub secret: Option<String>,
}

/// 定时部署配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub hook_url: Option<String>,
    /// 五段 cron 表达式，仅支持每日触发
    pub schedule: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            language: "fr".to_string(),
            theme: "default".to_string(),
            server: ServerConfig::default(),
            stack: StackConfig::default(),
            webhook: WebhookConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_dir: "public".to_string(),
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            delivery_token: String::new(),
            environment: "development".to_string(),
            region: "eu".to_string(),
            locale: "en-us".to_string(),
            delivery_host: None,
            application_host: None,
            preview: PreviewConfig::default(),
            management: ManagementConfig::default(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            publish_stage: "approved".to_string(),
            locales: vec!["en-us".to_string()],
            secret: None,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            hook_url: None,
            schedule: "26 12 * * *".to_string(),
        }
    }
}

impl StackConfig {
    /// 解析区域，无法识别时退回 NA
    pub fn region(&self) -> Region {
        Region::parse(&self.region).unwrap_or_else(|| {
            warn!(region = %self.region, "unknown region, falling back to na");
            Region::Na
        })
    }

    /// 区域默认主机叠加显式覆盖
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = self.region().endpoints();
        if let Some(host) = non_empty(&self.delivery_host) {
            endpoints.content_delivery = host;
        }
        if let Some(host) = non_empty(&self.preview.host) {
            endpoints.preview = host;
        }
        if let Some(host) = non_empty(&self.application_host) {
            endpoints.application = host;
        }
        if let Some(host) = non_empty(&self.management.host) {
            endpoints.content_management = host;
        }
        endpoints
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// 加载站点目录下的配置，文件不存在时使用默认值，然后叠加环境变量
    pub fn load(base_dir: &Path) -> Result<Self> {
        let path = base_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            debug!("{} not found, using defaults", path.display());
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 用环境变量覆盖密钥和开关
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let stack = &mut self.stack;
        if let Some(v) = lookup("CONTENTSTACK_API_KEY") {
            stack.api_key = v;
        }
        if let Some(v) = lookup("CONTENTSTACK_DELIVERY_TOKEN") {
            stack.delivery_token = v;
        }
        if let Some(v) = lookup("CONTENTSTACK_ENVIRONMENT") {
            stack.environment = v;
        }
        if let Some(v) = lookup("CONTENTSTACK_REGION") {
            stack.region = v;
        }
        if let Some(v) = lookup("CONTENTSTACK_CONTENT_DELIVERY") {
            stack.delivery_host = Some(v);
        }
        if let Some(v) = lookup("CONTENTSTACK_CONTENT_APPLICATION") {
            stack.application_host = Some(v);
        }
        if let Some(v) = lookup("CONTENTSTACK_PREVIEW") {
            stack.preview.enable = v.trim() == "true";
        }
        if let Some(v) = lookup("CONTENTSTACK_PREVIEW_TOKEN") {
            stack.preview.token = Some(v);
        }
        if let Some(v) = lookup("CONTENTSTACK_PREVIEW_HOST") {
            stack.preview.host = Some(v);
        }
        if let Some(v) = lookup("CONTENTSTACK_MANAGEMENT_TOKEN") {
            stack.management.token = Some(v);
        }
        if let Some(v) = lookup("DEPLOY_HOOK_URL") {
            self.deploy.hook_url = Some(v);
        }
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}
