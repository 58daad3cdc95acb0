//! 工作流 webhook：条目进入指定阶段时自动发布。
//!
//! 处理流程：读取事件类型 → 取条目和内容类型 uid → 拉取条目详情 →
//! 比较工作流阶段名 → 需要时调用发布接口。

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cms::ManagementApi;
use crate::error::CmsError;
use crate::models::config::{Config, WebhookConfig};

/// 从 webhook 负载中提取的工作流事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowEvent {
    pub event: Option<String>,
    pub entry_uid: Option<String>,
    pub content_type_uid: Option<String>,
    pub stage_name: Option<String>,
}

impl WorkflowEvent {
    /// 负载必须包含 `data.workflow`
    pub fn from_payload(payload: &Value) -> Result<Self, WebhookError> {
        let workflow = payload
            .get("data")
            .and_then(|data| data.get("workflow"))
            .filter(|workflow| workflow.is_object())
            .ok_or_else(|| WebhookError::Malformed("missing data.workflow".to_string()))?;

        let text = |value: Option<&Value>| {
            value
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|s| !s.is_empty())
        };

        let entry_uid = text(workflow.get("entry").and_then(|e| e.get("uid")));
        let content_type_uid = text(workflow.get("content_type").and_then(|c| c.get("uid")));

        Ok(Self {
            event: text(workflow.get("type")),
            entry_uid,
            content_type_uid,
            stage_name: text(workflow.get("log").and_then(|l| l.get("name"))),
        })
    }

    pub fn is_workflow_event(&self) -> bool {
        self.event.as_deref().is_some_and(|e| e.contains("workflow"))
    }
}

/// webhook 处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// 不是工作流事件
    Ignored { event: Option<String> },
    /// 缺少条目或内容类型 uid
    Incomplete,
    /// 阶段不是发布阶段
    StageSkipped {
        entry_uid: String,
        stage: Option<String>,
    },
    Published {
        entry_uid: String,
        content_type_uid: String,
        stage: String,
    },
}

impl WebhookOutcome {
    pub fn to_json(&self, publish_stage: &str) -> Value {
        match self {
            WebhookOutcome::Ignored { event } => json!({
                "success": true,
                "message": "Webhook received but no action needed",
                "event": event,
            }),
            WebhookOutcome::Incomplete => json!({
                "success": true,
                "message": "Webhook received but data is incomplete",
            }),
            WebhookOutcome::StageSkipped { entry_uid, stage } => json!({
                "success": true,
                "message": format!(
                    "Webhook received, current stage: \"{}\" (not {})",
                    stage.as_deref().unwrap_or(""),
                    publish_stage
                ),
                "entryUid": entry_uid,
                "currentStage": stage,
            }),
            WebhookOutcome::Published {
                entry_uid,
                content_type_uid,
                stage,
            } => json!({
                "success": true,
                "message": "Entry published automatically",
                "entryUid": entry_uid,
                "contentType": content_type_uid,
                "workflowStage": stage,
            }),
        }
    }
}

/// webhook 处理错误
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    Malformed(String),

    #[error("unable to fetch entry details")]
    FetchFailed {
        entry_uid: String,
        #[source]
        source: CmsError,
    },

    #[error("automatic publication failed")]
    PublishFailed {
        entry_uid: String,
        #[source]
        source: CmsError,
    },
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Malformed(_) => StatusCode::BAD_REQUEST,
            WebhookError::FetchFailed { .. } | WebhookError::PublishFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            WebhookError::Malformed(details) => json!({
                "error": "Error while processing webhook",
                "details": details,
            }),
            WebhookError::FetchFailed { entry_uid, source }
            | WebhookError::PublishFailed { entry_uid, source } => json!({
                "error": self.to_string(),
                "entryUid": entry_uid,
                "details": source.to_string(),
            }),
        }
    }
}

/// 发布参数
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// 小写的发布阶段名
    pub publish_stage: String,
    pub environment: String,
    pub locales: Vec<String>,
}

impl PublishSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.webhook, &config.stack.environment)
    }

    pub fn new(webhook: &WebhookConfig, environment: &str) -> Self {
        Self {
            publish_stage: webhook.publish_stage.to_lowercase(),
            environment: environment.to_string(),
            locales: webhook.locales.clone(),
        }
    }
}

/// 自动发布器
pub struct WebhookPublisher {
    management: Arc<dyn ManagementApi>,
    settings: PublishSettings,
}

impl WebhookPublisher {
    pub fn new(management: Arc<dyn ManagementApi>, settings: PublishSettings) -> Self {
        Self {
            management,
            settings,
        }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub fn management(&self) -> &Arc<dyn ManagementApi> {
        &self.management
    }

    fn is_publish_stage(&self, stage: Option<&str>) -> bool {
        stage.is_some_and(|s| s.to_lowercase() == self.settings.publish_stage)
    }

    /// 处理一次 webhook 负载
    pub async fn handle(&self, payload: &Value) -> Result<WebhookOutcome, WebhookError> {
        let event = WorkflowEvent::from_payload(payload)?;
        debug!(event = ?event.event, "webhook event received");

        if !event.is_workflow_event() {
            info!(event = ?event.event, "ignoring non-workflow event");
            return Ok(WebhookOutcome::Ignored { event: event.event });
        }

        let (Some(entry_uid), Some(content_type_uid)) = (event.entry_uid, event.content_type_uid)
        else {
            warn!("workflow event without entry or content type uid");
            return Ok(WebhookOutcome::Incomplete);
        };

        info!(%entry_uid, %content_type_uid, "fetching entry details");
        let details = self
            .management
            .get_entry(&content_type_uid, &entry_uid)
            .await
            .map_err(|source| {
                error!(%entry_uid, error = %source, "failed to fetch entry details");
                WebhookError::FetchFailed {
                    entry_uid: entry_uid.clone(),
                    source,
                }
            })?;
        info!(
            uid = %details.uid,
            title = ?details.title,
            workflow = %details.workflow,
            publish_details = %details.publish_details,
            "entry details"
        );

        let stage = event.stage_name;
        info!(stage = ?stage, "current workflow stage");

        if !self.is_publish_stage(stage.as_deref()) {
            info!(stage = ?stage, "stage is not the publish stage, skipping");
            return Ok(WebhookOutcome::StageSkipped { entry_uid, stage });
        }

        info!(%entry_uid, "entry approved, publishing automatically");
        let environments = vec![self.settings.environment.clone()];
        self.management
            .publish_entry(
                &content_type_uid,
                &entry_uid,
                &environments,
                &self.settings.locales,
            )
            .await
            .map_err(|source| {
                error!(%entry_uid, %content_type_uid, error = %source, "automatic publication failed");
                WebhookError::PublishFailed {
                    entry_uid: entry_uid.clone(),
                    source,
                }
            })?;

        Ok(WebhookOutcome::Published {
            entry_uid,
            content_type_uid,
            stage: stage.unwrap_or_default(),
        })
    }
}
