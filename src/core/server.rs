use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::cms::{ManagementClient, PreviewContext};
use crate::core::engine::SiteEngine;
use crate::core::webhook::{PublishSettings, WebhookError, WebhookPublisher};
use crate::error::{AppError, AppResult};
use crate::models::config::Config;
use crate::theme::renderer::templates;

/// webhook 共享密钥请求头
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: SiteEngine,
    pub publisher: Arc<WebhookPublisher>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(engine: SiteEngine, publisher: WebhookPublisher) -> Self {
        let webhook_secret = engine
            .config()
            .webhook
            .secret
            .clone()
            .filter(|s| !s.is_empty());
        Self {
            engine,
            publisher: Arc::new(publisher),
            webhook_secret,
        }
    }

    /// 用站点目录和配置创建全部依赖
    pub fn from_config(base_dir: &FsPath, config: Config) -> Result<Self> {
        let management = ManagementClient::new(&config.stack)
            .context("Failed to create management client")?;
        let publisher = WebhookPublisher::new(
            Arc::new(management),
            PublishSettings::from_config(&config),
        );
        let engine = SiteEngine::from_config(base_dir, config)?;
        Ok(Self::new(engine, publisher))
    }
}

/// 实时预览参数，由编辑器附加在页面 URL 上
#[derive(Debug, Default, Deserialize)]
pub struct PreviewParams {
    pub live_preview: Option<String>,
    pub content_type_uid: Option<String>,
    pub entry_uid: Option<String>,
}

impl PreviewParams {
    pub fn into_context(self) -> Option<PreviewContext> {
        let hash = self.live_preview.filter(|h| !h.is_empty())?;
        Some(PreviewContext {
            hash,
            content_type_uid: self.content_type_uid,
            entry_uid: self.entry_uid,
        })
    }
}

/// 构建路由
pub fn router(state: AppState, public_dir: &FsPath) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/auteur/:slug", get(author))
        .route("/categorie/:slug", get(category))
        .route("/blog-post/:slug", get(blog_post))
        .route("/blog/:slug", get(blog_post))
        .route(
            "/api/webhook/auto-publish",
            get(webhook_status).post(webhook_publish),
        )
        .route("/assets/style.css", get(stylesheet))
        .nest_service("/static", ServeDir::new(public_dir))
        .fallback(page)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 渲染结果转响应，未找到时渲染 404 页面
async fn respond(state: &AppState, result: AppResult<String>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(AppError::NotFound(what)) => {
            debug!("not found: {}", what);
            match state.engine.render_not_found(&what).await {
                Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
                Err(e) => {
                    warn!("404 页面渲染失败: {:#}", e);
                    AppError::NotFound(what).into_response()
                }
            }
        }
        Err(e) => e.into_response(),
    }
}

async fn home(State(state): State<AppState>, Query(params): Query<PreviewParams>) -> Response {
    let result = state.engine.render_home(params.into_context()).await;
    respond(&state, result).await
}

async fn author(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let result = state.engine.render_author(&slug, params.into_context()).await;
    respond(&state, result).await
}

async fn category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let result = state
        .engine
        .render_category(&slug, params.into_context())
        .await;
    respond(&state, result).await
}

async fn blog_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let result = state
        .engine
        .render_blog_post(&slug, params.into_context())
        .await;
    respond(&state, result).await
}

/// 其余路径按页面 URL 查找
async fn page(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<PreviewParams>,
) -> Response {
    let result = state
        .engine
        .render_page(uri.path(), params.into_context())
        .await;
    respond(&state, result).await
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], templates::STYLE_CSS)
}

async fn webhook_status(State(state): State<AppState>) -> Json<Value> {
    let config = state.engine.config();
    Json(json!({
        "message": "Auto-publish webhook endpoint is active",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": config.stack.environment,
        "region": config.stack.region().as_str(),
        "apiUrl": state.publisher.management().api_url(),
    }))
}

/// 常数时间比较共享密钥，缺少请求头视为不匹配
fn secret_matches(expected: &str, provided: Option<&str>) -> bool {
    use subtle::ConstantTimeEq;

    match provided {
        Some(provided) => provided.as_bytes().ct_eq(expected.as_bytes()).into(),
        None => false,
    }
}

async fn webhook_publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if !secret_matches(secret, provided) {
            warn!("webhook rejected: secret mismatch");
            return Err(AppError::Unauthorized);
        }
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let error = WebhookError::Malformed(e.to_string());
            return Ok((error.status(), Json(error.to_json())).into_response());
        }
    };

    let response = match state.publisher.handle(&payload).await {
        Ok(outcome) => {
            let stage = &state.publisher.settings().publish_stage;
            (StatusCode::OK, Json(outcome.to_json(stage))).into_response()
        }
        Err(e) => (e.status(), Json(e.to_json())).into_response(),
    };
    Ok(response)
}

/// HTTP 服务器
pub struct Server {
    /// 路由状态
    state: AppState,
    /// 静态资源目录
    public_dir: PathBuf,
    /// 监听地址
    host: String,
    /// 端口
    port: u16,
}

impl Server {
    /// 创建新的服务器
    pub fn new(state: AppState, public_dir: PathBuf, host: &str, port: u16) -> Self {
        Self {
            state,
            public_dir,
            host: host.to_string(),
            port,
        }
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        let app = router(self.state, &self.public_dir);

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))?;
        info!("Server started at http://localhost:{}", self.port);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
