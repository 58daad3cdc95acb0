use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// 内容平台调用错误
#[derive(Error, Debug)]
pub enum CmsError {
    #[error("请求内容 API 失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("内容 API 返回 {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },

    #[error("解析 {content_type} 条目失败: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置错误: {0}")]
    Config(String),
}

pub type CmsResult<T> = Result<T, CmsError>;

/// HTTP 层错误
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Cms(#[from] CmsError),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Cms(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 内部错误只记录日志，不把细节返回给客户端
        let body = match &self {
            AppError::Cms(e) => {
                tracing::error!(error = %e, "content API error");
                "internal server error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}
