pub mod cms;
pub mod core;
pub mod error;
pub mod models;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::cms::{ContentStore, ManagementApi, PreviewContext};
pub use crate::core::{AppState, SiteEngine, WebhookPublisher};
pub use crate::error::{AppError, CmsError};
pub use crate::models::Config;
pub use crate::theme::renderer::ThemeRenderer;
