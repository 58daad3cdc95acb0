pub mod composer;
pub mod engine;
pub mod scheduler;
pub mod server;
pub mod webhook;

pub use composer::{ComposedPage, CompositionContext, PageComposer, Section};
pub use engine::SiteEngine;
pub use scheduler::{DailySchedule, DeployScheduler};
pub use server::{router, AppState, Server};
pub use webhook::{PublishSettings, WebhookError, WebhookOutcome, WebhookPublisher};
