//! 定时部署：每天固定时刻 POST 部署钩子。

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use tracing::{error, info};

/// 每日触发时刻（UTC），来自 `M H * * *` 形式的 cron 表达式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub hour: u32,
    pub minute: u32,
}

impl DailySchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            bail!("expected 5 cron fields, got {} in `{}`", fields.len(), expr);
        }
        if fields[2..].iter().any(|f| *f != "*") {
            bail!("only daily schedules (`M H * * *`) are supported: `{}`", expr);
        }

        let minute: u32 = fields[0]
            .parse()
            .with_context(|| format!("invalid minute `{}`", fields[0]))?;
        let hour: u32 = fields[1]
            .parse()
            .with_context(|| format!("invalid hour `{}`", fields[1]))?;
        if minute > 59 || hour > 23 {
            bail!("time out of range in `{}`", expr);
        }

        Ok(Self { hour, minute })
    }

    fn time(&self) -> Result<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
            .ok_or_else(|| anyhow!("invalid time {:02}:{:02}", self.hour, self.minute))
    }

    /// 严格晚于 `now` 的下一个触发时刻
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let time = self.time()?;
        let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));
        if today > now {
            return Ok(today);
        }
        let tomorrow = now
            .date_naive()
            .succ_opt()
            .ok_or_else(|| anyhow!("date overflow after {}", now))?;
        Ok(Utc.from_utc_datetime(&tomorrow.and_time(time)))
    }
}

impl FromStr for DailySchedule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// 部署调度器
pub struct DeployScheduler {
    http: reqwest::Client,
    hook_url: String,
    schedule: DailySchedule,
}

impl DeployScheduler {
    pub fn new(hook_url: &str, schedule: DailySchedule) -> Result<Self> {
        if hook_url.trim().is_empty() {
            bail!("deploy hook url is empty");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            hook_url: hook_url.trim().to_string(),
            schedule,
        })
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// 立即触发一次部署，返回 HTTP 状态码
    pub async fn trigger_deploy(&self) -> Result<u16> {
        info!("🚀 Triggering deploy hook");
        let response = self
            .http
            .post(&self.hook_url)
            .send()
            .await
            .context("Deploy hook request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("deploy hook responded with {}", status);
        }
        info!(status = status.as_u16(), "✅ Deploy triggered");
        Ok(status.as_u16())
    }

    /// 常驻循环；单次失败只记录日志
    pub async fn run(&self) -> Result<()> {
        info!(
            "Deploy scheduler started, daily at {:02}:{:02} UTC",
            self.schedule.hour, self.schedule.minute
        );
        loop {
            let now = Utc::now();
            let next = self.schedule.next_after(now)?;
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next, "下一次部署");
            tokio::time::sleep(wait).await;

            if let Err(e) = self.trigger_deploy().await {
                error!("❌ Deploy failed: {:#}", e);
            }
        }
    }
}
