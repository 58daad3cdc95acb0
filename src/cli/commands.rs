use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use stack_blog::cms::{ManagementApi, ManagementClient};
use stack_blog::core::{AppState, DailySchedule, DeployScheduler, Server, SiteEngine};
use stack_blog::error::AppError;
use stack_blog::models::config::{Config, CONFIG_FILE};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化站点配置
    Init(InitArgs),

    /// 启动站点服务器
    Serve(ServeArgs),

    /// 渲染单个页面
    Render(RenderArgs),

    /// 手动发布条目
    Publish(PublishArgs),

    /// 定时触发部署钩子
    ScheduleDeploy(ScheduleDeployArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称，默认使用 --path
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    /// 服务器端口，覆盖配置文件
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Args)]
pub struct RenderArgs {
    /// 页面路径，例如 `/` 或 `/blog/mon-article`
    pub url: String,

    /// 输出文件，默认打印到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PublishArgs {
    /// 内容类型 uid
    pub content_type: String,

    /// 条目 uid
    pub entry_uid: String,
}

#[derive(Args)]
pub struct ScheduleDeployArgs {
    /// 立即触发一次后退出
    #[arg(long)]
    pub now: bool,
}

// 嵌入的默认配置模板
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# 站点信息
title: '{title}'
language: fr
theme: default

# 服务器
server:
  host: 0.0.0.0
  port: 3000
  public_dir: public

# 内容平台连接，密钥建议通过环境变量提供：
#   CONTENTSTACK_API_KEY / CONTENTSTACK_DELIVERY_TOKEN / CONTENTSTACK_MANAGEMENT_TOKEN
stack:
  api_key: ''
  delivery_token: ''
  environment: development
  # na | eu | azure-na | azure-eu | gcp-na | gcp-eu
  region: eu
  locale: en-us
  # 实时预览
  preview:
    enable: false
    # token: ''
  management: {}
    # token: ''

# 工作流自动发布
webhook:
  publish_stage: approved
  locales:
    - en-us
  # secret: ''

# 定时部署（UTC，仅支持每日）
deploy:
  # hook_url: https://api.vercel.com/v1/integrations/deploy/...
  schedule: '26 12 * * *'
"#;

// 初始化站点目录：配置文件和静态资源目录
fn initialize_site_structure(site_path: &Path, site_title: &str) -> Result<()> {
    let config_path = site_path.join(CONFIG_FILE);
    // 单引号 YAML 字符串内的 ' 写成 ''
    let config_content = DEFAULT_CONFIG_TEMPLATE.replace("{title}", &site_title.replace('\'', "''"));
    fs::write(&config_path, config_content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let public_dir = site_path.join("public");
    fs::create_dir_all(&public_dir)
        .with_context(|| format!("创建目录失败: {}", public_dir.display()))?;

    Ok(())
}

/// 执行命令
pub async fn execute(cli: Cli) -> Result<()> {
    let site_path = cli.path.clone();

    match cli.command {
        Commands::Init(args) => {
            let site_path = match &args.name {
                Some(name) => site_path.join(name),
                None => site_path,
            };

            // 配置文件已存在时询问是否覆盖
            if site_path.join(CONFIG_FILE).exists() {
                println!("{} already exists. Overwrite? (y/N)", CONFIG_FILE);
                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("Operation cancelled.");
                    return Ok(());
                }
            }

            fs::create_dir_all(&site_path)?;

            let site_title = args
                .title
                .or(args.name)
                .unwrap_or_else(|| "My Blog".to_string());
            initialize_site_structure(&site_path, &site_title)?;

            info!("Initialized new site at: {}", site_path.display());
        }
        Commands::Serve(args) => {
            let mut config = Config::load(&site_path)?;
            if let Some(port) = args.port {
                config.server.port = port;
            }
            let public_dir = site_path.join(&config.server.public_dir);
            let host = config.server.host.clone();
            let port = config.server.port;

            let state = AppState::from_config(&site_path, config)?;
            Server::new(state, public_dir, &host, port).start().await?;
        }
        Commands::Render(args) => {
            let config = Config::load(&site_path)?;
            let engine = SiteEngine::from_config(&site_path, config)?;

            let html = match engine.render_path(&args.url, None).await {
                Ok(html) => html,
                Err(AppError::NotFound(what)) => bail!("Not found: {}", what),
                Err(e) => return Err(anyhow::Error::new(e).context("Render failed")),
            };

            match args.output {
                Some(output) => {
                    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&output, html)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    info!("Rendered {} -> {}", args.url, output.display());
                }
                None => println!("{}", html),
            }
        }
        Commands::Publish(args) => {
            let config = Config::load(&site_path)?;
            let client = ManagementClient::new(&config.stack)?;
            let environments = vec![config.stack.environment.clone()];

            info!(
                "Publishing {}/{} to {}",
                args.content_type, args.entry_uid, config.stack.environment
            );
            client
                .publish_entry(
                    &args.content_type,
                    &args.entry_uid,
                    &environments,
                    &config.webhook.locales,
                )
                .await
                .context("Publish failed")?;
            println!("{} {}", "✔".bright_green(), "Entry published".bright_white());
        }
        Commands::ScheduleDeploy(args) => {
            let config = Config::load(&site_path)?;
            let hook_url = config
                .deploy
                .hook_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .context("deploy.hook_url (or DEPLOY_HOOK_URL) is not configured")?;
            let schedule = DailySchedule::parse(&config.deploy.schedule)?;
            let scheduler = DeployScheduler::new(&hook_url, schedule)?;

            if args.now {
                scheduler.trigger_deploy().await?;
            } else {
                let handle = tokio::spawn(async move { scheduler.run().await });

                // 等待用户中断
                tokio::select! {
                    result = handle => result??,
                    signal = tokio::signal::ctrl_c() => {
                        signal?;
                        info!("Deploy scheduler stopped");
                    }
                }
            }
        }
    }

    Ok(())
}
