use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统，RUST_LOG 未设置时默认 info
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // 解析命令行参数
    let cli = cli::Cli::parse();

    // 打印欢迎信息
    println!("{}", "
 ____  _             _      ____  _
/ ___|| |_ __ _  ___| | __ | __ )| | ___   __ _
\\___ \\| __/ _` |/ __| |/ / |  _ \\| |/ _ \\ / _` |
 ___) | || (_| | (__|   <  | |_) | | (_) | (_| |
|____/ \\__\\__,_|\\___|_|\\_\\ |____/|_|\\___/ \\__, |
                                          |___/
    ".bright_cyan());

    println!("{} {}", "Stack-Blog".bright_cyan(), env!("CARGO_PKG_VERSION").bright_green());
    println!("{}", "A server-rendered blog for a headless CMS".bright_white());
    println!();

    // 执行命令
    if let Err(e) = cli::execute(cli).await {
        error!("Error: {}", e);

        // 打印错误链
        for cause in e.chain().skip(1) {
            error!("Caused by: {}", cause);
        }

        std::process::exit(1);
    }

    Ok(())
}
