//! layercfg 主程序入口
//!
//! 分层配置查询工具

use anyhow::{Context, Result};
use clap::Parser;
use layered_config::cli::args::{Args, Commands};
use layered_config::cli::commands::{
    Command, DumpCommand, DurationCommand, GetCommand, SectionsCommand,
};
use layered_config::logging::{LogConfig, LoggingSystem};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        console: true,
        json_format: args.json_logs,
        ..Default::default()
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("{} v{} 启动", layered_config::APP_NAME, layered_config::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Get { .. } => Box::new(GetCommand),
        Commands::Dump { .. } => Box::new(DumpCommand),
        Commands::Sections => Box::new(SectionsCommand),
        Commands::Duration { .. } => Box::new(DurationCommand),
    };
    command.execute(args).await
}
