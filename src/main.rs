// ==========================================
// 指标数据处理系统 - 命令行主入口
// ==========================================
// 职责: 加载应用配置 → 初始化日志 → 组装 AppState → 分派子命令
// ==========================================

mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;
use metric_handel::app::AppState;
use metric_handel::config::{base_path, AppConfig};
use metric_handel::domain::TaskStatus;
use metric_handel::{logging, APP_NAME, VERSION};

use crate::cli::{Cli, Command, LogFormatArg};

/// 后台任务轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("错误: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let base = base_path();
    let config_file = cli
        .config
        .clone()
        .unwrap_or_else(|| base.join(metric_handel::config::app_config::CONFIG_FILE_NAME));
    let config = AppConfig::load(&config_file, &base)
        .map_err(|e| anyhow!("无法加载应用配置 {}: {}", config_file.display(), e))?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    match cli.log_format {
        LogFormatArg::Text => logging::init(&level),
        LogFormatArg::Json => logging::init_json(&level),
    }
    config.log_warnings();
    tracing::info!(version = VERSION, config = %config_file.display(), "{} 启动", APP_NAME);

    let state = AppState::new(config).map_err(|e| anyhow!(e))?;

    match cli.command {
        Command::Validate { configs } => {
            let mut all_ok = true;
            for path in &configs {
                let (ok, reason) = state.model_api.validate_config(path);
                if ok {
                    println!("{}: 配置有效", path.display());
                } else {
                    all_ok = false;
                    println!("{}: {}", path.display(), reason);
                }
            }
            Ok(if all_ok { 0 } else { 1 })
        }

        Command::Run { configs } => run_models(&state, configs).await,

        Command::Models => {
            let models = state.model_api.list_models()?;
            println!("{}", serde_json::to_string_pretty(&models)?);
            Ok(0)
        }

        Command::Tables => {
            for table in state.table_api.list_tables()? {
                println!("{}", table);
            }
            Ok(0)
        }

        Command::Columns { table } => {
            for column in state.table_api.table_columns(&table)? {
                println!("{}", column);
            }
            Ok(0)
        }

        Command::Show {
            table,
            page,
            page_size,
            query,
        } => {
            let result = state
                .table_api
                .table_page(&table, page, page_size, &query.to_query())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(0)
        }

        Command::Count { table } => {
            println!("{}", state.table_api.table_count(&table)?);
            Ok(0)
        }

        Command::Clear { table } => {
            let affected = state.table_api.clear_table(&table)?;
            println!("已删除 {} 行", affected);
            Ok(0)
        }

        Command::Export { table, out, query } => {
            let (path, rows) = state
                .table_api
                .export_csv_to(&table, &query.to_query(), &out)?;
            println!("已导出 {} 行到 {}", rows, path.display());
            Ok(0)
        }

        Command::Files => {
            let files = state.file_api.list_files()?;
            println!("{}", serde_json::to_string_pretty(&files)?);
            Ok(0)
        }

        Command::AddFile { path } => {
            let saved = state.file_api.add_file(&path)?;
            println!("已保存为 {}", saved);
            Ok(0)
        }

        Command::RemoveFile { name } => {
            state.file_api.delete_file(&name)?;
            println!("已删除 {}", name);
            Ok(0)
        }
    }
}

/// 提交后台任务并轮询至结束，打印批次结果
async fn run_models(state: &AppState, configs: Vec<PathBuf>) -> anyhow::Result<i32> {
    let task_id = state
        .model_api
        .execute_models(configs)
        .await
        .context("任务提交失败")?;

    let snapshot = loop {
        let snapshot = state.model_api.get_task_status(&task_id)?;
        if snapshot.status.is_finished() {
            break snapshot;
        }
        tracing::debug!(
            progress = snapshot.progress,
            total = snapshot.total,
            current = %snapshot.current,
            "任务执行中"
        );
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let failed = snapshot.status == TaskStatus::Failed || snapshot.results.failed_count() > 0;
    Ok(if failed { 1 } else { 0 })
}
