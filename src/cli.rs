// ==========================================
// 指标数据处理系统 - 命令行参数定义
// ==========================================

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use metric_handel::repository::{SortOrder, TableQuery, DEFAULT_PAGE_SIZE};

#[derive(Parser)]
#[command(
    name = "metric-handel",
    version,
    about = "指标数据处理系统 - 按映射配置把 Excel/CSV 导入 SQLite，并浏览/导出数据表"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 应用配置文件路径（默认: <基础目录>/config.json）
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// 日志级别（覆盖配置文件中的 Server.LogLevel）
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// 日志输出格式
    #[arg(long = "log-format", value_enum, default_value = "text", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// 校验映射配置
    Validate {
        #[arg(value_name = "CONFIG", required = true)]
        configs: Vec<PathBuf>,
    },

    /// 执行映射配置（先整批校验，再后台串行执行）
    Run {
        #[arg(value_name = "CONFIG", required = true)]
        configs: Vec<PathBuf>,
    },

    /// 列出模型目录中的映射配置
    Models,

    /// 列出数据表
    Tables,

    /// 列出数据表字段
    Columns { table: String },

    /// 分页浏览数据表
    Show {
        table: String,

        #[arg(long, default_value_t = 1)]
        page: usize,

        #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// 数据表行数
    Count { table: String },

    /// 清空数据表
    Clear { table: String },

    /// 导出数据表为 CSV（目标为目录时自动生成文件名）
    Export {
        table: String,

        #[arg(value_name = "OUT")]
        out: PathBuf,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// 列出数据目录中的文件
    Files,

    /// 复制文件到数据目录
    AddFile { path: PathBuf },

    /// 删除数据目录中的文件
    RemoveFile { name: String },
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// 模糊筛选，格式 字段=值，可重复
    #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// 排序字段
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// 降序
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

impl QueryArgs {
    pub fn to_query(&self) -> TableQuery {
        let mut query = TableQuery::default();
        for (field, value) in &self.filters {
            query = query.filter(field.clone(), value.clone());
        }
        if let Some(field) = &self.sort {
            let order = if self.desc {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            query = query.sort_by(field.clone(), order);
        }
        query
    }
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("筛选条件格式应为 字段=值: {}", raw)),
    }
}
