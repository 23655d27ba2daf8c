// ==========================================
// 指标数据处理系统 - 领域类型定义
// ==========================================
// 职责: 工作表选择器、写入策略、任务状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工作表选择器 (Sheet Selector)
// ==========================================
// 名称或从 0 开始的序号; 分隔文本文件忽略此项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "#{}", i),
            SheetSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// 写入策略 (Write Policy)
// ==========================================
// AppendOnly: 重复执行会重复插入（无去重键）
// UpsertByKey: 按键列唯一索引覆盖写入
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WritePolicy {
    #[default]
    AppendOnly,
    UpsertByKey(Vec<String>),
}

impl WritePolicy {
    pub fn as_str(&self) -> &str {
        match self {
            WritePolicy::AppendOnly => "APPEND_ONLY",
            WritePolicy::UpsertByKey(_) => "UPSERT_BY_KEY",
        }
    }
}

// ==========================================
// 后台任务状态 (Task Status)
// ==========================================
// 序列化格式: 小写 (与前端轮询接口一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
