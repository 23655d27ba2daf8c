// ==========================================
// 指标数据处理系统 - 导入结果模型
// ==========================================
// 职责: 单个配置的导入结果、多配置批次结果
// 生命周期: 仅在一次执行内存在，由调用方决定是否保留
// ==========================================

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::path::{Path, PathBuf};

// ==========================================
// ImportReport - 单个映射配置的导入结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// 通配符匹配到的文件数
    pub files_matched: usize,
    /// 成功读出数据的文件（按处理顺序）
    pub files_succeeded: Vec<PathBuf>,
    /// 写入的总行数
    pub rows_imported: usize,
    /// 实际删除的源文件（DeleteAfterProcess）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_deleted: Vec<PathBuf>,
}

// ==========================================
// ConfigOutcome - 批次中某个配置的执行结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfigOutcome {
    Imported { rows: usize },
    Failed { error: String },
}

impl ConfigOutcome {
    pub fn rows(&self) -> Option<usize> {
        match self {
            ConfigOutcome::Imported { rows } => Some(*rows),
            ConfigOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConfigOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub config: PathBuf,
    pub outcome: ConfigOutcome,
}

// ==========================================
// BatchReport - 批次结果
// ==========================================
// 约束: 条目顺序 == 配置提交顺序
// 序列化为 {配置路径: 结果} 映射，保持插入顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, config: impl Into<PathBuf>, outcome: ConfigOutcome) {
        self.entries.push(BatchEntry {
            config: config.into(),
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, config: &Path) -> Option<&ConfigOutcome> {
        self.entries
            .iter()
            .find(|e| e.config == config)
            .map(|e| &e.outcome)
    }

    /// 成功配置的总行数
    pub fn total_rows(&self) -> usize {
        self.entries.iter().filter_map(|e| e.outcome.rows()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.config.display().to_string(), &entry.outcome)?;
        }
        map.end()
    }
}
