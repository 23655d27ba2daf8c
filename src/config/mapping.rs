// ==========================================
// 指标数据处理系统 - 映射配置模型
// ==========================================
// 职责: 映射配置 JSON 的原始结构 + 校验后的强类型结构
// 说明: 原始结构全部字段可选，便于校验器给出精确原因；
//       下游组件只接触校验后的 MappingConfig
// ==========================================

use crate::domain::{CellValue, SheetSelector, WritePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ==========================================
// 原始结构（与 JSON 键名一致）
// ==========================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMappingConfig {
    #[serde(rename = "File")]
    pub file: Option<RawFileSection>,

    #[serde(rename = "Table")]
    pub table: Option<RawTableSection>,

    #[serde(rename = "Export")]
    pub export: Option<RawExportSection>,

    /// 保留为原始 JSON，以区分“缺失”与“不是数组”
    #[serde(rename = "Columns")]
    pub columns: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFileSection {
    #[serde(rename = "Path")]
    pub path: Option<String>,

    #[serde(rename = "SheetName")]
    pub sheet_name: Option<SheetSelector>,

    #[serde(rename = "DeleteAfterProcess")]
    pub delete_after_process: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTableSection {
    #[serde(rename = "FieldRow")]
    pub field_row: Option<serde_json::Value>,

    #[serde(rename = "StartRow")]
    pub start_row: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExportSection {
    #[serde(rename = "Table")]
    pub table: Option<String>,

    /// 可选: 按目标列去重覆盖写入
    #[serde(rename = "UpsertKeys")]
    pub upsert_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawColumnMapping {
    #[serde(rename = "Field")]
    pub field: Option<String>,

    #[serde(rename = "Target")]
    pub target: Option<String>,

    #[serde(rename = "DefaultValue", default)]
    pub default_value: serde_json::Value,
}

impl RawMappingConfig {
    /// 从 JSON 文本解析（结构不符时返回 serde 错误）
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        // 兼容带 BOM 的文件
        serde_json::from_str(text.trim_start_matches('\u{feff}'))
    }
}

// ==========================================
// 校验后的强类型结构
// ==========================================

/// 列映射: 源列名 → 目标列名，源列缺失时整列取默认值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub source_field: String,
    pub target_field: String,
    pub default_value: CellValue,
}

/// 映射配置（一次导入作业）
///
/// 约束: start_row > header_row >= 1，columns 非空，目标列名唯一
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingConfig {
    /// 配置文件路径（批次结果中的标识）
    pub source: PathBuf,
    /// 通配符，执行时相对当前工作目录解析
    pub file_pattern: String,
    pub sheet: SheetSelector,
    /// 表头所在行（从 1 开始）
    pub header_row: usize,
    /// 数据起始行（从 1 开始）
    pub start_row: usize,
    pub columns: Vec<ColumnMapping>,
    pub target_table: String,
    pub delete_after_process: bool,
    pub write_policy: WritePolicy,
}

impl MappingConfig {
    /// 配置名（文件名去扩展名）
    pub fn name(&self) -> String {
        config_display_name(&self.source)
    }

    /// 表头之后需要跳过的数据行数
    pub fn rows_to_skip_after_header(&self) -> usize {
        self.start_row - self.header_row - 1
    }

    pub fn target_fields(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.target_field.clone()).collect()
    }
}

/// 配置文件显示名
pub fn config_display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let text = r#"{
            "File": { "Path": "Data/*.csv", "SheetName": "Sheet1", "DeleteAfterProcess": true },
            "Table": { "FieldRow": 1, "StartRow": 2 },
            "Export": { "Table": "指标" },
            "Columns": [ { "Field": "A", "Target": "X", "DefaultValue": 0 } ]
        }"#;
        let raw = RawMappingConfig::from_json_str(text).unwrap();

        let file = raw.file.unwrap();
        assert_eq!(file.path.as_deref(), Some("Data/*.csv"));
        assert_eq!(file.sheet_name, Some(SheetSelector::Name("Sheet1".into())));
        assert_eq!(file.delete_after_process, Some(true));
        assert_eq!(raw.export.unwrap().table.as_deref(), Some("指标"));
        assert!(raw.columns.unwrap().is_array());
    }

    #[test]
    fn test_missing_default_value_is_null() {
        let col: RawColumnMapping =
            serde_json::from_str(r#"{ "Field": "A", "Target": "X" }"#).unwrap();
        assert!(col.default_value.is_null());
    }

    #[test]
    fn test_bom_prefixed_json() {
        let raw = RawMappingConfig::from_json_str("\u{feff}{}").unwrap();
        assert!(raw.file.is_none());
    }
}
