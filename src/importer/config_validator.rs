// ==========================================
// 指标数据处理系统 - 映射配置校验器
// ==========================================
// 职责: 在任何文件 I/O 之前检查配置的完整性与行号一致性
// 顺序（遇到第一个失败即返回）:
//   1. Table.FieldRow 存在   2. Table.StartRow 存在
//   3. FieldRow != StartRow  4. StartRow > FieldRow
//   5. File.Path 存在        6. Export.Table 存在
//   7. Columns 为非空数组，且每项含 Field/Target
//   8. 目标列名唯一          9. UpsertKeys 均为已声明的目标列
// 说明: 不检查源列是否真实存在于文件中（加载时缺列取默认值）
// ==========================================

use crate::config::mapping::{
    config_display_name, ColumnMapping, MappingConfig, RawColumnMapping, RawMappingConfig,
};
use crate::domain::{CellValue, WritePolicy};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

pub struct ConfigValidator;

impl ConfigValidator {
    /// 校验原始配置并产出强类型配置
    ///
    /// # 返回
    /// - Ok(MappingConfig): 校验通过
    /// - Err(String): 第一个失败原因
    pub fn validate(raw: &RawMappingConfig, source: &Path) -> Result<MappingConfig, String> {
        // ===== 1-4: 行号 =====
        let table = raw
            .table
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'Table' 配置项".to_string())?;

        let field_row = table
            .field_row
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'Table.FieldRow' 配置项".to_string())?;
        let start_row = table
            .start_row
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'Table.StartRow' 配置项".to_string())?;

        let header_row = positive_row(field_row, "FieldRow")?;
        let start_row = positive_row(start_row, "StartRow")?;

        if header_row == start_row {
            return Err(format!(
                "FieldRow ({}) 和 StartRow ({}) 不能相等，这会导致无法正确读取数据",
                header_row, start_row
            ));
        }
        if start_row <= header_row {
            return Err(format!(
                "StartRow ({}) 必须大于 FieldRow ({})",
                start_row, header_row
            ));
        }

        // ===== 5: 文件通配符 =====
        let file = raw
            .file
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'File' 配置项".to_string())?;
        let file_pattern = file
            .path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| "配置文件中缺少 'File.Path' 配置项".to_string())?;
        glob::Pattern::new(file_pattern)
            .map_err(|e| format!("'File.Path' 通配符无效 ({}): {}", file_pattern, e))?;

        // ===== 6: 目标表 =====
        let export = raw
            .export
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'Export' 配置项".to_string())?;
        let target_table = export
            .table
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| "配置文件中缺少 'Export.Table' 配置项".to_string())?;

        // ===== 7: 列映射 =====
        let columns_value = raw
            .columns
            .as_ref()
            .ok_or_else(|| "配置文件中缺少 'Columns' 配置项".to_string())?;
        let raw_columns: Vec<RawColumnMapping> = match columns_value {
            serde_json::Value::Array(items) if !items.is_empty() => {
                serde_json::from_value(columns_value.clone())
                    .map_err(|e| format!("'Columns' 配置项格式错误: {}", e))?
            }
            _ => return Err("配置文件中 'Columns' 必须是非空数组".to_string()),
        };

        let mut columns = Vec::with_capacity(raw_columns.len());
        for (idx, col) in raw_columns.iter().enumerate() {
            let source_field = col
                .field
                .clone()
                .ok_or_else(|| format!("'Columns[{}]' 缺少 'Field'", idx))?;
            let target_field = col
                .target
                .clone()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| format!("'Columns[{}]' 缺少 'Target'", idx))?;
            columns.push(ColumnMapping {
                source_field,
                target_field,
                default_value: CellValue::from_json(&col.default_value),
            });
        }

        // ===== 8: 目标列名唯一 =====
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.target_field.as_str()) {
                return Err(format!("目标列 '{}' 重复定义", col.target_field));
            }
        }

        // ===== 9: 写入策略 =====
        let write_policy = match &export.upsert_keys {
            Some(keys) if !keys.is_empty() => {
                if let Some(missing) = keys.iter().find(|k| !seen.contains(k.as_str())) {
                    return Err(format!(
                        "'Export.UpsertKeys' 中的 '{}' 不是已声明的目标列",
                        missing
                    ));
                }
                WritePolicy::UpsertByKey(keys.clone())
            }
            _ => WritePolicy::AppendOnly,
        };

        Ok(MappingConfig {
            source: source.to_path_buf(),
            file_pattern: file_pattern.to_string(),
            sheet: file.sheet_name.clone().unwrap_or_default(),
            header_row,
            start_row,
            columns,
            target_table: target_table.to_string(),
            delete_after_process: file.delete_after_process.unwrap_or(false),
            write_policy,
        })
    }

    /// 读取并校验磁盘上的配置文件（每次执行都重新读取，不缓存）
    pub fn load(path: &Path) -> ImportResult<MappingConfig> {
        let config = config_display_name(path);
        let text = std::fs::read_to_string(path).map_err(|e| ImportError::ConfigLoad {
            config: config.clone(),
            message: e.to_string(),
        })?;
        let raw = RawMappingConfig::from_json_str(&text).map_err(|e| ImportError::ConfigLoad {
            config: config.clone(),
            message: format!("JSON 解析失败: {}", e),
        })?;

        let mapping = Self::validate(&raw, path)
            .map_err(|reason| ImportError::ConfigValidation { config, reason })?;
        debug!(
            config = %path.display(),
            table = %mapping.target_table,
            pattern = %mapping.file_pattern,
            "映射配置校验通过"
        );
        Ok(mapping)
    }
}

/// 行号必须为正整数
fn positive_row(value: &serde_json::Value, key: &str) -> Result<usize, String> {
    value
        .as_u64()
        .filter(|v| *v >= 1)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| format!("'Table.{}' 必须是正整数，实际为 {}", key, value))
}
