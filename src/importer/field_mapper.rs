// ==========================================
// 指标数据处理系统 - 字段映射器实现
// ==========================================
// 职责: 源列 → 目标列映射 + 缺失列默认值广播
// 规则:
// - 源列名按表头原文精确匹配（区分大小写）
// - 源列不存在时，该目标列每一行都等于默认值
// - 输出列顺序 == 映射声明顺序
// ==========================================

use crate::config::ColumnMapping;
use crate::domain::{CellValue, Dataset};
use std::collections::{HashMap, HashSet};

pub struct FieldMapper;

impl FieldMapper {
    /// 由表头行生成列名
    ///
    /// - 空表头命名为 `Unnamed: {列序号}`
    /// - 重名表头依次追加 `.1`、`.2`
    pub fn resolve_headers(header_row: &[CellValue]) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut headers = Vec::with_capacity(header_row.len());

        for (idx, cell) in header_row.iter().enumerate() {
            let base = cell
                .as_header_text()
                .unwrap_or_else(|| format!("Unnamed: {}", idx));

            let mut name = base.clone();
            while used.contains(&name) {
                let n = counters.entry(base.clone()).or_insert(0);
                *n += 1;
                name = format!("{}.{}", base, n);
            }
            used.insert(name.clone());
            headers.push(name);
        }

        headers
    }

    /// 按映射声明构建输出数据集
    ///
    /// # 参数
    /// - headers: 解析后的表头
    /// - rows: 数据行（已按起始行切片）
    /// - mappings: 列映射
    pub fn map_rows(
        headers: &[String],
        rows: &[Vec<CellValue>],
        mappings: &[ColumnMapping],
    ) -> Dataset {
        // 每个映射对应的源列位置（None 表示取默认值）
        let sources: Vec<Option<usize>> = mappings
            .iter()
            .map(|m| headers.iter().position(|h| *h == m.source_field))
            .collect();

        let mut dataset = Dataset::new(mappings.iter().map(|m| m.target_field.clone()).collect());
        for row in rows {
            let mapped = mappings
                .iter()
                .zip(sources.iter())
                .map(|(mapping, source)| match source {
                    Some(idx) => row.get(*idx).cloned().unwrap_or(CellValue::Null),
                    None => mapping.default_value.clone(),
                })
                .collect();
            dataset.push_row(mapped);
        }

        dataset
    }
}
