// ==========================================
// 指标数据处理系统 - 文件解析器实现
// ==========================================
// 职责: 把源文件读成“行网格”（Vec<Vec<CellValue>>）
// 支持: Excel (.xlsx/.xlsm/.xlsb/.xls/.ods) / CSV (.csv)
// 约束: 完全空白的行不参与行号计数（与表头/起始行的约定一致）
// ==========================================

use crate::domain::{CellValue, SheetSelector};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::path::Path;

/// 行网格
pub type RowGrid = Vec<Vec<CellValue>>;

/// 文件解析接口
pub trait FileParser: Send + Sync {
    /// 读取为行网格
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - sheet: 工作表选择（分隔文本忽略）
    fn read_rows(&self, file_path: &Path, sheet: &SheetSelector) -> ImportResult<RowGrid>;
}

/// 源文件格式（按扩展名判定，不区分大小写）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Spreadsheet,
    DelimitedText,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Spreadsheet),
            "csv" => Some(SourceFormat::DelimitedText),
            _ => None,
        }
    }
}

fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter()
        .all(|cell| cell.is_null() || matches!(cell, CellValue::Text(s) if s.trim().is_empty()))
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn read_rows(&self, file_path: &Path, _sheet: &SheetSelector) -> ImportResult<RowGrid> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_path(file_path)?;

        let mut rows = Vec::new();
        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            let row: Vec<CellValue> = record
                .iter()
                .enumerate()
                .map(|(col_idx, value)| {
                    if row_idx == 0 && col_idx == 0 {
                        CellValue::infer(value.trim_start_matches('\u{feff}'))
                    } else {
                        CellValue::infer(value)
                    }
                })
                .collect();

            // 跳过完全空白的行
            if is_blank_row(&row) {
                continue;
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Null,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Int(i) => CellValue::Integer(*i),
            Data::Float(f) => {
                // Excel 中整数也以浮点存储
                if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                    CellValue::Integer(*f as i64)
                } else {
                    CellValue::Real(*f)
                }
            }
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => CellValue::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Real(dt.as_f64()),
            },
            Data::DateTimeIso(s) => CellValue::Text(s.replace('T', " ")),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

impl FileParser for ExcelParser {
    fn read_rows(&self, file_path: &Path, sheet: &SheetSelector) -> ImportResult<RowGrid> {
        let mut workbook = open_workbook_auto(file_path)?;

        let range = match sheet {
            SheetSelector::Index(idx) => workbook
                .worksheet_range_at(*idx)
                .ok_or_else(|| ImportError::SheetNotFound(sheet.to_string()))??,
            SheetSelector::Name(name) => {
                if !workbook.sheet_names().iter().any(|n| n == name) {
                    return Err(ImportError::SheetNotFound(name.clone()));
                }
                workbook.worksheet_range(name)?
            }
        };

        // Range 从第一个非空单元格开始，补齐左侧空列以保持列位置
        let col_offset = range.start().map(|(_, c)| c as usize).unwrap_or(0);

        let mut rows = Vec::new();
        for data_row in range.rows() {
            let mut row = vec![CellValue::Null; col_offset];
            row.extend(data_row.iter().map(Self::convert_cell));

            // 跳过完全空白的行
            if is_blank_row(&row) {
                continue;
            }
            rows.push(row);
        }

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 不支持的扩展名返回 Ok(None)（不是错误）
    pub fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
        sheet: &SheetSelector,
    ) -> ImportResult<Option<RowGrid>> {
        let path = file_path.as_ref();
        match SourceFormat::from_path(path) {
            Some(SourceFormat::DelimitedText) => CsvParser.read_rows(path, sheet).map(Some),
            Some(SourceFormat::Spreadsheet) => ExcelParser.read_rows(path, sheet).map(Some),
            None => Ok(None),
        }
    }
}
