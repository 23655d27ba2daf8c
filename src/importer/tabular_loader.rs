// ==========================================
// 指标数据处理系统 - 表格加载器
// ==========================================
// 职责: 单个源文件 → 只含映射列的矩形数据集
// 流程: 按扩展名分派 → 读出行网格 → 表头/起始行开窗 → 字段映射
// 开窗: 表头为第 FieldRow 行，数据取原文件第 StartRow 行起
//       （即表头之后跳过 StartRow - FieldRow - 1 行）
// ==========================================

use crate::config::MappingConfig;
use crate::domain::Dataset;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{RowGrid, UniversalFileParser};
use std::path::Path;
use tracing::{debug, warn};

pub struct TabularLoader {
    parser: UniversalFileParser,
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularLoader {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }

    /// 加载单个文件（错误向上传递）
    ///
    /// # 返回
    /// - Ok(Dataset): 映射后的数据集（不支持的扩展名返回空数据集）
    /// - Err: 文件损坏、工作表不存在、表头行越界等
    pub fn try_load(&self, file_path: &Path, config: &MappingConfig) -> ImportResult<Dataset> {
        let grid = match self.parser.parse(file_path, &config.sheet) {
            Ok(Some(grid)) => grid,
            Ok(None) => {
                debug!(file_path = %file_path.display(), "扩展名不受支持，跳过");
                return Ok(Dataset::new(config.target_fields()));
            }
            Err(ImportError::FileRead { message, .. }) => {
                return Err(ImportError::FileRead {
                    path: file_path.display().to_string(),
                    message,
                })
            }
            Err(e) => return Err(e),
        };

        let dataset = Self::window_and_map(grid, config)?;
        debug!(
            file_path = %file_path.display(),
            rows = dataset.len(),
            "文件加载完成"
        );
        Ok(dataset)
    }

    /// 加载单个文件（失败记为警告并返回空数据集，不中断批次）
    pub fn load(&self, file_path: &Path, config: &MappingConfig) -> Dataset {
        match self.try_load(file_path, config) {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(file_path = %file_path.display(), error = %e, "读取文件失败，已跳过");
                Dataset::new(config.target_fields())
            }
        }
    }

    /// 表头/起始行开窗 + 字段映射
    fn window_and_map(grid: RowGrid, config: &MappingConfig) -> ImportResult<Dataset> {
        let header_idx = config.header_row - 1;
        if header_idx >= grid.len() {
            return Err(ImportError::HeaderRowOutOfRange {
                header_row: config.header_row,
                available: grid.len(),
            });
        }

        let mut rows = grid.into_iter().skip(header_idx);
        let header = rows.next().unwrap_or_default();
        let headers = FieldMapper::resolve_headers(&header);

        let data: RowGrid = rows.skip(config.rows_to_skip_after_header()).collect();
        Ok(FieldMapper::map_rows(&headers, &data, &config.columns))
    }
}
