// ==========================================
// 指标数据处理系统 - 数据表API
// ==========================================
// 职责: 数据表浏览/计数/清空 + CSV 导出
// 导出: UTF-8 BOM（兼容表格软件直接打开），文件名 <表名>_<YYYYMMDD_HHMMSS>.csv
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::CellValue;
use crate::repository::{TableBrowser, TablePage, TableQuery};
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// UTF-8 BOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 数据表API
pub struct TableApi {
    browser: TableBrowser,
}

impl TableApi {
    /// 创建新的TableApi实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &Path) -> ApiResult<Self> {
        Ok(Self {
            browser: TableBrowser::new(db_path)?,
        })
    }

    pub fn list_tables(&self) -> ApiResult<Vec<String>> {
        Ok(self.browser.list_tables()?)
    }

    pub fn table_columns(&self, table: &str) -> ApiResult<Vec<String>> {
        Ok(self.browser.table_columns(table)?)
    }

    pub fn table_page(
        &self,
        table: &str,
        page: usize,
        page_size: usize,
        query: &TableQuery,
    ) -> ApiResult<TablePage> {
        Ok(self.browser.table_page(table, page, page_size, query)?)
    }

    pub fn table_count(&self, table: &str) -> ApiResult<usize> {
        Ok(self.browser.table_count(table)?)
    }

    /// 清空表数据
    ///
    /// # 返回
    /// 删除的行数
    pub fn clear_table(&self, table: &str) -> ApiResult<usize> {
        let affected = self.browser.clear_table(table)?;
        info!(table = %table, affected = affected, "数据表已清空");
        Ok(affected)
    }

    /// 导出匹配行为 CSV（带 BOM）
    ///
    /// # 返回
    /// - Ok(usize): 导出行数
    /// - Err(ApiError::NotFound): 没有数据可导出
    pub fn export_csv<W: Write>(
        &self,
        table: &str,
        query: &TableQuery,
        mut out: W,
    ) -> ApiResult<usize> {
        let dataset = self.browser.query_all(table, query)?;
        if dataset.is_empty() {
            return Err(ApiError::NotFound(format!("数据表 {} 没有数据可导出", table)));
        }

        out.write_all(UTF8_BOM)?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&dataset.columns).map_err(csv_error)?;
        for row in &dataset.rows {
            writer
                .write_record(row.iter().map(csv_field))
                .map_err(csv_error)?;
        }
        writer.flush()?;

        Ok(dataset.len())
    }

    /// 导出到文件
    ///
    /// target 为目录时在其中按默认文件名生成，否则直接写入该路径
    ///
    /// # 返回
    /// (实际写入路径, 导出行数)
    pub fn export_csv_to(
        &self,
        table: &str,
        query: &TableQuery,
        target: &Path,
    ) -> ApiResult<(PathBuf, usize)> {
        let path = if target.is_dir() {
            target.join(export_file_name(table, Local::now()))
        } else {
            target.to_path_buf()
        };

        // 先在内存中生成，避免无数据时留下空文件
        let mut buffer = Vec::new();
        let rows = self.export_csv(table, query, &mut buffer)?;
        std::fs::write(&path, buffer)?;

        info!(table = %table, rows = rows, file_path = %path.display(), "CSV 导出完成");
        Ok((path, rows))
    }
}

/// 导出文件名
///
/// 表名中的路径分隔符及 Windows 保留字符替换为 '_'
pub fn export_file_name(table: &str, at: DateTime<Local>) -> String {
    let stem: String = table
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}_{}.csv", stem, at.format("%Y%m%d_%H%M%S"))
}

fn csv_error(err: csv::Error) -> ApiError {
    if err.is_io_error() {
        ApiError::IoError(err.to_string())
    } else {
        ApiError::InternalError(format!("CSV 写入失败: {}", err))
    }
}

fn csv_field(value: &CellValue) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TableApi) {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("Data.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "指标" ("小区" TEXT, "流量" REAL);
            INSERT INTO "指标" VALUES ('A,1', 1.5), ('B', NULL);
            CREATE TABLE "空表" ("x" TEXT);
            "#,
        )
        .unwrap();
        drop(conn);
        let api = TableApi::new(&db).unwrap();
        (dir, api)
    }

    #[test]
    fn test_export_csv_with_bom() {
        let (_dir, api) = setup();
        let mut out = Vec::new();

        let rows = api.export_csv("指标", &TableQuery::default(), &mut out).unwrap();

        assert_eq!(rows, 2);
        assert!(out.starts_with(UTF8_BOM));
        let text = String::from_utf8(out[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "小区,流量\n\"A,1\",1.5\nB,\n");
    }

    #[test]
    fn test_export_empty_is_not_found() {
        let (_dir, api) = setup();
        let err = api
            .export_csv("空表", &TableQuery::default(), Vec::new())
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_export_to_directory_uses_generated_name() {
        let (dir, api) = setup();
        let (path, rows) = api
            .export_csv_to("指标", &TableQuery::default().filter("小区", "B"), dir.path())
            .unwrap();

        assert_eq!(rows, 1);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("指标_"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn test_export_file_name_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(export_file_name("t", at), "t_20240305_070809.csv");
        assert_eq!(
            export_file_name("../4G/日\\报:v1", at),
            ".._4G_日_报_v1_20240305_070809.csv"
        );
    }

    #[test]
    fn test_export_table_with_separator_stays_in_directory() {
        let (dir, api) = setup();
        let conn = Connection::open(dir.path().join("Data.db")).unwrap();
        conn.execute_batch(r#"CREATE TABLE "4G/日报" ("x" TEXT); INSERT INTO "4G/日报" VALUES ('1');"#)
            .unwrap();
        drop(conn);

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();
        let (path, rows) = api
            .export_csv_to("4G/日报", &TableQuery::default(), &out_dir)
            .unwrap();

        assert_eq!(rows, 1);
        assert_eq!(path.parent(), Some(out_dir.as_path()));
        assert!(path.is_file());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("4G_日报_"));
    }

    #[test]
    fn test_csv_format_error_is_internal() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["a", "b"]).unwrap();
        let err = writer.write_record(["a"]).unwrap_err();
        assert_eq!(csv_error(err).code(), "INTERNAL_ERROR");
    }
}
