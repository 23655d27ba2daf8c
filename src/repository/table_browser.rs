// ==========================================
// 指标数据处理系统 - 数据表浏览仓储
// ==========================================
// 职责: 列表/分页/筛选/排序/计数/清空 任意用户表
// 约束: 表名、列名一律转义；筛选值一律参数化
// ==========================================

use crate::db::{ensure_parent_dir, open_sqlite_connection, quote_ident, table_columns, table_exists};
use crate::domain::{CellValue, Dataset};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 每页行数上限
pub const MAX_PAGE_SIZE: usize = 1000;

/// 默认每页行数
pub const DEFAULT_PAGE_SIZE: usize = 50;

// ==========================================
// 查询条件
// ==========================================

/// 单字段模糊筛选（LIKE %value%）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// 浏览查询（多字段筛选取交集 + 可选排序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
}

impl TableQuery {
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            order,
        });
        self
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    /// 与 columns 对齐的行
    pub data: Vec<Vec<CellValue>>,
    pub total_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub columns: Vec<String>,
}

// ==========================================
// TableBrowser
// ==========================================
pub struct TableBrowser {
    conn: Arc<Mutex<Connection>>,
}

impl TableBrowser {
    /// 打开数据库（文件不存在时创建）
    pub fn new(db_path: &Path) -> RepositoryResult<Self> {
        ensure_parent_dir(db_path)?;
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 用户表列表（按名称排序）
    pub fn list_tables(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    pub fn table_columns(&self, table: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        Self::require_table(&conn, table)?;
        Ok(table_columns(&conn, table)?)
    }

    /// 分页查询
    ///
    /// # 参数
    /// - page: 页码（从 1 开始）
    /// - page_size: 每页行数（1..=1000）
    pub fn table_page(
        &self,
        table: &str,
        page: usize,
        page_size: usize,
        query: &TableQuery,
    ) -> RepositoryResult<TablePage> {
        if page < 1 {
            return Err(RepositoryError::InvalidInput(format!(
                "页码必须从 1 开始，实际为 {}",
                page
            )));
        }
        if page_size < 1 || page_size > MAX_PAGE_SIZE {
            return Err(RepositoryError::InvalidInput(format!(
                "每页行数必须在 1..={} 之间，实际为 {}",
                MAX_PAGE_SIZE, page_size
            )));
        }

        let offset = (page - 1)
            .checked_mul(page_size)
            .and_then(|o| i64::try_from(o).ok())
            .ok_or_else(|| {
                RepositoryError::InvalidInput(format!("页码超出范围: {}", page))
            })?;

        let conn = self.get_conn()?;
        Self::require_table(&conn, table)?;
        let (where_sql, mut params) = Self::where_clause(&conn, table, query)?;
        let order_sql = Self::order_clause(&conn, table, query)?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_ident(table),
            where_sql
        );
        let total_count: i64 =
            conn.query_row(&count_sql, params_from_iter(params.iter()), |r| r.get(0))?;
        let total_count = total_count.max(0) as usize;

        let data_sql = format!(
            "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
            quote_ident(table),
            where_sql,
            order_sql
        );
        params.push(Value::Integer(page_size as i64));
        params.push(Value::Integer(offset));

        let (columns, data) = Self::fetch(&conn, &data_sql, &params)?;

        Ok(TablePage {
            data,
            total_count,
            total_pages: total_count.div_ceil(page_size),
            current_page: page,
            page_size,
            columns,
        })
    }

    /// 查询全部匹配行（不分页，导出用）
    pub fn query_all(&self, table: &str, query: &TableQuery) -> RepositoryResult<Dataset> {
        let conn = self.get_conn()?;
        Self::require_table(&conn, table)?;
        let (where_sql, params) = Self::where_clause(&conn, table, query)?;
        let order_sql = Self::order_clause(&conn, table, query)?;

        let sql = format!("SELECT * FROM {}{}{}", quote_ident(table), where_sql, order_sql);
        let (columns, rows) = Self::fetch(&conn, &sql, &params)?;
        Ok(Dataset { columns, rows })
    }

    pub fn table_count(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Self::require_table(&conn, table)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// 清空表数据（保留表结构）
    ///
    /// # 返回
    /// 删除的行数
    pub fn clear_table(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        Self::require_table(&conn, table)?;
        let affected = conn.execute(&format!("DELETE FROM {}", quote_ident(table)), [])?;
        Ok(affected)
    }

    // ===== 内部工具 =====

    fn require_table(conn: &Connection, table: &str) -> RepositoryResult<()> {
        if table_exists(conn, table)? {
            Ok(())
        } else {
            Err(RepositoryError::TableNotFound(table.to_string()))
        }
    }

    fn require_column(columns: &[String], table: &str, column: &str) -> RepositoryResult<()> {
        if columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(RepositoryError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    fn where_clause(
        conn: &Connection,
        table: &str,
        query: &TableQuery,
    ) -> RepositoryResult<(String, Vec<Value>)> {
        let active: Vec<&FieldFilter> = query
            .filters
            .iter()
            .filter(|f| !f.value.is_empty())
            .collect();
        if active.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let columns = table_columns(conn, table)?;
        let mut conditions = Vec::with_capacity(active.len());
        let mut params = Vec::with_capacity(active.len());
        for filter in active {
            Self::require_column(&columns, table, &filter.field)?;
            conditions.push(format!("{} LIKE ?", quote_ident(&filter.field)));
            params.push(Value::Text(format!("%{}%", filter.value)));
        }

        Ok((format!(" WHERE {}", conditions.join(" AND ")), params))
    }

    fn order_clause(conn: &Connection, table: &str, query: &TableQuery) -> RepositoryResult<String> {
        match &query.sort {
            Some(sort) => {
                let columns = table_columns(conn, table)?;
                Self::require_column(&columns, table, &sort.field)?;
                Ok(format!(
                    " ORDER BY {} {}",
                    quote_ident(&sort.field),
                    sort.order.as_sql()
                ))
            }
            None => Ok(String::new()),
        }
    }

    fn fetch(
        conn: &Connection,
        sql: &str,
        params: &[Value],
    ) -> RepositoryResult<(Vec<String>, Vec<Vec<CellValue>>)> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get::<_, CellValue>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TableBrowser) {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("Data.db");
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "小区指标" ("小区" TEXT, "流量" REAL);
            INSERT INTO "小区指标" VALUES ('北京-1', 3.5), ('北京-2', 1.0), ('上海-1', 2.0);
            CREATE TABLE "a_empty" ("x" TEXT);
            "#,
        )
        .unwrap();
        drop(conn);
        let browser = TableBrowser::new(&db).unwrap();
        (dir, browser)
    }

    #[test]
    fn test_list_tables_sorted() {
        let (_dir, browser) = setup();
        assert_eq!(browser.list_tables().unwrap(), vec!["a_empty", "小区指标"]);
    }

    #[test]
    fn test_page_with_filter() {
        let (_dir, browser) = setup();
        let query = TableQuery::default().filter("小区", "北京");

        let page = browser.table_page("小区指标", 1, 1, &query).unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.columns, vec!["小区", "流量"]);
    }

    #[test]
    fn test_page_sorted_desc() {
        let (_dir, browser) = setup();
        let query = TableQuery::default().sort_by("流量", SortOrder::Desc);

        let page = browser.table_page("小区指标", 1, 50, &query).unwrap();
        let first = &page.data[0];
        assert_eq!(first[1], CellValue::Real(3.5));
    }

    #[test]
    fn test_page_size_bounds() {
        let (_dir, browser) = setup();
        let q = TableQuery::default();
        assert!(matches!(
            browser.table_page("小区指标", 0, 10, &q),
            Err(RepositoryError::InvalidInput(_))
        ));
        assert!(matches!(
            browser.table_page("小区指标", 1, 1001, &q),
            Err(RepositoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_page_offset_out_of_range() {
        let (_dir, browser) = setup();
        let q = TableQuery::default();
        assert!(matches!(
            browser.table_page("小区指标", usize::MAX / 2, 1000, &q),
            Err(RepositoryError::InvalidInput(_))
        ));
        // 乘积未溢出 usize 但超出 i64
        assert!(matches!(
            browser.table_page("小区指标", usize::MAX, 1, &q),
            Err(RepositoryError::InvalidInput(_))
        ));

        let page = browser.table_page("小区指标", 1_000_000, 1000, &q).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_unknown_table_and_column() {
        let (_dir, browser) = setup();
        assert!(matches!(
            browser.table_count("不存在"),
            Err(RepositoryError::TableNotFound(_))
        ));
        let q = TableQuery::default().filter("nope", "x");
        assert!(matches!(
            browser.table_page("小区指标", 1, 10, &q),
            Err(RepositoryError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_clear_table_keeps_schema() {
        let (_dir, browser) = setup();
        assert_eq!(browser.clear_table("小区指标").unwrap(), 3);
        assert_eq!(browser.table_count("小区指标").unwrap(), 0);
        assert_eq!(browser.table_columns("小区指标").unwrap().len(), 2);
    }
}
