// ==========================================
// 指标数据处理系统 - 数据表写入器
// ==========================================
// 职责: 把数据集追加到指定表（写时建表）
// 约束:
// - 每次写入使用独立连接，写完即释放
// - 一次追加的所有行在同一事务中提交
// - 表已存在但缺列时 ALTER TABLE ADD COLUMN（只增不减）
// - 存在“开始时间”列时尽力建索引，失败不报错
// ==========================================

use crate::db::{ensure_parent_dir, open_sqlite_connection, quote_ident, table_columns, table_exists};
use crate::domain::{CellValue, Dataset, WritePolicy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params_from_iter, Connection, Transaction};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// 尽力建索引的时间列名
pub const START_TIME_COLUMN: &str = "开始时间";

/// 表写入接口
pub trait TableWriter: Send + Sync {
    /// 追加数据集
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    fn append(&self, table: &str, dataset: &Dataset, policy: &WritePolicy)
        -> RepositoryResult<usize>;
}

// ==========================================
// SqliteTableWriter
// ==========================================
pub struct SqliteTableWriter {
    db_path: PathBuf,
}

impl SqliteTableWriter {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn open(&self) -> RepositoryResult<Connection> {
        ensure_parent_dir(&self.db_path)?;
        open_sqlite_connection(&self.db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))
    }

    /// 建表或补齐缺失列
    fn ensure_schema(tx: &Transaction, table: &str, dataset: &Dataset) -> RepositoryResult<()> {
        if !table_exists(tx, table)? {
            let defs: Vec<String> = dataset
                .columns
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    format!("{} {}", quote_ident(name), infer_affinity(dataset, idx))
                })
                .collect();
            let sql = format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "));
            tx.execute(&sql, [])?;
            debug!(table = %table, columns = dataset.columns.len(), "已创建数据表");
            return Ok(());
        }

        let existing: HashSet<String> = table_columns(tx, table)?.into_iter().collect();
        for (idx, name) in dataset.columns.iter().enumerate() {
            if existing.contains(name) {
                continue;
            }
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(table),
                quote_ident(name),
                infer_affinity(dataset, idx)
            );
            tx.execute(&sql, [])?;
            info!(table = %table, column = %name, "已为数据表补充新列");
        }
        Ok(())
    }

    /// 按键列建唯一索引（upsert 依赖）
    fn ensure_unique_key(tx: &Transaction, table: &str, keys: &[String]) -> RepositoryResult<()> {
        let index_name = unique_index_name(table, keys);
        let cols: Vec<String> = keys.iter().map(|k| quote_ident(k)).collect();
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&index_name),
            quote_ident(table),
            cols.join(", ")
        );
        tx.execute(&sql, [])?;
        Ok(())
    }

    /// 尽力为“开始时间”列建索引，任何错误都吞掉
    fn try_create_start_time_index(conn: &Connection, table: &str) {
        let index_name = format!("idx_{}_{}", table, START_TIME_COLUMN);
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&index_name),
            quote_ident(table),
            quote_ident(START_TIME_COLUMN)
        );
        if let Err(e) = conn.execute(&sql, []) {
            debug!(table = %table, error = %e, "时间列索引创建失败，已忽略");
        }
    }
}

impl TableWriter for SqliteTableWriter {
    fn append(
        &self,
        table: &str,
        dataset: &Dataset,
        policy: &WritePolicy,
    ) -> RepositoryResult<usize> {
        if dataset.is_empty() {
            return Ok(0);
        }
        if dataset.columns.is_empty() {
            return Err(RepositoryError::InvalidInput(format!(
                "数据集没有任何列，无法写入表 {}",
                table
            )));
        }

        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Self::ensure_schema(&tx, table, dataset)?;

        let verb = match policy {
            WritePolicy::AppendOnly => "INSERT",
            WritePolicy::UpsertByKey(keys) => {
                Self::ensure_unique_key(&tx, table, keys)?;
                "INSERT OR REPLACE"
            }
        };

        let cols: Vec<String> = dataset.columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "{} INTO {} ({}) VALUES ({})",
            verb,
            quote_ident(table),
            cols.join(", "),
            placeholders.join(", ")
        );

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in &dataset.rows {
                stmt.execute(params_from_iter(row.iter()))?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        if dataset.has_column(START_TIME_COLUMN) {
            Self::try_create_start_time_index(&conn, table);
        }

        info!(
            table = %table,
            rows = count,
            policy = policy.as_str(),
            "数据写入完成"
        );
        Ok(count)
    }
}

/// 唯一索引名
///
/// 索引名全库共享；表名与键列带长度前缀，不同 (表, 键列) 组合不会同名
fn unique_index_name(table: &str, keys: &[String]) -> String {
    let mut name = format!("uq_{}:{}", table.chars().count(), table);
    for key in keys {
        name.push_str(&format!("_{}:{}", key.chars().count(), key));
    }
    name
}

/// 由列值推断 SQLite 列亲和类型
///
/// 全为整数/布尔 → INTEGER；全为数值 → REAL；其余（含全空）→ TEXT
fn infer_affinity(dataset: &Dataset, idx: usize) -> &'static str {
    let mut seen_any = false;
    let mut all_integer = true;
    let mut all_numeric = true;

    for value in dataset.rows.iter().filter_map(|r| r.get(idx)) {
        match value {
            CellValue::Null => continue,
            CellValue::Integer(_) | CellValue::Bool(_) => {}
            CellValue::Real(_) => all_integer = false,
            CellValue::Text(_) => {
                all_integer = false;
                all_numeric = false;
            }
        }
        seen_any = true;
    }

    match (seen_any, all_integer, all_numeric) {
        (false, _, _) => "TEXT",
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}
