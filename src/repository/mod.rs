// ==========================================
// 指标数据处理系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，标识符一律转义
// ==========================================

pub mod error;
pub mod table_browser;
pub mod table_writer;

pub use error::{RepositoryError, RepositoryResult};
pub use table_browser::{
    FieldFilter, SortOrder, SortSpec, TableBrowser, TablePage, TableQuery, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use table_writer::{SqliteTableWriter, TableWriter, START_TIME_COLUMN};
