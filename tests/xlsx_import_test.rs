// ==========================================
// Excel 导入集成测试
// ==========================================
// 测试目标: 工作表选择、左侧空列补齐、日期单元格转文本、表头/起始行开窗
// 测试文件: tests/fixtures/cell_metrics.xlsx
// - 汇总 (#0): A1 起，表头 区域/小区数，2 行数据
// - 明细 (#1): B2 起，第 1 行为导出时间，表头 小区/开始时间/流量，3 行数据
// ==========================================


use metric_handel::config::MappingConfig;
use metric_handel::domain::{CellValue, SheetSelector};
use metric_handel::importer::{
    BatchImporter, ConfigValidator, ExcelParser, FileParser, ImportError, TabularLoader,
};
use metric_handel::repository::SqliteTableWriter;
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::{column_text, count_rows, fixture_path, mapping_json, TestWorkspace};

const WORKBOOK: &str = "cell_metrics.xlsx";

fn detail_columns() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        ("小区", "小区", json!(null)),
        ("开始时间", "开始时间", json!(null)),
        ("流量", "流量", json!(0)),
    ]
}

fn load_config(
    ws: &TestWorkspace,
    sheet: Option<Value>,
    field_row: i64,
    start_row: i64,
    columns: &[(&str, &str, Value)],
) -> MappingConfig {
    let mut config = mapping_json(
        &ws.data_pattern("*.xlsx"),
        "小区指标",
        field_row,
        start_row,
        columns,
        false,
    );
    if let Some(sheet) = sheet {
        config["File"]["SheetName"] = sheet;
    }
    let path = ws.write_model("xlsx.json", &config);
    ConfigValidator::load(&path).unwrap()
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[test]
fn test_excel_parser_pads_leading_columns_and_converts_dates() {
    let rows = ExcelParser
        .read_rows(&fixture_path(WORKBOOK), &SheetSelector::Name("明细".to_string()))
        .unwrap();

    assert_eq!(rows.len(), 5);
    // 数据从 B 列开始，A 列补 Null
    assert_eq!(rows[0][0], CellValue::Null);
    assert_eq!(rows[0][1], text("导出时间"));
    assert_eq!(rows[1], vec![CellValue::Null, text("小区"), text("开始时间"), text("流量")]);
    assert_eq!(rows[2][2], text("2024-01-01 00:00:00"));
    assert_eq!(rows[3][2], text("2024-01-01 12:00:00"));
    assert_eq!(rows[2][3], CellValue::Real(1.5));
    assert_eq!(rows[3][3], CellValue::Integer(2));
}

#[test]
fn test_named_sheet_with_header_row_two_start_row_four() {
    let ws = TestWorkspace::new();
    let config = load_config(&ws, Some(json!("明细")), 2, 4, &detail_columns());

    let ds = TabularLoader::new()
        .try_load(&fixture_path(WORKBOOK), &config)
        .unwrap();

    // 表头之后跳过 A-1
    assert_eq!(ds.columns, vec!["小区", "开始时间", "流量"]);
    assert_eq!(
        ds.rows,
        vec![
            vec![text("A-2"), text("2024-01-01 12:00:00"), CellValue::Integer(2)],
            vec![text("A-3"), text("2024-01-02 00:00:00"), CellValue::Real(3.25)],
        ]
    );
}

#[test]
fn test_indexed_sheet_selection() {
    let ws = TestWorkspace::new();

    // 未指定时取第一个工作表
    let first = load_config(
        &ws,
        None,
        1,
        2,
        &[("区域", "区域", json!(null)), ("小区数", "小区数", json!(0))],
    );
    let ds = TabularLoader::new()
        .try_load(&fixture_path(WORKBOOK), &first)
        .unwrap();
    assert_eq!(
        ds.rows,
        vec![
            vec![text("北京"), CellValue::Integer(10)],
            vec![text("上海"), CellValue::Integer(20)],
        ]
    );

    let second = load_config(&ws, Some(json!(1)), 2, 3, &detail_columns());
    let ds = TabularLoader::new()
        .try_load(&fixture_path(WORKBOOK), &second)
        .unwrap();
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.rows[0][0], text("A-1"));
}

#[test]
fn test_missing_sheet_is_reported() {
    let ws = TestWorkspace::new();
    let loader = TabularLoader::new();

    let by_name = load_config(&ws, Some(json!("不存在")), 1, 2, &detail_columns());
    let err = loader
        .try_load(&fixture_path(WORKBOOK), &by_name)
        .unwrap_err();
    assert!(matches!(err, ImportError::SheetNotFound(ref name) if name == "不存在"));

    let by_index = load_config(&ws, Some(json!(5)), 1, 2, &detail_columns());
    let err = loader
        .try_load(&fixture_path(WORKBOOK), &by_index)
        .unwrap_err();
    assert!(matches!(err, ImportError::SheetNotFound(_)));

    // 批次内视为 0 行
    assert!(loader.load(&fixture_path(WORKBOOK), &by_index).is_empty());
}

#[test]
fn test_workbook_imported_through_glob() {
    let ws = TestWorkspace::new();
    ws.copy_fixture(WORKBOOK, "day1.xlsx");
    ws.write_csv("notes.csv", &["无关"]);
    let config = load_config(&ws, Some(json!("明细")), 2, 3, &detail_columns());

    let report = BatchImporter::new(Arc::new(SqliteTableWriter::new(&ws.db_path)))
        .run(&config)
        .unwrap();

    assert_eq!(report.files_matched, 1);
    assert_eq!(report.rows_imported, 3);
    assert_eq!(count_rows(&ws.db_path, "小区指标"), Some(3));
    assert_eq!(
        column_text(&ws.db_path, "小区指标", "开始时间"),
        vec![
            Some("2024-01-01 00:00:00".to_string()),
            Some("2024-01-01 12:00:00".to_string()),
            Some("2024-01-02 00:00:00".to_string()),
        ]
    );
}
