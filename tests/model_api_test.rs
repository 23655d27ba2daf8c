// ==========================================
// ModelApi / 批次编排 集成测试
// ==========================================
// 测试目标:
// - 提交前整批校验
// - 后台执行 + 任务状态轮询
// - 单个配置写入失败不影响其余配置
// ==========================================


use metric_handel::api::{ApiError, ModelApi};
use metric_handel::app::TaskRegistry;
use metric_handel::domain::{ConfigOutcome, TaskStatus};
use metric_handel::importer::{BatchOrchestrator, NoopObserver};
use metric_handel::repository::SqliteTableWriter;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{count_rows, mapping_json, TestWorkspace};

fn model_api(ws: &TestWorkspace) -> ModelApi {
    ModelApi::new(
        ws.models_dir.clone(),
        ws.db_path.clone(),
        Arc::new(TaskRegistry::default()),
    )
}

#[tokio::test]
async fn test_execute_models_runs_in_background() {
    let ws = TestWorkspace::new();
    ws.write_csv("4g.csv", &["CGI,流量", "1,2.5", "2,3.5"]);
    ws.write_csv("5g.txt", &["ignored"]);
    let m1 = ws.write_model(
        "4g.json",
        &mapping_json(
            &ws.data_pattern("*.csv"),
            "4G",
            1,
            2,
            &[("CGI", "CGI", json!(null)), ("流量", "流量", json!(0))],
            false,
        ),
    );
    let m2 = ws.write_model(
        "none.json",
        &mapping_json(&ws.data_pattern("*.xlsx"), "5G", 1, 2, &[("CGI", "CGI", json!(null))], false),
    );
    let api = model_api(&ws);

    let task_id = api.execute_models(vec![m1.clone(), m2.clone()]).await.unwrap();

    let mut snapshot = api.get_task_status(&task_id).unwrap();
    for _ in 0..250 {
        if snapshot.status.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        snapshot = api.get_task_status(&task_id).unwrap();
    }

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.progress, 2);
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.results.get(&m1), Some(&ConfigOutcome::Imported { rows: 2 }));
    assert_eq!(snapshot.results.get(&m2), Some(&ConfigOutcome::Imported { rows: 0 }));
    assert_eq!(count_rows(&ws.db_path, "4G"), Some(2));
    assert_eq!(count_rows(&ws.db_path, "5G"), None);
}

#[tokio::test]
async fn test_execute_models_rejects_whole_batch() {
    let ws = TestWorkspace::new();
    ws.write_csv("a.csv", &["ID", "1"]);
    let good = ws.write_model(
        "good.json",
        &mapping_json(&ws.data_pattern("*.csv"), "t", 1, 2, &[("ID", "ID", json!(0))], false),
    );
    let equal_rows = ws.write_model(
        "equal.json",
        &mapping_json(&ws.data_pattern("*.csv"), "t", 2, 2, &[("ID", "ID", json!(0))], false),
    );
    let no_columns = ws.write_model(
        "nocols.json",
        &mapping_json(&ws.data_pattern("*.csv"), "t", 1, 2, &[], false),
    );
    let api = model_api(&ws);

    let err = api
        .execute_models(vec![good, equal_rows.clone(), no_columns.clone()])
        .await
        .unwrap_err();

    match err {
        ApiError::ValidationFailed { failures } => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].config, equal_rows);
            assert!(failures[0].reason.contains("FieldRow (2)"));
            assert_eq!(failures[1].config, no_columns);
        }
        other => panic!("Expected ValidationFailed, got {:?}", other),
    }
    // 校验失败时不做任何导入
    assert_eq!(count_rows(&ws.db_path, "t"), None);
}

#[test]
fn test_process_config_and_many() {
    let ws = TestWorkspace::new();
    ws.write_csv("a.csv", &["ID", "1", "2", "3"]);
    let model = ws.write_model(
        "m.json",
        &mapping_json(&ws.data_pattern("*.csv"), "t", 1, 2, &[("ID", "ID", json!(0))], false),
    );
    let api = model_api(&ws);

    assert_eq!(api.process_config(&model).unwrap(), 3);

    let report = api.process_many(&[model.clone(), model.clone()]);
    assert_eq!(report.len(), 2);
    assert_eq!(report.total_rows(), 6);
    assert_eq!(count_rows(&ws.db_path, "t"), Some(9));
}

#[test]
fn test_storage_failure_is_recorded_and_batch_continues() {
    let ws = TestWorkspace::new();
    ws.write_csv("a.csv", &["ID", "1"]);
    let writes = ws.write_model(
        "writes.json",
        &mapping_json(&ws.data_pattern("*.csv"), "t", 1, 2, &[("ID", "ID", json!(0))], false),
    );
    let empty = ws.write_model(
        "empty.json",
        &mapping_json(&ws.data_pattern("*.xlsx"), "t", 1, 2, &[("ID", "ID", json!(0))], false),
    );

    // 数据库文件内容不是 SQLite 格式，写入必然失败
    let bad_db = ws.root().join("not_a_db.db");
    std::fs::write(&bad_db, vec![b'x'; 4096]).unwrap();
    let orchestrator = BatchOrchestrator::new(Arc::new(SqliteTableWriter::new(&bad_db)));

    let report = orchestrator.run_all(&[writes.clone(), empty.clone()], &NoopObserver);

    assert!(report.get(&writes).unwrap().is_failed());
    assert_eq!(report.get(&empty), Some(&ConfigOutcome::Imported { rows: 0 }));
    assert_eq!(report.failed_count(), 1);
}
