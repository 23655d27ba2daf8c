// ==========================================
// 指标数据处理系统 - 后台任务登记表
// ==========================================
// 职责: 记录后台批次任务的状态/进度/结果，供轮询方查询
// 约束:
// - 容量有限（默认 64），满时优先淘汰最早结束的任务
// - 只有在没有已结束任务时才淘汰最早的运行中任务
// - 由应用层创建并注入，不作为全局状态
// ==========================================

use crate::config::config_display_name;
use crate::domain::{BatchReport, ConfigOutcome, TaskStatus};
use crate::importer::ProgressObserver;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// 默认容量
pub const DEFAULT_TASK_CAPACITY: usize = 64;

/// 任务记录
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    /// 已完成的配置数
    pub progress: usize,
    pub total: usize,
    /// 当前进度描述
    pub current: String,
    pub results: BatchReport,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// 对外查询快照（附带已耗时）
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: usize,
    pub total: usize,
    pub current: String,
    pub results: BatchReport,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
}

impl TaskRecord {
    fn snapshot(&self, now: DateTime<Utc>) -> TaskSnapshot {
        let end = self.ended_at.unwrap_or(now);
        let elapsed_seconds = (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        TaskSnapshot {
            task_id: self.task_id.clone(),
            status: self.status,
            progress: self.progress,
            total: self.total,
            current: self.current.clone(),
            results: self.results.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            elapsed_seconds,
        }
    }
}

// ==========================================
// TaskRegistry
// ==========================================
pub struct TaskRegistry {
    capacity: usize,
    tasks: Mutex<VecDeque<TaskRecord>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_CAPACITY)
    }
}

impl TaskRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tasks: Mutex::new(VecDeque::new()),
        }
    }

    // 锁中毒时继续使用内部数据（记录只是状态快照）
    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskRecord>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 登记新任务，返回任务 ID
    pub fn register(&self, total: usize) -> String {
        let task_id = Uuid::new_v4().to_string();
        let mut tasks = self.lock();

        while tasks.len() >= self.capacity {
            let victim = tasks
                .iter()
                .position(|t| t.status.is_finished())
                .unwrap_or(0);
            if let Some(evicted) = tasks.remove(victim) {
                if evicted.status.is_finished() {
                    debug!(task_id = %evicted.task_id, "已淘汰最早结束的任务");
                } else {
                    warn!(task_id = %evicted.task_id, "任务登记表已满，淘汰运行中的任务记录");
                }
            }
        }

        tasks.push_back(TaskRecord {
            task_id: task_id.clone(),
            status: TaskStatus::Running,
            progress: 0,
            total,
            current: String::new(),
            results: BatchReport::new(),
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        });
        task_id
    }

    fn update<F>(&self, task_id: &str, f: F)
    where
        F: FnOnce(&mut TaskRecord),
    {
        let mut tasks = self.lock();
        if let Some(record) = tasks.iter_mut().find(|t| t.task_id == task_id) {
            f(record);
        }
    }

    pub fn mark_config_started(&self, task_id: &str, index: usize, config: &Path) {
        let name = config_display_name(config);
        self.update(task_id, |r| {
            r.progress = index;
            r.current = format!("正在处理: {}", name);
        });
    }

    pub fn mark_config_finished(
        &self,
        task_id: &str,
        index: usize,
        config: &Path,
        outcome: &ConfigOutcome,
    ) {
        self.update(task_id, |r| {
            r.progress = index + 1;
            r.results.record(config, outcome.clone());
        });
    }

    /// 批次正常结束
    pub fn complete(&self, task_id: &str, report: BatchReport) {
        self.update(task_id, |r| {
            r.status = TaskStatus::Completed;
            r.progress = r.total;
            r.current = "执行完成".to_string();
            r.results = report;
            r.ended_at = Some(Utc::now());
        });
    }

    /// 后台执行体自身异常终止
    pub fn fail(&self, task_id: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(task_id, |r| {
            r.status = TaskStatus::Failed;
            r.error = Some(error);
            r.ended_at = Some(Utc::now());
        });
    }

    pub fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.lock().iter().find(|t| t.task_id == task_id).cloned()
    }

    pub fn snapshot(&self, task_id: &str) -> Option<TaskSnapshot> {
        let now = Utc::now();
        self.lock()
            .iter()
            .find(|t| t.task_id == task_id)
            .map(|t| t.snapshot(now))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ==========================================
// RegistryObserver - 把编排器进度写回登记表
// ==========================================
pub struct RegistryObserver {
    registry: Arc<TaskRegistry>,
    task_id: String,
}

impl RegistryObserver {
    pub fn new(registry: Arc<TaskRegistry>, task_id: impl Into<String>) -> Self {
        Self {
            registry,
            task_id: task_id.into(),
        }
    }
}

impl ProgressObserver for RegistryObserver {
    fn on_config_started(&self, index: usize, _total: usize, config: &Path) {
        self.registry.mark_config_started(&self.task_id, index, config);
    }

    fn on_config_finished(&self, index: usize, config: &Path, outcome: &ConfigOutcome) {
        self.registry
            .mark_config_finished(&self.task_id, index, config, outcome);
    }
}
