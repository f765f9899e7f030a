//! 课程生成状态轮询
//! 按固定间隔读取持久化状态，到达终态后通知一次并停止

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::models::{GenerationState, GenerationStatus};
use crate::services::database::DatabaseService;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";
pub const CHECK_FAILED_MESSAGE: &str = "Failed to check course generation status. Please try again.";

/// 状态读取来源
pub trait StatusSource: Send + Sync {
    /// 返回 (课程标题, 生成状态)，记录不存在时为 None
    fn fetch_state(&self, course_id: &str) -> Result<Option<(String, GenerationState)>>;
}

impl StatusSource for DatabaseService {
    fn fetch_state(&self, course_id: &str) -> Result<Option<(String, GenerationState)>> {
        Ok(self.find_course(course_id)?.map(|c| (c.title, c.content)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

/// 一次性用户通知
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, title: &str, description: &str);
}

/// 通过日志输出通知
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, title: &str, description: &str) {
        match kind {
            NotificationKind::Success => log::info!("{}: {}", title, description),
            NotificationKind::Error => log::error!("{}: {}", title, description),
        }
    }
}

/// 轮询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Completed { course_id: String, title: String },
    Failed { course_id: String, message: String },
    CheckFailed { course_id: String, message: String },
}

impl PollOutcome {
    pub fn course_id(&self) -> &str {
        match self {
            PollOutcome::Completed { course_id, .. }
            | PollOutcome::Failed { course_id, .. }
            | PollOutcome::CheckFailed { course_id, .. } => course_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }
}

/// 单个课程的轮询器
pub struct GenerationPoller {
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl GenerationPoller {
    pub fn new(source: Arc<dyn StatusSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            notifier,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 持续轮询直到终态或读取失败，中间态、未知状态与缺失记录都继续等待
    pub async fn watch(&self, course_id: &str) -> PollOutcome {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (title, state) = match self.source.fetch_state(course_id) {
                Ok(Some(found)) => found,
                Ok(None) => {
                    log::debug!("Course {} not found yet, still waiting", course_id);
                    continue;
                }
                Err(e) => {
                    log::error!("Error checking course status for {}: {}", course_id, e);
                    self.notifier.notify(NotificationKind::Error, "Error", CHECK_FAILED_MESSAGE);
                    return PollOutcome::CheckFailed {
                        course_id: course_id.to_string(),
                        message: CHECK_FAILED_MESSAGE.to_string(),
                    };
                }
            };

            match state.status {
                GenerationStatus::Complete => {
                    self.notifier.notify(
                        NotificationKind::Success,
                        "Course Generation Complete",
                        &format!("Your course \"{}\" has been generated successfully.", title),
                    );
                    return PollOutcome::Completed {
                        course_id: course_id.to_string(),
                        title,
                    };
                }
                GenerationStatus::Error => {
                    let message = state
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
                    self.notifier
                        .notify(NotificationKind::Error, "Course Generation Failed", &message);
                    return PollOutcome::Failed {
                        course_id: course_id.to_string(),
                        message,
                    };
                }
                other => log::debug!("Course {} is {}", course_id, other),
            }
        }
    }
}

// ==================== 多任务追踪 ====================

/// 每个进行中的课程一个独立轮询任务
pub struct GenerationTracker {
    poller: Arc<GenerationPoller>,
    tasks: Mutex<HashMap<String, JoinHandle<PollOutcome>>>,
}

impl GenerationTracker {
    pub fn new(poller: GenerationPoller) -> Self {
        Self {
            poller: Arc::new(poller),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// 开始追踪；已在追踪中的课程不会重复启动，返回是否新建了任务
    pub fn start(&self, course_id: &str) -> Result<bool> {
        let mut tasks = self.tasks.lock().map_err(|_| Error::LockPoisoned)?;

        if let Some(handle) = tasks.get(course_id) {
            if !handle.is_finished() {
                return Ok(false);
            }
        }

        let poller = Arc::clone(&self.poller);
        let id = course_id.to_string();
        let handle = tokio::spawn(async move { poller.watch(&id).await });
        tasks.insert(course_id.to_string(), handle);

        log::info!("Tracking generation of course {}", course_id);
        Ok(true)
    }

    pub fn is_tracking(&self, course_id: &str) -> bool {
        self.tasks
            .lock()
            .map(|tasks| tasks.get(course_id).is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// 停止单个课程的轮询
    pub fn cancel(&self, course_id: &str) -> bool {
        let handle = match self.tasks.lock() {
            Ok(mut tasks) => tasks.remove(course_id),
            Err(_) => None,
        };

        match handle {
            Some(handle) => {
                handle.abort();
                log::debug!("Stopped tracking course {}", course_id);
                true
            }
            None => false,
        }
    }

    /// 停止全部轮询
    pub fn cancel_all(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (_, handle) in tasks.drain() {
                handle.abort();
            }
        }
    }

    /// 等待课程轮询结束；未在追踪时返回 None
    pub async fn wait(&self, course_id: &str) -> Result<Option<PollOutcome>> {
        let handle = self.tasks.lock().map_err(|_| Error::LockPoisoned)?.remove(course_id);

        match handle {
            Some(handle) => Ok(Some(handle.await?)),
            None => Ok(None),
        }
    }
}

impl Drop for GenerationTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
