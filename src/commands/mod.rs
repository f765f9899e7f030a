// 命令模块
// 提供供 CLI 调用的命令接口，错误统一折叠为字符串

pub mod course;
pub mod interview;
pub mod parser;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::services::{
    CourseGenerator, DatabaseService, GeminiClient, GenerationPoller, GenerationTracker, InterviewService,
    LogNotifier, Notifier, TextGenerator,
};

pub use course::{
    create_course,
    finish_generation,
    generate_course,
    get_course_detail,
    get_course_status,
    list_courses,
    watch_course,
    CourseDetailDto,
    CourseDto,
    CourseStatusDto,
};

pub use interview::{
    analyze_interview,
    answer_question,
    get_interview_detail,
    list_interviews,
    start_interview,
    InterviewAnalysisDto,
    InterviewDetailDto,
    InterviewQuestionDto,
    MockInterviewDto,
};

pub use parser::{parse_course_document, parse_course_file, render_chapter, ParsedCourseDto};

/// 命令共享状态
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseService,
    pub generator: Arc<dyn TextGenerator>,
    pub course_generator: Arc<CourseGenerator>,
    pub interviews: InterviewService,
    pub tracker: GenerationTracker,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DatabaseService,
        generator: Arc<dyn TextGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let poller = GenerationPoller::new(Arc::new(db.clone()), notifier).with_interval(config.poll_interval);

        Self {
            course_generator: Arc::new(CourseGenerator::new(db.clone(), Arc::clone(&generator))),
            interviews: InterviewService::new(db.clone(), Arc::clone(&generator)),
            tracker: GenerationTracker::new(poller),
            generator,
            db,
            config,
        }
    }

    /// 按配置打开数据库并连接 Gemini
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let db = DatabaseService::open(&config.db_path)?;
        let client = GeminiClient::new(&config.gemini)?;

        if config.gemini.api_key.is_empty() {
            log::warn!("GEMINI_API_KEY is not set; generation requests will fail");
        }

        Ok(Self::new(config, db, Arc::new(client), Arc::new(LogNotifier)))
    }
}
