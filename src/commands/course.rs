//! 课程命令：创建、生成、查询与状态追踪

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::{
    Chapter, Course, CoursePurpose, Difficulty, Flashcard, GenerationState, GenerationStatus, Mcq, Qna,
};
use crate::services::PollOutcome;

/// 课程传输对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDto {
    pub id: String,
    pub title: String,
    pub purpose: String,
    pub difficulty: String,
    pub summary: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Course> for CourseDto {
    fn from(c: Course) -> Self {
        Self {
            id: c.id,
            title: c.title,
            purpose: c.purpose.to_string(),
            difficulty: c.difficulty.to_string(),
            summary: c.summary,
            status: c.content.status.to_string(),
            message: c.content.message,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// 课程详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDetailDto {
    pub course: CourseDto,
    pub chapters: Vec<Chapter>,
    pub flashcards: Vec<Flashcard>,
    pub mcqs: Vec<Mcq>,
    pub qnas: Vec<Qna>,
}

/// 生成状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseStatusDto {
    pub course_id: String,
    pub title: String,
    pub status: String,
    pub message: Option<String>,
    pub last_updated: String,
    pub is_terminal: bool,
    pub is_tracked: bool,
}

/// 创建课程并在后台生成，同时开始追踪状态
pub async fn create_course(
    state: &AppState,
    topic: String,
    purpose: String,
    difficulty: String,
) -> Result<CourseDto, String> {
    let purpose: CoursePurpose = purpose.parse().map_err(|e: crate::error::Error| e.to_string())?;
    let difficulty: Difficulty = difficulty.parse().map_err(|e: crate::error::Error| e.to_string())?;

    let course = state
        .course_generator
        .start(&state.config.user_id, &topic, purpose, difficulty)
        .map_err(|e| e.to_string())?;

    state.tracker.start(&course.id).map_err(|e| e.to_string())?;

    Ok(course.into())
}

/// 重新生成已有课程（如上次失败）
pub async fn generate_course(state: &AppState, course_id: String) -> Result<CourseDto, String> {
    let course = state.db.get_course(&course_id).map_err(|e| e.to_string())?;

    if course.content.status == GenerationStatus::Complete {
        return Err(format!("Course {} is already complete", course_id));
    }
    if matches!(
        course.content.status,
        GenerationStatus::Generating | GenerationStatus::GeneratingFlashcards
    ) && state.tracker.is_tracking(&course_id)
    {
        return Err(format!("Course {} is already being generated", course_id));
    }

    let restarted = GenerationState::new(GenerationStatus::Generating);
    state
        .db
        .update_course_state(&course_id, &restarted)
        .map_err(|e| e.to_string())?;

    state
        .course_generator
        .spawn(course.id.clone(), course.title.clone(), course.purpose, course.difficulty)
        .map_err(|e| e.to_string())?;
    state.tracker.start(&course_id).map_err(|e| e.to_string())?;

    Ok(Course {
        content: restarted,
        ..course
    }
    .into())
}

/// 列出当前用户的课程
pub async fn list_courses(state: &AppState) -> Result<Vec<CourseDto>, String> {
    let courses = state
        .db
        .get_user_courses(&state.config.user_id)
        .map_err(|e| e.to_string())?;

    Ok(courses.into_iter().map(Into::into).collect())
}

/// 课程详情：章节、闪卡、选择题、问答
pub async fn get_course_detail(state: &AppState, course_id: String) -> Result<CourseDetailDto, String> {
    let db = &state.db;
    let course = db.get_course(&course_id).map_err(|e| e.to_string())?;

    Ok(CourseDetailDto {
        chapters: db.get_chapters_by_course(&course_id).map_err(|e| e.to_string())?,
        flashcards: db.get_flashcards_by_course(&course_id).map_err(|e| e.to_string())?,
        mcqs: db.get_mcqs_by_course(&course_id).map_err(|e| e.to_string())?,
        qnas: db.get_qnas_by_course(&course_id).map_err(|e| e.to_string())?,
        course: course.into(),
    })
}

pub async fn get_course_status(state: &AppState, course_id: String) -> Result<CourseStatusDto, String> {
    let course = state.db.get_course(&course_id).map_err(|e| e.to_string())?;

    Ok(CourseStatusDto {
        is_terminal: course.content.status.is_terminal(),
        is_tracked: state.tracker.is_tracking(&course_id),
        course_id: course.id,
        title: course.title,
        status: course.content.status.to_string(),
        message: course.content.message,
        last_updated: course.content.last_updated.to_rfc3339(),
    })
}

/// 不轮询，直接等待后台生成任务结束并返回最终状态
pub async fn finish_generation(state: &AppState, course_id: String) -> Result<CourseDto, String> {
    state
        .course_generator
        .join(&course_id)
        .await
        .map_err(|e| e.to_string())?;

    let course = state.db.get_course(&course_id).map_err(|e| e.to_string())?;
    Ok(course.into())
}

/// 等待课程生成结束
pub async fn watch_course(state: &AppState, course_id: String) -> Result<PollOutcome, String> {
    state.tracker.start(&course_id).map_err(|e| e.to_string())?;

    state
        .tracker
        .wait(&course_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Course {} is not being tracked", course_id))
}
