//! 领域数据结构
//! 课程、章节、闪卡、选择题、问答、模拟面试及其分析

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 课程用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoursePurpose {
    Exam,
    JobInterview,
    Practice,
    CodingPreparation,
    Other,
}

impl CoursePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoursePurpose::Exam => "exam",
            CoursePurpose::JobInterview => "job_interview",
            CoursePurpose::Practice => "practice",
            CoursePurpose::CodingPreparation => "coding_preparation",
            CoursePurpose::Other => "other",
        }
    }
}

impl FromStr for CoursePurpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "exam" => Ok(CoursePurpose::Exam),
            "job_interview" => Ok(CoursePurpose::JobInterview),
            "practice" => Ok(CoursePurpose::Practice),
            "coding_preparation" => Ok(CoursePurpose::CodingPreparation),
            "other" => Ok(CoursePurpose::Other),
            other => Err(Error::InvalidInput(format!("unknown course purpose: {}", other))),
        }
    }
}

impl fmt::Display for CoursePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 难度等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            other => Err(Error::InvalidInput(format!("unknown difficulty: {}", other))),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后台生成任务状态
///
/// 正常路径为 `generating -> generating_flashcards -> complete`，
/// 任一阶段失败进入 `error`。无法识别的状态保留原文，按中间态处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationStatus {
    Generating,
    GeneratingFlashcards,
    Complete,
    Error,
    Other(String),
}

impl GenerationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GenerationStatus::Generating => "generating",
            GenerationStatus::GeneratingFlashcards => "generating_flashcards",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Error => "error",
            GenerationStatus::Other(s) => s.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Complete | GenerationStatus::Error)
    }
}

impl From<&str> for GenerationStatus {
    fn from(s: &str) -> Self {
        match s {
            "generating" => GenerationStatus::Generating,
            "generating_flashcards" => GenerationStatus::GeneratingFlashcards,
            "complete" => GenerationStatus::Complete,
            "error" => GenerationStatus::Error,
            other => GenerationStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GenerationStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GenerationStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(GenerationStatus::from(s.as_str()))
    }
}

/// 持久化的生成任务记录（课程 content 字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl GenerationState {
    pub fn new(status: GenerationStatus) -> Self {
        Self {
            status,
            message: None,
            last_updated: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: GenerationStatus::Error,
            message: Some(message.into()),
            last_updated: Utc::now(),
        }
    }
}

/// 课程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub purpose: CoursePurpose,
    pub difficulty: Difficulty,
    pub summary: Option<String>,
    pub content: GenerationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 章节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub order_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub course_id: String,
    pub question: String,
    pub answer: String,
}

/// 单选题，options 在库中以 JSON 数组存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mcq {
    pub id: String,
    pub course_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qna {
    pub id: String,
    pub course_id: String,
    pub question: String,
    pub answer: String,
}

/// 模拟面试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockInterview {
    pub id: String,
    pub user_id: String,
    pub job_role: String,
    pub tech_stack: String,
    pub experience: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewQuestion {
    pub id: String,
    pub interview_id: String,
    pub question: String,
    pub user_answer: Option<String>,
    pub order_number: u32,
}

/// 面部表情评分，各项取值 [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FacialExpressionData {
    pub confident: f64,
    pub stressed: f64,
    pub hesitant: f64,
    pub nervous: f64,
}

impl FacialExpressionData {
    /// 按字段求平均；无样本时全部为 0
    pub fn aggregate(samples: &[FacialExpressionData]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let sum = samples.iter().fold(Self::default(), |acc, s| Self {
            confident: acc.confident + s.confident,
            stressed: acc.stressed + s.stressed,
            hesitant: acc.hesitant + s.hesitant,
            nervous: acc.nervous + s.nervous,
        });
        let count = samples.len() as f64;

        Self {
            confident: sum.confident / count,
            stressed: sum.stressed / count,
            hesitant: sum.hesitant / count,
            nervous: sum.nervous / count,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            confident: self.confident.clamp(0.0, 1.0),
            stressed: self.stressed.clamp(0.0, 1.0),
            hesitant: self.hesitant.clamp(0.0, 1.0),
            nervous: self.nervous.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecommendation {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// 面试分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewAnalysis {
    pub id: String,
    pub interview_id: String,
    pub facial_expression_data: FacialExpressionData,
    pub pronunciation_feedback: String,
    pub technical_feedback: String,
    pub language_feedback: String,
    pub course_recommendations: Vec<CourseRecommendation>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_status_terminal() {
        assert!(GenerationStatus::Complete.is_terminal());
        assert!(GenerationStatus::Error.is_terminal());
        assert!(!GenerationStatus::Generating.is_terminal());
        assert!(!GenerationStatus::GeneratingFlashcards.is_terminal());
        assert!(!GenerationStatus::from("queued").is_terminal());
    }

    #[test]
    fn test_generation_state_json_shape() {
        let state = GenerationState::failed("quota exceeded");
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "quota exceeded");
        assert!(json.get("lastUpdated").is_some());

        let back: GenerationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_purpose_parse() {
        assert_eq!("job-interview".parse::<CoursePurpose>().unwrap(), CoursePurpose::JobInterview);
        assert_eq!("Coding Preparation".parse::<CoursePurpose>().unwrap(), CoursePurpose::CodingPreparation);
        assert!("hobby".parse::<CoursePurpose>().is_err());
        assert!("novice".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_facial_aggregate() {
        let samples = [
            FacialExpressionData { confident: 0.4, stressed: 0.2, hesitant: 0.0, nervous: 0.1 },
            FacialExpressionData { confident: 0.8, stressed: 0.4, hesitant: 0.2, nervous: 0.3 },
        ];
        let avg = FacialExpressionData::aggregate(&samples);

        assert!((avg.confident - 0.6).abs() < 1e-9);
        assert!((avg.stressed - 0.3).abs() < 1e-9);
        assert!((avg.hesitant - 0.1).abs() < 1e-9);
        assert!((avg.nervous - 0.2).abs() < 1e-9);
        assert_eq!(FacialExpressionData::aggregate(&[]), FacialExpressionData::default());
    }
}
