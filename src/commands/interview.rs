//! 模拟面试命令

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::{
    CourseRecommendation, FacialExpressionData, InterviewAnalysis, InterviewQuestion, MockInterview,
};
use crate::services::DEFAULT_QUESTION_COUNT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockInterviewDto {
    pub id: String,
    pub job_role: String,
    pub tech_stack: String,
    pub experience: String,
    pub completed: bool,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<MockInterview> for MockInterviewDto {
    fn from(i: MockInterview) -> Self {
        Self {
            id: i.id,
            job_role: i.job_role,
            tech_stack: i.tech_stack,
            experience: i.experience,
            completed: i.completed,
            created_at: i.created_at.to_rfc3339(),
            completed_at: i.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestionDto {
    pub id: String,
    pub question: String,
    pub user_answer: Option<String>,
    pub order_number: u32,
}

impl From<InterviewQuestion> for InterviewQuestionDto {
    fn from(q: InterviewQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            user_answer: q.user_answer,
            order_number: q.order_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewAnalysisDto {
    pub id: String,
    pub interview_id: String,
    pub facial_expression_data: FacialExpressionData,
    pub pronunciation_feedback: String,
    pub technical_feedback: String,
    pub language_feedback: String,
    pub course_recommendations: Vec<CourseRecommendation>,
    pub created_at: String,
}

impl From<InterviewAnalysis> for InterviewAnalysisDto {
    fn from(a: InterviewAnalysis) -> Self {
        Self {
            id: a.id,
            interview_id: a.interview_id,
            facial_expression_data: a.facial_expression_data,
            pronunciation_feedback: a.pronunciation_feedback,
            technical_feedback: a.technical_feedback,
            language_feedback: a.language_feedback,
            course_recommendations: a.course_recommendations,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

/// 面试详情：题目与（可选）分析
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDetailDto {
    pub interview: MockInterviewDto,
    pub questions: Vec<InterviewQuestionDto>,
    pub analysis: Option<InterviewAnalysisDto>,
}

/// 开始面试，未指定题数时使用默认值
pub async fn start_interview(
    state: &AppState,
    job_role: String,
    tech_stack: String,
    experience: String,
    question_count: Option<u32>,
) -> Result<InterviewDetailDto, String> {
    let (interview, questions) = state
        .interviews
        .start(
            &state.config.user_id,
            &job_role,
            &tech_stack,
            &experience,
            question_count.unwrap_or(DEFAULT_QUESTION_COUNT),
        )
        .await
        .map_err(|e| e.to_string())?;

    Ok(InterviewDetailDto {
        interview: interview.into(),
        questions: questions.into_iter().map(Into::into).collect(),
        analysis: None,
    })
}

pub async fn answer_question(
    state: &AppState,
    question_id: String,
    answer: String,
) -> Result<InterviewQuestionDto, String> {
    state
        .interviews
        .record_answer(&question_id, &answer)
        .map(Into::into)
        .map_err(|e| e.to_string())
}

/// 分析面试；表情样本由调用方采集
pub async fn analyze_interview(
    state: &AppState,
    interview_id: String,
    facial_samples: Vec<FacialExpressionData>,
) -> Result<InterviewAnalysisDto, String> {
    state
        .interviews
        .analyze(&interview_id, &facial_samples)
        .await
        .map(Into::into)
        .map_err(|e| e.to_string())
}

pub async fn get_interview_detail(state: &AppState, interview_id: String) -> Result<InterviewDetailDto, String> {
    let db = &state.db;
    let interview = db.get_mock_interview(&interview_id).map_err(|e| e.to_string())?;
    let questions = db.get_interview_questions(&interview_id).map_err(|e| e.to_string())?;
    let analysis = db.get_interview_analysis(&interview_id).map_err(|e| e.to_string())?;

    Ok(InterviewDetailDto {
        interview: interview.into(),
        questions: questions.into_iter().map(Into::into).collect(),
        analysis: analysis.map(Into::into),
    })
}

pub async fn list_interviews(state: &AppState) -> Result<Vec<MockInterviewDto>, String> {
    let interviews = state
        .db
        .get_user_mock_interviews(&state.config.user_id)
        .map_err(|e| e.to_string())?;

    Ok(interviews.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::test_state;

    const QUESTIONS: &str = "1. What is a closure?\n2. What is Send?\n3. What is Sync?\n4. What is Pin?\n5. What is a future?\n6. Extra?\n";

    const FEEDBACK: &str = "Technical Feedback: Good.\nCommunication Feedback: Concise.\nAreas to Improve:\n- Pinning\nOverall Rating: 85\n";

    #[tokio::test]
    async fn test_interview_flow() {
        let state = test_state(vec![
            Ok(QUESTIONS.to_string()),
            Ok(FEEDBACK.to_string()),
            Ok("Clarity: 90".to_string()),
        ]);

        let started = start_interview(&state, "Rust Developer".to_string(), "tokio".to_string(), "2".to_string(), None)
            .await
            .unwrap();
        assert_eq!(started.questions.len(), DEFAULT_QUESTION_COUNT as usize);
        assert!(!started.interview.completed);

        let interview_id = started.interview.id.clone();
        let first = started.questions[0].id.clone();
        let answered = answer_question(&state, first, "A function capturing its environment.".to_string())
            .await
            .unwrap();
        assert_eq!(answered.order_number, 1);

        let analysis = analyze_interview(&state, interview_id.clone(), Vec::new()).await.unwrap();
        assert_eq!(analysis.course_recommendations.len(), 1);
        assert_eq!(analysis.facial_expression_data, FacialExpressionData::default());

        let detail = get_interview_detail(&state, interview_id).await.unwrap();
        assert!(detail.interview.completed);
        assert!(detail.interview.completed_at.is_some());
        assert_eq!(detail.analysis.unwrap().id, analysis.id);

        assert_eq!(list_interviews(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_strings() {
        let state = test_state(Vec::new());

        let err = get_interview_detail(&state, "missing".to_string()).await.unwrap_err();
        assert_eq!(err, "Mock interview not found with id: missing");

        let err = answer_question(&state, "missing".to_string(), "hi".to_string())
            .await
            .unwrap_err();
        assert_eq!(err, "Interview question not found with id: missing");
    }
}
