//! 模拟面试流程
//! 生成题目、记录回答、汇总技术/表达/表情分析并推荐课程

use futures::future::try_join_all;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{
    CourseRecommendation, FacialExpressionData, InterviewAnalysis, InterviewQuestion, MockInterview,
};
use crate::services::database::{DatabaseService, NewInterviewAnalysis};
use crate::services::gemini::{GenerationConfig, PromptTemplates, TextGenerator};
use crate::services::parser::{
    parse_interview_feedback, parse_interview_questions, parse_speech_scores, InterviewFeedback,
};

pub const DEFAULT_QUESTION_COUNT: u32 = 5;
const MAX_QUESTION_COUNT: u32 = 20;
const MAX_RECOMMENDATIONS: usize = 3;

pub struct InterviewService {
    db: DatabaseService,
    generator: Arc<dyn TextGenerator>,
}

impl InterviewService {
    pub fn new(db: DatabaseService, generator: Arc<dyn TextGenerator>) -> Self {
        Self { db, generator }
    }

    /// 生成题目并创建面试；生成或解析失败时不落库
    pub async fn start(
        &self,
        user_id: &str,
        job_role: &str,
        tech_stack: &str,
        experience: &str,
        count: u32,
    ) -> Result<(MockInterview, Vec<InterviewQuestion>)> {
        let job_role = job_role.trim();
        if job_role.is_empty() {
            return Err(Error::InvalidInput("Job role must not be empty".to_string()));
        }
        if count == 0 || count > MAX_QUESTION_COUNT {
            return Err(Error::InvalidInput(format!(
                "Question count must be between 1 and {}",
                MAX_QUESTION_COUNT
            )));
        }

        let prompt = PromptTemplates::interview_questions(job_role, tech_stack.trim(), experience.trim(), count);
        let text = self.generator.generate(&prompt, &GenerationConfig::questions()).await?;

        let mut questions = parse_interview_questions(&text);
        questions.truncate(count as usize);
        if questions.is_empty() {
            return Err(Error::InvalidInput(
                "No interview questions could be parsed from the response".to_string(),
            ));
        }

        let interview = self
            .db
            .create_mock_interview(user_id, job_role, tech_stack.trim(), experience.trim())?;
        let questions = self.db.create_interview_questions(&interview.id, &questions)?;

        log::info!(
            "Started mock interview {} with {} questions",
            interview.id,
            questions.len()
        );
        Ok((interview, questions))
    }

    pub fn record_answer(&self, question_id: &str, answer: &str) -> Result<InterviewQuestion> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::InvalidInput("Answer must not be empty".to_string()));
        }

        self.db.update_interview_question_answer(question_id, answer)?;
        self.db.get_interview_question(question_id)
    }

    /// 分析已回答的题目，保存结果并标记面试完成
    pub async fn analyze(
        &self,
        interview_id: &str,
        facial_samples: &[FacialExpressionData],
    ) -> Result<InterviewAnalysis> {
        let interview = self.db.get_mock_interview(interview_id)?;
        let answered: Vec<(InterviewQuestion, String)> = self
            .db
            .get_interview_questions(interview_id)?
            .into_iter()
            .filter_map(|q| {
                let answer = q.user_answer.clone().filter(|a| !a.trim().is_empty())?;
                Some((q, answer))
            })
            .collect();

        if answered.is_empty() {
            return Err(Error::InvalidInput(
                "Interview has no answered questions to analyze".to_string(),
            ));
        }

        // 各题分析相互独立，并发请求，结果保持题目顺序
        let job_role = interview.job_role.as_str();
        let feedback = try_join_all(answered.iter().map(|(question, answer)| async move {
            let prompt = PromptTemplates::analyze_interview(job_role, &question.question, answer);
            let text = self.generator.generate(&prompt, &GenerationConfig::analysis()).await?;
            Ok::<_, Error>((question.order_number, parse_interview_feedback(&text)))
        }))
        .await?;

        let transcript = answered
            .iter()
            .map(|(_, answer)| answer.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let speech = self
            .generator
            .generate(
                &PromptTemplates::analyze_speech(&interview.job_role, &transcript),
                &GenerationConfig::analysis(),
            )
            .await?;

        let draft = NewInterviewAnalysis {
            facial_expression_data: FacialExpressionData::aggregate(facial_samples).clamped(),
            pronunciation_feedback: pronunciation_summary(&speech),
            technical_feedback: join_feedback(&feedback, |f| &f.technical, true),
            language_feedback: join_feedback(&feedback, |f| &f.communication, false),
            course_recommendations: recommend_courses(feedback.iter().map(|(_, f)| f)),
        };

        let analysis = self.db.save_interview_analysis(interview_id, &draft)?;

        log::info!(
            "Analyzed mock interview {} ({} answered questions)",
            interview_id,
            answered.len()
        );
        Ok(analysis)
    }
}

fn pronunciation_summary(speech: &str) -> String {
    let speech = speech.trim();
    match parse_speech_scores(speech).average() {
        Some(avg) => format!("Overall speaking score: {}/100\n\n{}", avg, speech),
        None => speech.to_string(),
    }
}

fn join_feedback<F>(feedback: &[(u32, InterviewFeedback)], pick: F, with_rating: bool) -> String
where
    F: Fn(&InterviewFeedback) -> &String,
{
    feedback
        .iter()
        .map(|(order, f)| {
            let body = pick(f);
            let body = if body.is_empty() { "No feedback provided." } else { body.as_str() };
            match f.rating.filter(|_| with_rating) {
                Some(rating) => format!("Question {}: {}\nRating: {}/100", order, body, rating),
                None => format!("Question {}: {}", order, body),
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// 取前 3 个不重复的待改进点作为推荐课程
fn recommend_courses<'a, I>(feedback: I) -> Vec<CourseRecommendation>
where
    I: Iterator<Item = &'a InterviewFeedback>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut recommendations = Vec::new();

    for area in feedback.flat_map(|f| f.improvements.iter()) {
        let key = area.trim().to_lowercase();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        recommendations.push(CourseRecommendation {
            title: area.trim().to_string(),
            description: format!("Focused practice on {}", area.trim()),
            link: None,
        });
        if recommendations.len() == MAX_RECOMMENDATIONS {
            break;
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gemini::testing::ScriptedGenerator;
    use pretty_assertions::assert_eq;

    const QUESTIONS: &str = "Here you go:\n1. What is ownership?\n2. Explain lifetimes.\n3. How does async work?\n";

    const FEEDBACK: &str = "Technical Feedback: Solid grasp of borrowing.\nCommunication Feedback: Clear but brief.\nStrengths:\n- Accurate terms\nAreas to Improve:\n- Lifetimes\n- Error handling\n- lifetimes\n- Testing\n- Async\nOverall Rating: 72/100\n";

    const SPEECH: &str = "Clarity: 80\nConfidence: 70\nFluency: 90\nGrammar and vocabulary: 60\nTechnical accuracy: 100\n";

    fn service(replies: Vec<Result<String>>) -> (DatabaseService, Arc<ScriptedGenerator>, InterviewService) {
        let db = DatabaseService::open_in_memory().unwrap();
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let service = InterviewService::new(db.clone(), generator.clone());
        (db, generator, service)
    }

    #[tokio::test]
    async fn test_start_persists_ordered_questions() {
        let (db, generator, service) = service(vec![Ok(QUESTIONS.to_string())]);

        let (interview, questions) = service.start("u1", "Backend Engineer", "Rust", "3", 2).await.unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question, "What is ownership?");
        assert_eq!(questions[1].order_number, 2);
        assert_eq!(db.get_interview_questions(&interview.id).unwrap(), questions);
        assert!(generator.prompts.lock().unwrap()[0]
            .starts_with("Generate 2 interview questions for a 3 years experienced Backend Engineer"));
    }

    #[tokio::test]
    async fn test_start_without_questions_creates_nothing() {
        let (db, _generator, service) = service(vec![Ok("I am not sure.".to_string())]);

        assert!(service.start("u1", "SRE", "Go", "5", 5).await.is_err());
        assert!(db.get_user_mock_interviews("u1").unwrap().is_empty());
        assert!(service.start("u1", "  ", "Go", "5", 5).await.is_err());
        assert!(service.start("u1", "SRE", "Go", "5", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_record_answer_validation() {
        let (_db, _generator, service) = service(vec![Ok(QUESTIONS.to_string())]);
        let (_, questions) = service.start("u1", "SRE", "Go", "5", 3).await.unwrap();

        assert!(matches!(service.record_answer(&questions[0].id, "   "), Err(Error::InvalidInput(_))));
        assert!(matches!(service.record_answer("missing", "hi"), Err(Error::NotFound { .. })));

        let answered = service.record_answer(&questions[0].id, "  Each value has one owner. ").unwrap();
        assert_eq!(answered.user_answer.as_deref(), Some("Each value has one owner."));
    }

    #[tokio::test]
    async fn test_analyze_answered_questions() {
        let (db, generator, service) = service(vec![
            Ok(QUESTIONS.to_string()),
            Ok(FEEDBACK.to_string()),
            Ok(SPEECH.to_string()),
        ]);
        let (interview, questions) = service.start("u1", "Backend Engineer", "Rust", "3", 3).await.unwrap();
        service.record_answer(&questions[0].id, "Each value has one owner.").unwrap();

        let samples = [
            FacialExpressionData { confident: 0.8, stressed: 0.2, hesitant: 0.1, nervous: 0.0 },
            FacialExpressionData { confident: 0.6, stressed: 0.4, hesitant: 0.3, nervous: 0.2 },
        ];
        let analysis = service.analyze(&interview.id, &samples).await.unwrap();

        // 一次出题 + 一道已答题分析 + 一次语音分析
        assert_eq!(generator.prompt_count(), 3);
        assert!((analysis.facial_expression_data.confident - 0.7).abs() < 1e-9);
        assert_eq!(
            analysis.technical_feedback,
            "Question 1: Solid grasp of borrowing.\nRating: 72/100"
        );
        assert_eq!(analysis.language_feedback, "Question 1: Clear but brief.");
        assert!(analysis.pronunciation_feedback.starts_with("Overall speaking score: 80/100"));

        let titles: Vec<&str> = analysis.course_recommendations.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Lifetimes", "Error handling", "Testing"]);
        assert_eq!(analysis.course_recommendations[0].description, "Focused practice on Lifetimes");

        assert!(db.get_mock_interview(&interview.id).unwrap().completed);
        assert_eq!(db.get_interview_analysis(&interview.id).unwrap(), Some(analysis));
    }

    #[tokio::test]
    async fn test_analyze_requires_answers() {
        let (db, _generator, service) = service(vec![Ok(QUESTIONS.to_string())]);
        let (interview, _) = service.start("u1", "SRE", "Go", "5", 3).await.unwrap();

        let err = service.analyze(&interview.id, &[]).await.unwrap_err();
        assert!(err.to_string().contains("no answered questions"));
        assert!(!db.get_mock_interview(&interview.id).unwrap().completed);
    }
}
