//! 课程生成任务
//! 后台驱动 generating -> generating_flashcards -> complete 状态机，失败写入 error

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::models::{Course, CoursePurpose, Difficulty, GenerationState, GenerationStatus};
use crate::services::database::DatabaseService;
use crate::services::gemini::{GenerationConfig, PromptTemplates, TextGenerator};
use crate::services::parser::{parse_course_content, parse_flashcards};

/// 课程生成器
pub struct CourseGenerator {
    db: DatabaseService,
    generator: Arc<dyn TextGenerator>,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl CourseGenerator {
    pub fn new(db: DatabaseService, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            db,
            generator,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// 创建课程记录并在后台启动生成
    pub fn start(
        self: &Arc<Self>,
        user_id: &str,
        topic: &str,
        purpose: CoursePurpose,
        difficulty: Difficulty,
    ) -> Result<Course> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::InvalidInput("Course topic must not be empty".to_string()));
        }

        let course = self.db.create_course(user_id, topic, purpose, difficulty)?;
        self.spawn(course.id.clone(), topic.to_string(), purpose, difficulty)?;
        Ok(course)
    }

    /// 后台执行，句柄登记后可用 [`join`](Self::join) 等待
    pub fn spawn(
        self: &Arc<Self>,
        course_id: String,
        topic: String,
        purpose: CoursePurpose,
        difficulty: Difficulty,
    ) -> Result<()> {
        let this = Arc::clone(self);
        let id = course_id.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = this.run(&id, &topic, purpose, difficulty).await {
                log::error!("Failed to record generation outcome for course {}: {}", id, e);
            }
        });

        let mut jobs = self.jobs.lock().map_err(|_| Error::LockPoisoned)?;
        jobs.retain(|_, h| !h.is_finished());
        jobs.insert(course_id, handle);
        Ok(())
    }

    /// 等待后台任务结束；没有登记的任务时返回 false
    pub async fn join(&self, course_id: &str) -> Result<bool> {
        let handle = self.jobs.lock().map_err(|_| Error::LockPoisoned)?.remove(course_id);

        match handle {
            Some(handle) => {
                handle.await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 执行完整生成流程；生成失败写入 error 状态后返回 Ok
    pub async fn run(
        &self,
        course_id: &str,
        topic: &str,
        purpose: CoursePurpose,
        difficulty: Difficulty,
    ) -> Result<()> {
        match self.generate(course_id, topic, purpose, difficulty).await {
            Ok(()) => {
                log::info!("Course {} generated", course_id);
                Ok(())
            }
            Err(e) => {
                log::error!("Course generation failed for {}: {}", course_id, e);
                self.db.update_course_state(course_id, &GenerationState::failed(e.to_string()))
            }
        }
    }

    async fn generate(
        &self,
        course_id: &str,
        topic: &str,
        purpose: CoursePurpose,
        difficulty: Difficulty,
    ) -> Result<()> {
        let purpose_label = purpose.as_str().replace('_', " ");

        // 重试时从已落库的阶段继续
        if self.db.has_flashcards(course_id)? {
            log::info!("Course {} already has content and flashcards, marking complete", course_id);
            return self.set_status(course_id, GenerationStatus::Complete);
        }

        let inline_flashcards = if self.db.has_course_content(course_id)? {
            log::info!("Course {} content already stored, resuming at flashcards", course_id);
            Vec::new()
        } else {
            self.set_status(course_id, GenerationStatus::Generating)?;
            let prompt = PromptTemplates::course(topic, &purpose_label, difficulty.as_str());
            let text = self.generator.generate(&prompt, &GenerationConfig::course()).await?;

            let parsed = parse_course_content(&text);
            if parsed.is_empty() {
                return Err(Error::InvalidInput(
                    "Generated course content contained no recognizable sections".to_string(),
                ));
            }
            log::debug!(
                "Parsed course {}: {} chapters, {} flashcards, {} mcqs, {} q&a pairs",
                course_id,
                parsed.chapters.len(),
                parsed.flashcards.len(),
                parsed.mcqs.len(),
                parsed.qnas.len()
            );

            self.db.store_course_content(course_id, &parsed)?;
            parsed.flashcards
        };

        self.set_status(course_id, GenerationStatus::GeneratingFlashcards)?;
        let flashcards = if inline_flashcards.is_empty() {
            let prompt = PromptTemplates::flashcards(topic, &purpose_label, difficulty.as_str());
            let text = self.generator.generate(&prompt, &GenerationConfig::course()).await?;
            parse_flashcards(&text)
        } else {
            inline_flashcards
        };
        if flashcards.is_empty() {
            log::warn!("No flashcards could be parsed for course {}", course_id);
        }
        self.db.create_flashcards(course_id, &flashcards)?;

        self.set_status(course_id, GenerationStatus::Complete)
    }

    fn set_status(&self, course_id: &str, status: GenerationStatus) -> Result<()> {
        log::debug!("Course {} -> {}", course_id, status);
        self.db.update_course_state(course_id, &GenerationState::new(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gemini::testing::ScriptedGenerator;

    const COURSE_WITH_CARDS: &str = "# SUMMARY\nOwnership basics.\n\n# CHAPTERS\n## Moves\nValues move.\n## Borrows\nReferences borrow.\n\n# FLASHCARDS\n- Question: What moves?\n- Answer: Values.\n\n# MCQs (Multiple Choice Questions)\n- Question: Which is a borrow?\n- Options: a) &x b) x c) *x d) x.clone()\n- Correct Answer: a\n\n# Q&A PAIRS\n- Question: Why borrow?\n- Answer: To avoid moves.\n";

    fn setup(replies: Vec<Result<String>>) -> (DatabaseService, Arc<ScriptedGenerator>, CourseGenerator, Course) {
        let db = DatabaseService::open_in_memory().unwrap();
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let course_gen = CourseGenerator::new(db.clone(), generator.clone());
        let course = db
            .create_course("u1", "Rust Ownership", CoursePurpose::JobInterview, Difficulty::Intermediate)
            .unwrap();
        (db, generator, course_gen, course)
    }

    #[tokio::test]
    async fn test_run_persists_everything() {
        let (db, generator, course_gen, course) = setup(vec![Ok(COURSE_WITH_CARDS.to_string())]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        let stored = db.get_course(&course.id).unwrap();
        assert_eq!(stored.content.status, GenerationStatus::Complete);
        assert_eq!(stored.summary.as_deref(), Some("Ownership basics."));
        assert_eq!(db.get_chapters_by_course(&course.id).unwrap().len(), 2);
        assert_eq!(db.get_flashcards_by_course(&course.id).unwrap().len(), 1);
        assert_eq!(db.get_mcqs_by_course(&course.id).unwrap()[0].correct_answer, "&x");
        assert_eq!(db.get_qnas_by_course(&course.id).unwrap().len(), 1);

        // 课程文本已含闪卡，不再单独请求
        assert_eq!(generator.prompt_count(), 1);
        assert!(generator.prompts.lock().unwrap()[0].contains("for job interview at intermediate level"));
    }

    #[tokio::test]
    async fn test_run_requests_flashcards_when_missing() {
        let without_cards = COURSE_WITH_CARDS.replace("# FLASHCARDS", "# NOTES");
        let (db, generator, course_gen, course) = setup(vec![
            Ok(without_cards),
            Ok("# FLASHCARDS\n- Question: A?\n- Answer: B\n- Question: C?\n- Answer: D\n".to_string()),
        ]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        assert_eq!(generator.prompt_count(), 2);
        assert!(generator.prompts.lock().unwrap()[1].starts_with("Generate 20 detailed flashcards"));
        assert_eq!(db.get_flashcards_by_course(&course.id).unwrap().len(), 2);
        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Complete);
    }

    #[tokio::test]
    async fn test_generator_failure_is_recorded() {
        let (db, _generator, course_gen, course) = setup(vec![Err(Error::Gateway {
            status: 503,
            message: "Service Unavailable".to_string(),
        })]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        let state = db.get_course(&course.id).unwrap().content;
        assert_eq!(state.status, GenerationStatus::Error);
        assert_eq!(state.message.as_deref(), Some("Gemini API error: 503 Service Unavailable"));
    }

    #[tokio::test]
    async fn test_flashcard_failure_keeps_course_content() {
        let without_cards = COURSE_WITH_CARDS.replace("# FLASHCARDS", "# NOTES");
        let (db, _generator, course_gen, course) = setup(vec![Ok(without_cards), Err(Error::EmptyResponse)]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Error);
        assert_eq!(db.get_chapters_by_course(&course.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_an_error() {
        let (db, _generator, course_gen, course) = setup(vec![Ok("Sorry, I cannot help with that.".to_string())]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        let state = db.get_course(&course.id).unwrap().content;
        assert_eq!(state.status, GenerationStatus::Error);
        assert!(state.message.unwrap().contains("no recognizable sections"));
    }

    #[tokio::test]
    async fn test_start_spawns_job() {
        let db = DatabaseService::open_in_memory().unwrap();
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(COURSE_WITH_CARDS.to_string())]));
        let course_gen = Arc::new(CourseGenerator::new(db.clone(), generator));

        assert!(course_gen.start("u1", "   ", CoursePurpose::Exam, Difficulty::Beginner).is_err());

        let course = course_gen
            .start("u1", "Rust", CoursePurpose::Exam, Difficulty::Beginner)
            .unwrap();
        assert_eq!(course.content.status, GenerationStatus::Generating);

        assert!(course_gen.join(&course.id).await.unwrap());
        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Complete);
        assert!(!course_gen.join(&course.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rerun_after_flashcard_failure_resumes() {
        let without_cards = COURSE_WITH_CARDS.replace("# FLASHCARDS", "# NOTES");
        let (db, generator, course_gen, course) = setup(vec![
            Ok(without_cards),
            Err(Error::EmptyResponse),
            Ok("# FLASHCARDS\n- Question: A?\n- Answer: B\n".to_string()),
        ]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();
        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Error);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Complete);
        assert_eq!(db.get_chapters_by_course(&course.id).unwrap().len(), 2);
        assert_eq!(db.get_mcqs_by_course(&course.id).unwrap().len(), 1);
        assert_eq!(db.get_qnas_by_course(&course.id).unwrap().len(), 1);
        assert_eq!(db.get_flashcards_by_course(&course.id).unwrap().len(), 1);

        // 第二次运行只请求闪卡
        assert_eq!(generator.prompt_count(), 3);
        assert!(generator.prompts.lock().unwrap()[2].starts_with("Generate 20 detailed flashcards"));
    }

    #[tokio::test]
    async fn test_rerun_with_everything_stored_only_completes() {
        let (db, generator, course_gen, course) = setup(vec![Ok(COURSE_WITH_CARDS.to_string())]);

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();
        db.update_course_state(&course.id, &GenerationState::failed("interrupted")).unwrap();

        course_gen
            .run(&course.id, &course.title, course.purpose, course.difficulty)
            .await
            .unwrap();

        assert_eq!(generator.prompt_count(), 1);
        assert_eq!(db.get_course(&course.id).unwrap().content.status, GenerationStatus::Complete);
        assert_eq!(db.get_flashcards_by_course(&course.id).unwrap().len(), 1);
        assert_eq!(db.get_chapters_by_course(&course.id).unwrap().len(), 2);
    }
}
