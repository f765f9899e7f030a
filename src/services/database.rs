// 数据库服务模块
// 提供 SQLite 数据库操作，支持课程内容与模拟面试记录的持久化

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    Chapter, Course, CoursePurpose, CourseRecommendation, Difficulty, FacialExpressionData, Flashcard,
    GenerationState, GenerationStatus, InterviewAnalysis, InterviewQuestion, Mcq, MockInterview, Qna,
};
use crate::services::parser::{ParsedChapter, ParsedCourse, ParsedMcq, QuestionAnswer};

/// 待写入的面试分析
#[derive(Debug, Clone, Default)]
pub struct NewInterviewAnalysis {
    pub facial_expression_data: FacialExpressionData,
    pub pronunciation_feedback: String,
    pub technical_feedback: String,
    pub language_feedback: String,
    pub course_recommendations: Vec<CourseRecommendation>,
}

/// 数据库服务
#[derive(Clone)]
pub struct DatabaseService {
    pool: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// 打开（或创建）指定路径的数据库
    pub fn open(db_path: &Path) -> Result<Self> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let service = Self {
            pool: Arc::new(Mutex::new(Connection::open(db_path)?)),
            db_path: Some(db_path.to_path_buf()),
        };

        service.initialize()?;
        log::debug!("Database opened at {}", db_path.display());
        Ok(service)
    }

    /// 内存数据库，测试使用
    pub fn open_in_memory() -> Result<Self> {
        let service = Self {
            pool: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            db_path: None,
        };

        service.initialize()?;
        Ok(service)
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.pool.lock().map_err(|_| Error::LockPoisoned)
    }

    /// 初始化数据库表结构
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // 课程表，content 列保存生成任务状态 JSON
        conn.execute(
            "CREATE TABLE IF NOT EXISTS courses (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                purpose TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                summary TEXT,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chapters (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                order_number INTEGER NOT NULL,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            )",
            [],
        )?;

        // options 为 JSON 数组
        conn.execute(
            "CREATE TABLE IF NOT EXISTS mcqs (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                question TEXT NOT NULL,
                options TEXT NOT NULL,
                correct_answer TEXT NOT NULL,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS qna (
                id TEXT PRIMARY KEY,
                course_id TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS mock_interviews (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                job_role TEXT NOT NULL,
                tech_stack TEXT NOT NULL,
                experience TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS interview_questions (
                id TEXT PRIMARY KEY,
                interview_id TEXT NOT NULL,
                question TEXT NOT NULL,
                user_answer TEXT,
                order_number INTEGER NOT NULL,
                FOREIGN KEY (interview_id) REFERENCES mock_interviews(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS interview_analysis (
                id TEXT PRIMARY KEY,
                interview_id TEXT NOT NULL,
                facial_expression_data TEXT NOT NULL,
                pronunciation_feedback TEXT NOT NULL,
                technical_feedback TEXT NOT NULL,
                language_feedback TEXT NOT NULL,
                course_recommendations TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (interview_id) REFERENCES mock_interviews(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute("CREATE INDEX IF NOT EXISTS idx_courses_user_id ON courses(user_id)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_chapters_course_id ON chapters(course_id)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_flashcards_course_id ON flashcards(course_id)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_mcqs_course_id ON mcqs(course_id)", [])?;
        conn.execute("CREATE INDEX IF NOT EXISTS idx_qna_course_id ON qna(course_id)", [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_mock_interviews_user_id ON mock_interviews(user_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_interview_questions_interview_id ON interview_questions(interview_id)",
            [],
        )?;

        Ok(())
    }

    // ==================== 课程管理 ====================

    /// 创建课程，初始状态为 generating
    pub fn create_course(
        &self,
        user_id: &str,
        title: &str,
        purpose: CoursePurpose,
        difficulty: Difficulty,
    ) -> Result<Course> {
        let conn = self.conn()?;
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            purpose,
            difficulty,
            summary: None,
            content: GenerationState::new(GenerationStatus::Generating),
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO courses (id, user_id, title, purpose, difficulty, summary, content, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?)",
            params![
                course.id,
                course.user_id,
                course.title,
                course.purpose.as_str(),
                course.difficulty.as_str(),
                serde_json::to_string(&course.content)?,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(course)
    }

    /// 列出用户的课程，最新在前
    pub fn get_user_courses(&self, user_id: &str) -> Result<Vec<Course>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, purpose, difficulty, summary, content, created_at, updated_at
             FROM courses WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| Self::row_to_course(row))?;

        let mut courses = Vec::new();
        for row in rows {
            courses.push(row?);
        }

        Ok(courses)
    }

    /// 按 id 查询课程，不存在时返回 None
    pub fn find_course(&self, id: &str) -> Result<Option<Course>> {
        let conn = self.conn()?;

        let course = conn
            .query_row(
                "SELECT id, user_id, title, purpose, difficulty, summary, content, created_at, updated_at
                 FROM courses WHERE id = ?",
                params![id],
                |row| Self::row_to_course(row),
            )
            .optional()?;

        Ok(course)
    }

    pub fn get_course(&self, id: &str) -> Result<Course> {
        self.find_course(id)?.ok_or_else(|| Error::not_found("Course", id))
    }

    /// 更新生成任务状态
    pub fn update_course_state(&self, id: &str, state: &GenerationState) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE courses SET content = ?, updated_at = ? WHERE id = ?",
            params![serde_json::to_string(state)?, Utc::now().to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(Error::not_found("Course", id));
        }
        Ok(())
    }

    pub fn update_course_summary(&self, id: &str, summary: &str) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE courses SET summary = ?, updated_at = ? WHERE id = ?",
            params![summary, Utc::now().to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(Error::not_found("Course", id));
        }
        Ok(())
    }

    /// 一次写入摘要、章节、选择题与问答对
    pub fn store_course_content(&self, course_id: &str, course: &ParsedCourse) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if !course.summary.is_empty() {
            let updated = tx.execute(
                "UPDATE courses SET summary = ?, updated_at = ? WHERE id = ?",
                params![course.summary, Utc::now().to_rfc3339(), course_id],
            )?;
            if updated == 0 {
                return Err(Error::not_found("Course", course_id));
            }
        }
        insert_chapters(&tx, course_id, &course.chapters)?;
        insert_mcqs(&tx, course_id, &course.mcqs)?;
        insert_qnas(&tx, course_id, &course.qnas)?;

        tx.commit()?;
        Ok(())
    }

    /// 课程正文（摘要、章节、选择题、问答）是否已写入
    pub fn has_course_content(&self, course_id: &str) -> Result<bool> {
        let conn = self.conn()?;

        let stored = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1 AND summary IS NOT NULL)
                 OR EXISTS(SELECT 1 FROM chapters WHERE course_id = ?1)
                 OR EXISTS(SELECT 1 FROM mcqs WHERE course_id = ?1)
                 OR EXISTS(SELECT 1 FROM qna WHERE course_id = ?1)",
            params![course_id],
            |row| row.get(0),
        )?;

        Ok(stored)
    }

    pub fn has_flashcards(&self, course_id: &str) -> Result<bool> {
        let conn = self.conn()?;

        let stored = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM flashcards WHERE course_id = ?)",
            params![course_id],
            |row| row.get(0),
        )?;

        Ok(stored)
    }

    // ==================== 章节 ====================

    /// 批量写入章节
    pub fn create_chapters(&self, course_id: &str, chapters: &[ParsedChapter]) -> Result<Vec<Chapter>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created = insert_chapters(&tx, course_id, chapters)?;
        tx.commit()?;
        Ok(created)
    }

    pub fn get_chapters_by_course(&self, course_id: &str) -> Result<Vec<Chapter>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, course_id, title, content, order_number
             FROM chapters WHERE course_id = ? ORDER BY order_number",
        )?;

        let rows = stmt.query_map(params![course_id], |row| {
            Ok(Chapter {
                id: row.get(0)?,
                course_id: row.get(1)?,
                title: row.get(2)?,
                content: row.get(3)?,
                order_number: row.get(4)?,
            })
        })?;

        let mut chapters = Vec::new();
        for row in rows {
            chapters.push(row?);
        }

        Ok(chapters)
    }

    // ==================== 闪卡 / 选择题 / 问答 ====================

    pub fn create_flashcards(&self, course_id: &str, cards: &[QuestionAnswer]) -> Result<Vec<Flashcard>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created = insert_flashcards(&tx, course_id, cards)?;
        tx.commit()?;
        Ok(created)
    }

    pub fn get_flashcards_by_course(&self, course_id: &str) -> Result<Vec<Flashcard>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, course_id, question, answer FROM flashcards WHERE course_id = ? ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![course_id], |row| {
            Ok(Flashcard {
                id: row.get(0)?,
                course_id: row.get(1)?,
                question: row.get(2)?,
                answer: row.get(3)?,
            })
        })?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(row?);
        }

        Ok(cards)
    }

    pub fn create_mcqs(&self, course_id: &str, mcqs: &[ParsedMcq]) -> Result<Vec<Mcq>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created = insert_mcqs(&tx, course_id, mcqs)?;
        tx.commit()?;
        Ok(created)
    }

    pub fn get_mcqs_by_course(&self, course_id: &str) -> Result<Vec<Mcq>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, course_id, question, options, correct_answer
             FROM mcqs WHERE course_id = ? ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![course_id], |row| {
            Ok(Mcq {
                id: row.get(0)?,
                course_id: row.get(1)?,
                question: row.get(2)?,
                options: parse_json(3, &row.get::<_, String>(3)?)?,
                correct_answer: row.get(4)?,
            })
        })?;

        let mut mcqs = Vec::new();
        for row in rows {
            mcqs.push(row?);
        }

        Ok(mcqs)
    }

    pub fn create_qnas(&self, course_id: &str, pairs: &[QuestionAnswer]) -> Result<Vec<Qna>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let created = insert_qnas(&tx, course_id, pairs)?;
        tx.commit()?;
        Ok(created)
    }

    pub fn get_qnas_by_course(&self, course_id: &str) -> Result<Vec<Qna>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, course_id, question, answer FROM qna WHERE course_id = ? ORDER BY rowid")?;

        let rows = stmt.query_map(params![course_id], |row| {
            Ok(Qna {
                id: row.get(0)?,
                course_id: row.get(1)?,
                question: row.get(2)?,
                answer: row.get(3)?,
            })
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }

        Ok(pairs)
    }

    // ==================== 模拟面试 ====================

    pub fn create_mock_interview(
        &self,
        user_id: &str,
        job_role: &str,
        tech_stack: &str,
        experience: &str,
    ) -> Result<MockInterview> {
        let conn = self.conn()?;
        let interview = MockInterview {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            job_role: job_role.to_string(),
            tech_stack: tech_stack.to_string(),
            experience: experience.to_string(),
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        };

        conn.execute(
            "INSERT INTO mock_interviews (id, user_id, job_role, tech_stack, experience, completed, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
            params![
                interview.id,
                interview.user_id,
                interview.job_role,
                interview.tech_stack,
                interview.experience,
                interview.created_at.to_rfc3339(),
            ],
        )?;

        Ok(interview)
    }

    pub fn get_user_mock_interviews(&self, user_id: &str) -> Result<Vec<MockInterview>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, job_role, tech_stack, experience, completed, created_at, completed_at
             FROM mock_interviews WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| Self::row_to_mock_interview(row))?;

        let mut interviews = Vec::new();
        for row in rows {
            interviews.push(row?);
        }

        Ok(interviews)
    }

    pub fn get_mock_interview(&self, id: &str) -> Result<MockInterview> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, user_id, job_role, tech_stack, experience, completed, created_at, completed_at
             FROM mock_interviews WHERE id = ?",
            params![id],
            |row| Self::row_to_mock_interview(row),
        )
        .optional()?
        .ok_or_else(|| Error::not_found("Mock interview", id))
    }

    // ==================== 面试题目 ====================

    /// 按给定顺序写入题目，order_number 从 1 开始
    pub fn create_interview_questions(
        &self,
        interview_id: &str,
        questions: &[String],
    ) -> Result<Vec<InterviewQuestion>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = Vec::with_capacity(questions.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO interview_questions (id, interview_id, question, user_answer, order_number)
                 VALUES (?, ?, ?, NULL, ?)",
            )?;

            for (index, question) in questions.iter().enumerate() {
                let record = InterviewQuestion {
                    id: Uuid::new_v4().to_string(),
                    interview_id: interview_id.to_string(),
                    question: question.clone(),
                    user_answer: None,
                    order_number: index as u32 + 1,
                };
                stmt.execute(params![record.id, record.interview_id, record.question, record.order_number])?;
                created.push(record);
            }
        }

        tx.commit()?;
        Ok(created)
    }

    pub fn get_interview_questions(&self, interview_id: &str) -> Result<Vec<InterviewQuestion>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, interview_id, question, user_answer, order_number
             FROM interview_questions WHERE interview_id = ? ORDER BY order_number",
        )?;

        let rows = stmt.query_map(params![interview_id], |row| Self::row_to_interview_question(row))?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }

        Ok(questions)
    }

    pub fn get_interview_question(&self, id: &str) -> Result<InterviewQuestion> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, interview_id, question, user_answer, order_number
             FROM interview_questions WHERE id = ?",
            params![id],
            |row| Self::row_to_interview_question(row),
        )
        .optional()?
        .ok_or_else(|| Error::not_found("Interview question", id))
    }

    pub fn update_interview_question_answer(&self, id: &str, answer: &str) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE interview_questions SET user_answer = ? WHERE id = ?",
            params![answer, id],
        )?;

        if updated == 0 {
            return Err(Error::not_found("Interview question", id));
        }
        Ok(())
    }

    // ==================== 面试分析 ====================

    /// 写入分析并标记面试完成，二者同一事务
    pub fn save_interview_analysis(
        &self,
        interview_id: &str,
        analysis: &NewInterviewAnalysis,
    ) -> Result<InterviewAnalysis> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let record = insert_interview_analysis(&tx, interview_id, analysis)?;
        let updated = tx.execute(
            "UPDATE mock_interviews SET completed = 1, completed_at = ? WHERE id = ?",
            params![record.created_at.to_rfc3339(), interview_id],
        )?;
        if updated == 0 {
            return Err(Error::not_found("Mock interview", interview_id));
        }

        tx.commit()?;
        Ok(record)
    }

    /// 最近一次分析
    pub fn get_interview_analysis(&self, interview_id: &str) -> Result<Option<InterviewAnalysis>> {
        let conn = self.conn()?;

        let analysis = conn
            .query_row(
                "SELECT id, interview_id, facial_expression_data, pronunciation_feedback, technical_feedback,
                        language_feedback, course_recommendations, created_at
                 FROM interview_analysis WHERE interview_id = ?
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![interview_id],
                |row| {
                    Ok(InterviewAnalysis {
                        id: row.get(0)?,
                        interview_id: row.get(1)?,
                        facial_expression_data: parse_json(2, &row.get::<_, String>(2)?)?,
                        pronunciation_feedback: row.get(3)?,
                        technical_feedback: row.get(4)?,
                        language_feedback: row.get(5)?,
                        course_recommendations: parse_json(6, &row.get::<_, String>(6)?)?,
                        created_at: parse_time(7, &row.get::<_, String>(7)?)?,
                    })
                },
            )
            .optional()?;

        Ok(analysis)
    }

    // ==================== 辅助函数 ====================

    fn row_to_course(row: &Row) -> rusqlite::Result<Course> {
        Ok(Course {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            purpose: parse_text(3, &row.get::<_, String>(3)?)?,
            difficulty: parse_text(4, &row.get::<_, String>(4)?)?,
            summary: row.get(5)?,
            content: parse_json(6, &row.get::<_, String>(6)?)?,
            created_at: parse_time(7, &row.get::<_, String>(7)?)?,
            updated_at: parse_time(8, &row.get::<_, String>(8)?)?,
        })
    }

    fn row_to_mock_interview(row: &Row) -> rusqlite::Result<MockInterview> {
        Ok(MockInterview {
            id: row.get(0)?,
            user_id: row.get(1)?,
            job_role: row.get(2)?,
            tech_stack: row.get(3)?,
            experience: row.get(4)?,
            completed: row.get(5)?,
            created_at: parse_time(6, &row.get::<_, String>(6)?)?,
            completed_at: row
                .get::<_, Option<String>>(7)?
                .map(|s| parse_time(7, &s))
                .transpose()?,
        })
    }

    fn row_to_interview_question(row: &Row) -> rusqlite::Result<InterviewQuestion> {
        Ok(InterviewQuestion {
            id: row.get(0)?,
            interview_id: row.get(1)?,
            question: row.get(2)?,
            user_answer: row.get(3)?,
            order_number: row.get(4)?,
        })
    }
}

// ==================== 事务内写入 ====================

fn insert_chapters(conn: &Connection, course_id: &str, chapters: &[ParsedChapter]) -> Result<Vec<Chapter>> {
    let mut created = Vec::with_capacity(chapters.len());

    let mut stmt = conn.prepare(
        "INSERT INTO chapters (id, course_id, title, content, order_number) VALUES (?, ?, ?, ?, ?)",
    )?;

    for chapter in chapters {
        let record = Chapter {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            title: chapter.title.clone(),
            content: chapter.content.clone(),
            order_number: chapter.order_number,
        };
        stmt.execute(params![
            record.id,
            record.course_id,
            record.title,
            record.content,
            record.order_number,
        ])?;
        created.push(record);
    }

    Ok(created)
}

fn insert_flashcards(conn: &Connection, course_id: &str, cards: &[QuestionAnswer]) -> Result<Vec<Flashcard>> {
    let mut created = Vec::with_capacity(cards.len());

    let mut stmt =
        conn.prepare("INSERT INTO flashcards (id, course_id, question, answer) VALUES (?, ?, ?, ?)")?;

    for card in cards {
        let record = Flashcard {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            question: card.question.clone(),
            answer: card.answer.clone(),
        };
        stmt.execute(params![record.id, record.course_id, record.question, record.answer])?;
        created.push(record);
    }

    Ok(created)
}

fn insert_mcqs(conn: &Connection, course_id: &str, mcqs: &[ParsedMcq]) -> Result<Vec<Mcq>> {
    let mut created = Vec::with_capacity(mcqs.len());

    let mut stmt = conn.prepare(
        "INSERT INTO mcqs (id, course_id, question, options, correct_answer) VALUES (?, ?, ?, ?, ?)",
    )?;

    for mcq in mcqs {
        let record = Mcq {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            question: mcq.question.clone(),
            options: mcq.options.clone(),
            correct_answer: mcq.correct_answer.clone(),
        };
        stmt.execute(params![
            record.id,
            record.course_id,
            record.question,
            serde_json::to_string(&record.options)?,
            record.correct_answer,
        ])?;
        created.push(record);
    }

    Ok(created)
}

fn insert_qnas(conn: &Connection, course_id: &str, pairs: &[QuestionAnswer]) -> Result<Vec<Qna>> {
    let mut created = Vec::with_capacity(pairs.len());

    let mut stmt = conn.prepare("INSERT INTO qna (id, course_id, question, answer) VALUES (?, ?, ?, ?)")?;

    for pair in pairs {
        let record = Qna {
            id: Uuid::new_v4().to_string(),
            course_id: course_id.to_string(),
            question: pair.question.clone(),
            answer: pair.answer.clone(),
        };
        stmt.execute(params![record.id, record.course_id, record.question, record.answer])?;
        created.push(record);
    }

    Ok(created)
}

fn insert_interview_analysis(
    conn: &Connection,
    interview_id: &str,
    analysis: &NewInterviewAnalysis,
) -> Result<InterviewAnalysis> {
    let record = InterviewAnalysis {
        id: Uuid::new_v4().to_string(),
        interview_id: interview_id.to_string(),
        facial_expression_data: analysis.facial_expression_data,
        pronunciation_feedback: analysis.pronunciation_feedback.clone(),
        technical_feedback: analysis.technical_feedback.clone(),
        language_feedback: analysis.language_feedback.clone(),
        course_recommendations: analysis.course_recommendations.clone(),
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO interview_analysis
         (id, interview_id, facial_expression_data, pronunciation_feedback, technical_feedback,
          language_feedback, course_recommendations, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            record.id,
            record.interview_id,
            serde_json::to_string(&record.facial_expression_data)?,
            record.pronunciation_feedback,
            record.technical_feedback,
            record.language_feedback,
            serde_json::to_string(&record.course_recommendations)?,
            record.created_at.to_rfc3339(),
        ],
    )?;

    Ok(record)
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_text<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
