// 服务模块
// 提供核心业务逻辑服务

pub mod database;
pub mod gemini;
pub mod generation;
pub mod interview;
pub mod parser;
pub mod poller;

pub use database::{DatabaseService, NewInterviewAnalysis};

pub use gemini::{
    build_prompt,
    Gateway,
    GatewayAction,
    GatewayRequest,
    GatewayResponse,
    GeminiClient,
    GenerationConfig,
    PromptTemplates,
    TextGenerator,
};

pub use generation::CourseGenerator;

pub use interview::{InterviewService, DEFAULT_QUESTION_COUNT};

pub use parser::{
    parse_chapters,
    parse_course_content,
    parse_flashcards,
    parse_interview_feedback,
    parse_interview_questions,
    parse_mcqs,
    parse_question_answer_pairs,
    parse_speech_scores,
    render_markdown,
    InterviewFeedback,
    ParsedChapter,
    ParsedCourse,
    ParsedMcq,
    QuestionAnswer,
    SpeechScores,
};

pub use poller::{
    GenerationPoller,
    GenerationTracker,
    LogNotifier,
    NotificationKind,
    Notifier,
    PollOutcome,
    StatusSource,
};
