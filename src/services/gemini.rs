//! Gemini 生成服务模块
//! 提供生成式语言接口调用、提示词模板以及 `{ action, data }` 网关分发

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::models::FacialExpressionData;

/// 生成参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// 课程生成：长输出
    pub fn course() -> Self {
        Self {
            temperature: 0.7,
            top_k: Some(40),
            top_p: Some(0.95),
            max_output_tokens: 8192,
        }
    }

    pub fn questions() -> Self {
        Self {
            temperature: 0.7,
            top_k: None,
            top_p: None,
            max_output_tokens: 2048,
        }
    }

    /// 通用文本：摘要、代码讲解、自定义提示词
    pub fn general() -> Self {
        Self {
            temperature: 0.7,
            top_k: None,
            top_p: None,
            max_output_tokens: 4096,
        }
    }

    /// 分析类请求：低温度
    pub fn analysis() -> Self {
        Self {
            temperature: 0.3,
            top_k: None,
            top_p: None,
            max_output_tokens: 2048,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::course()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// 文本生成能力，测试中可替换为脚本化实现
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}

/// Gemini HTTP 客户端
#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// 调用 generateContent，返回首个候选的全部文本
    pub async fn generate_content(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::Config("GEMINI_API_KEY is not set".to_string()));
        }

        let start_time = Instant::now();
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Error from Gemini API: {} {}", status, body);
            return Err(Error::Gateway {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let payload = response.json::<GenerateContentResponse>().await?;
        let text = extract_text(payload).ok_or(Error::EmptyResponse)?;

        log::debug!(
            "Gemini generated {} chars in {} ms",
            text.len(),
            start_time.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        self.generate_content(prompt, config).await
    }
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        (**self).generate(prompt, config).await
    }
}

fn extract_text(payload: GenerateContentResponse) -> Option<String> {
    let parts = payload.candidates.into_iter().next()?.content?.parts;
    let text: String = parts.into_iter().filter_map(|p| p.text).collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ==================== 提示词 ====================

/// 固定提示词模板
pub struct PromptTemplates;

impl PromptTemplates {
    /// 完整课程：摘要、章节、闪卡、选择题、问答对
    pub fn course(topic: &str, purpose: &str, difficulty: &str) -> String {
        format!(
            r#"Create a complete course on {topic} for {purpose} at {difficulty} level.

Follow this exact structure:

# SUMMARY
Provide a concise overview of what the course covers and its objectives.

# CHAPTERS
Create 5-8 logically structured chapters. For each chapter:
## [Chapter Title]
[Chapter Content with detailed and comprehensive content including examples, explanations, and relevant concepts]

# FLASHCARDS
Create at least 15 flashcards in this format:
- Question: [question text]
- Answer: [answer text]

# MCQs (Multiple Choice Questions)
Create at least 10 multiple choice questions in this format:
- Question: [question text]
- Options:
a) [option text]
b) [option text]
c) [option text]
d) [option text]
- Correct Answer: [correct letter]

# Q&A PAIRS
Create at least 10 question and answer pairs for deeper understanding:
- Question: [detailed question]
- Answer: [comprehensive answer]

Ensure the course is educational, accurate, and tailored to {purpose} at {difficulty} level."#
        )
    }

    pub fn flashcards(topic: &str, purpose: &str, difficulty: &str) -> String {
        format!(
            r#"Generate 20 detailed flashcards on the topic: {topic} for {purpose} at {difficulty} level.
Create flashcards in this exact format:

# FLASHCARDS
- Question: [Specific, clear question text]
- Answer: [Comprehensive, accurate answer text]

Make sure the flashcards cover key concepts, terms, principles, and applications related to the topic.
Each answer should be detailed enough to provide complete understanding.
Ensure varying difficulty levels across the flashcards to test different aspects of knowledge."#
        )
    }

    pub fn interview_questions(job_role: &str, tech_stack: &str, experience: &str, count: u32) -> String {
        format!(
            r#"Generate {count} interview questions for a {experience} years experienced {job_role} with expertise in {tech_stack}. The questions should be challenging and relevant to the role.
For each question:
1. Focus on technical knowledge and practical application
2. Test problem-solving abilities
3. Include scenario-based questions
4. Assess teamwork and collaboration skills
Format as a numbered list."#
        )
    }

    pub fn analyze_interview(job_role: &str, question: &str, answer: &str) -> String {
        format!(
            r#"Analyze this interview response for a {job_role} position.
Question: {question}
Answer: {answer}

Provide detailed analysis in the following format:

Technical Feedback: (Analyze understanding of technical concepts and accuracy)
Communication Feedback: (Analyze clarity, structure, and language used)
Strengths: (List 3 specific strengths in the response)
Areas to Improve: (List 3 specific areas that could be improved)
Overall Rating: (Give a rating between 0-100)"#
        )
    }

    pub fn analyze_speech(job_role: &str, transcript: &str) -> String {
        format!(
            r#"Analyze this speech transcript for a {job_role} interview:

"{transcript}"

Evaluate the speaking skills in terms of:
1. Clarity (how clear and understandable the speech is)
2. Confidence (how confident the speaker sounds)
3. Fluency (how smoothly the speech flows)
4. Grammar and vocabulary (correctness and richness of language)
5. Technical accuracy (correct use of technical terms)

Provide a rating for each category (0-100) and specific feedback on how to improve."#
        )
    }

    pub fn analyze_facial_expression(job_role: &str, data: &FacialExpressionData) -> String {
        format!(
            r#"During a mock interview for a {job_role} position, facial expression analysis produced these average scores (0.0 to 1.0):
- Confident: {:.2}
- Stressed: {:.2}
- Hesitant: {:.2}
- Nervous: {:.2}

Interpret these scores for the candidate in 3-5 sentences and give 3 concrete tips for improving non-verbal communication."#,
            data.confident, data.stressed, data.hesitant, data.nervous
        )
    }

    pub fn summarize_text(text: &str) -> String {
        format!("Summarize the following text concisely:\n\n{text}")
    }

    pub fn explain_code(code: &str) -> String {
        format!(
            "Explain the following code snippet in detail, including its purpose, logic, and potential improvements:\n\n{code}"
        )
    }
}

// ==================== 网关 ====================

/// 网关支持的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayAction {
    GenerateCourse,
    GenerateInterviewQuestions,
    AnalyzeInterview,
    AnalyzeSpeech,
    AnalyzeFacialExpression,
    GenerateFlashcards,
    SummarizeText,
    ExplainCode,
    CustomContent,
}

impl GatewayAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayAction::GenerateCourse => "generate_course",
            GatewayAction::GenerateInterviewQuestions => "generate_interview_questions",
            GatewayAction::AnalyzeInterview => "analyze_interview",
            GatewayAction::AnalyzeSpeech => "analyze_speech",
            GatewayAction::AnalyzeFacialExpression => "analyze_facial_expression",
            GatewayAction::GenerateFlashcards => "generate_flashcards",
            GatewayAction::SummarizeText => "summarize_text",
            GatewayAction::ExplainCode => "explain_code",
            GatewayAction::CustomContent => "custom_content",
        }
    }
}

impl FromStr for GatewayAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generate_course" => Ok(GatewayAction::GenerateCourse),
            "generate_interview_questions" => Ok(GatewayAction::GenerateInterviewQuestions),
            "analyze_interview" => Ok(GatewayAction::AnalyzeInterview),
            "analyze_speech" => Ok(GatewayAction::AnalyzeSpeech),
            "analyze_facial_expression" => Ok(GatewayAction::AnalyzeFacialExpression),
            "generate_flashcards" => Ok(GatewayAction::GenerateFlashcards),
            "summarize_text" => Ok(GatewayAction::SummarizeText),
            "explain_code" => Ok(GatewayAction::ExplainCode),
            "custom_content" => Ok(GatewayAction::CustomContent),
            other => Err(Error::InvalidInput(format!("Unsupported action: {}", other))),
        }
    }
}

impl fmt::Display for GatewayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 网关请求，action 保留原始字符串以便返回不支持的动作名
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

impl GatewayRequest {
    pub fn new(action: GatewayAction, data: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GatewayResponse {
    pub fn ok(text: String) -> Self {
        Self {
            success: true,
            data: Some(json!({ "text": text })),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// 成功时取出生成文本
    pub fn text(&self) -> Option<&str> {
        self.data.as_ref()?.get("text")?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct CourseData {
    topic: String,
    purpose: String,
    difficulty: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterviewQuestionsData {
    job_role: String,
    tech_stack: String,
    experience: String,
    #[serde(default = "default_question_count")]
    question_count: u32,
}

fn default_question_count() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeInterviewData {
    job_role: String,
    question: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSpeechData {
    job_role: String,
    transcript: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeFacialData {
    job_role: String,
    facial_data: FacialExpressionData,
}

#[derive(Debug, Deserialize)]
struct SummarizeData {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ExplainCodeData {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CustomContentData {
    prompt: String,
}

/// `{ action, data }` 分发：填充提示词模板并转发到生成接口
pub struct Gateway<G> {
    generator: G,
}

impl<G: TextGenerator> Gateway<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// 处理请求，所有错误折叠为 `{ success: false, error }`
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        match self.execute(&request).await {
            Ok(text) => GatewayResponse::ok(text),
            Err(e) => {
                log::error!("Error in gateway action {}: {}", request.action, e);
                GatewayResponse::err(match e {
                    Error::InvalidInput(msg) => msg,
                    other => other.to_string(),
                })
            }
        }
    }

    /// 执行请求，保留错误类型
    pub async fn execute(&self, request: &GatewayRequest) -> Result<String> {
        let action: GatewayAction = request.action.parse()?;
        log::info!("Gateway action: {}", action);

        let (prompt, config) = build_prompt(action, &request.data)?;
        self.generator.generate(&prompt, &config).await
    }
}

/// 根据动作与数据构建提示词和生成参数
pub fn build_prompt(action: GatewayAction, data: &Value) -> Result<(String, GenerationConfig)> {
    fn decode<T: serde::de::DeserializeOwned>(action: GatewayAction, data: &Value) -> Result<T> {
        serde_json::from_value(data.clone())
            .map_err(|e| Error::InvalidInput(format!("Invalid data for {}: {}", action, e)))
    }

    let built = match action {
        GatewayAction::GenerateCourse => {
            let d: CourseData = decode(action, data)?;
            (
                PromptTemplates::course(&d.topic, &d.purpose, &d.difficulty),
                GenerationConfig::course(),
            )
        }
        GatewayAction::GenerateFlashcards => {
            let d: CourseData = decode(action, data)?;
            (
                PromptTemplates::flashcards(&d.topic, &d.purpose, &d.difficulty),
                GenerationConfig::course(),
            )
        }
        GatewayAction::GenerateInterviewQuestions => {
            let d: InterviewQuestionsData = decode(action, data)?;
            (
                PromptTemplates::interview_questions(&d.job_role, &d.tech_stack, &d.experience, d.question_count),
                GenerationConfig::questions(),
            )
        }
        GatewayAction::AnalyzeInterview => {
            let d: AnalyzeInterviewData = decode(action, data)?;
            (
                PromptTemplates::analyze_interview(&d.job_role, &d.question, &d.answer),
                GenerationConfig::analysis(),
            )
        }
        GatewayAction::AnalyzeSpeech => {
            let d: AnalyzeSpeechData = decode(action, data)?;
            (
                PromptTemplates::analyze_speech(&d.job_role, &d.transcript),
                GenerationConfig::analysis(),
            )
        }
        GatewayAction::AnalyzeFacialExpression => {
            let d: AnalyzeFacialData = decode(action, data)?;
            (
                PromptTemplates::analyze_facial_expression(&d.job_role, &d.facial_data),
                GenerationConfig::analysis(),
            )
        }
        GatewayAction::SummarizeText => {
            let d: SummarizeData = decode(action, data)?;
            (PromptTemplates::summarize_text(&d.text), GenerationConfig::general())
        }
        GatewayAction::ExplainCode => {
            let d: ExplainCodeData = decode(action, data)?;
            (PromptTemplates::explain_code(&d.code), GenerationConfig::general())
        }
        GatewayAction::CustomContent => {
            let d: CustomContentData = decode(action, data)?;
            if d.prompt.trim().is_empty() {
                return Err(Error::InvalidInput("Prompt must not be empty".to_string()));
            }
            (d.prompt, GenerationConfig::general())
        }
    };

    Ok(built)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预置结果，并记录收到的提示词
    #[derive(Default)]
    pub struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(Error::EmptyResponse))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedGenerator;
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
    use std::collections::HashMap;

    async fn spawn_fake_gemini(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/models/:model",
            post(move |Query(params): Query<HashMap<String, String>>, Json(req): Json<Value>| {
                let body = body.clone();
                async move {
                    assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
                    assert!(req["contents"][0]["parts"][0]["text"].is_string());
                    assert!(req["generationConfig"]["maxOutputTokens"].is_number());
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_content_joins_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "# SUMMARY\n" }, { "text": "Intro" }] } }]
        });
        let client = client_for(spawn_fake_gemini(StatusCode::OK, body).await);

        let text = client.generate_content("hello", &GenerationConfig::course()).await.unwrap();
        assert_eq!(text, "# SUMMARY\nIntro");
    }

    #[tokio::test]
    async fn test_generate_content_maps_http_error() {
        let client = client_for(
            spawn_fake_gemini(StatusCode::TOO_MANY_REQUESTS, json!({ "error": "quota" })).await,
        );

        let err = client.generate_content("hello", &GenerationConfig::analysis()).await.unwrap_err();
        assert!(matches!(err, Error::Gateway { status: 429, .. }));
        assert_eq!(err.to_string(), "Gemini API error: 429 Too Many Requests");
    }

    #[tokio::test]
    async fn test_generate_content_empty_candidates() {
        let client = client_for(spawn_fake_gemini(StatusCode::OK, json!({ "candidates": [] })).await);

        let err = client.generate_content("hello", &GenerationConfig::questions()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = client_for("http://127.0.0.1:9".to_string());
        let client = GeminiClient {
            api_key: String::new(),
            ..client
        };

        let err = client.generate_content("hello", &GenerationConfig::course()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_gateway_generate_course() {
        let gateway = Gateway::new(ScriptedGenerator::new(vec![Ok("# SUMMARY\nRust".to_string())]));
        let request = GatewayRequest::new(
            GatewayAction::GenerateCourse,
            json!({ "topic": "Rust", "purpose": "exam", "difficulty": "beginner" }),
        );

        let response = gateway.handle(request).await;
        assert!(response.success);
        assert_eq!(response.text(), Some("# SUMMARY\nRust"));

        let prompts = gateway.generator().prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Create a complete course on Rust for exam at beginner level."));
        assert!(prompts[0].contains("# Q&A PAIRS"));
    }

    #[tokio::test]
    async fn test_gateway_unsupported_action() {
        let gateway = Gateway::new(ScriptedGenerator::default());
        let response = gateway
            .handle(GatewayRequest {
                action: "translate_text".to_string(),
                data: json!({}),
            })
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unsupported action: translate_text"));
        assert_eq!(gateway.generator().prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_collapses_generator_error() {
        let gateway = Gateway::new(ScriptedGenerator::new(vec![Err(Error::Gateway {
            status: 500,
            message: "Internal Server Error".to_string(),
        })]));
        let request = GatewayRequest::new(
            GatewayAction::AnalyzeInterview,
            json!({ "jobRole": "SRE", "question": "What is an SLO?", "answer": "A target." }),
        );

        let response = gateway.handle(request).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Gemini API error: 500 Internal Server Error"));
    }

    #[test]
    fn test_interview_prompt_defaults_to_five_questions() {
        let (prompt, config) = build_prompt(
            GatewayAction::GenerateInterviewQuestions,
            &json!({ "jobRole": "Backend Engineer", "techStack": "Rust", "experience": "3" }),
        )
        .unwrap();

        assert!(prompt.starts_with("Generate 5 interview questions for a 3 years experienced Backend Engineer"));
        assert_eq!(config, GenerationConfig::questions());
    }

    #[test]
    fn test_build_prompt_rejects_missing_fields() {
        let err = build_prompt(GatewayAction::AnalyzeSpeech, &json!({ "jobRole": "QA" })).unwrap_err();
        assert!(err.to_string().contains("Invalid data for analyze_speech"));
    }

    #[tokio::test]
    async fn test_gateway_text_utilities() {
        let gateway = Gateway::new(ScriptedGenerator::new(vec![
            Ok("Short summary".to_string()),
            Ok("It adds numbers".to_string()),
            Ok("Haiku".to_string()),
        ]));

        let summary = gateway
            .handle(GatewayRequest::new(GatewayAction::SummarizeText, json!({ "text": "Long article" })))
            .await;
        assert_eq!(summary.text(), Some("Short summary"));

        let explained = gateway
            .handle(GatewayRequest::new(GatewayAction::ExplainCode, json!({ "code": "fn add(a: i32, b: i32) -> i32 { a + b }" })))
            .await;
        assert!(explained.success);

        let custom = gateway
            .handle(GatewayRequest::new(GatewayAction::CustomContent, json!({ "prompt": "Write a haiku about Rust" })))
            .await;
        assert_eq!(custom.text(), Some("Haiku"));

        let prompts = gateway.generator().prompts.lock().unwrap();
        assert_eq!(prompts[0], "Summarize the following text concisely:\n\nLong article");
        assert!(prompts[1].starts_with("Explain the following code snippet in detail"));
        assert!(prompts[1].ends_with("{ a + b }"));
        assert_eq!(prompts[2], "Write a haiku about Rust");
    }

    #[test]
    fn test_custom_content_requires_prompt() {
        let err = build_prompt(GatewayAction::CustomContent, &json!({ "prompt": "  " })).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = build_prompt(GatewayAction::ExplainCode, &json!({ "text": "x" })).unwrap_err();
        assert!(err.to_string().contains("Invalid data for explain_code"));
    }

    #[test]
    fn test_facial_prompt_formats_scores() {
        let data = FacialExpressionData { confident: 0.75, stressed: 0.1, hesitant: 0.2, nervous: 0.05 };
        let prompt = PromptTemplates::analyze_facial_expression("Designer", &data);

        assert!(prompt.contains("- Confident: 0.75"));
        assert!(prompt.contains("- Nervous: 0.05"));
    }
}
