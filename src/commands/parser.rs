//! 课程文本解析命令

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::services::parser::{
    parse_course_content, render_markdown, ParsedChapter, ParsedCourse, ParsedMcq, QuestionAnswer,
};

/// 解析结果传输对象
#[derive(Debug, Serialize, Deserialize)]
pub struct ParsedCourseDto {
    pub summary: String,
    pub chapters: Vec<ParsedChapter>,
    pub flashcards: Vec<QuestionAnswer>,
    pub mcqs: Vec<ParsedMcq>,
    pub qnas: Vec<QuestionAnswer>,
    pub is_empty: bool,
    pub source_path: Option<String>,
}

impl From<ParsedCourse> for ParsedCourseDto {
    fn from(p: ParsedCourse) -> Self {
        Self {
            is_empty: p.is_empty(),
            summary: p.summary,
            chapters: p.chapters,
            flashcards: p.flashcards,
            mcqs: p.mcqs,
            qnas: p.qnas,
            source_path: None,
        }
    }
}

/// 解析课程文本
pub async fn parse_course_document(content: String) -> Result<ParsedCourseDto, String> {
    Ok(parse_course_content(&content).into())
}

/// 从文件读取并解析课程文本
pub async fn parse_course_file(file_path: String) -> Result<ParsedCourseDto, String> {
    if !Path::new(&file_path).exists() {
        return Err(format!("File not found: {}", file_path));
    }

    let content = tokio::fs::read_to_string(&file_path)
        .await
        .map_err(|e| format!("Failed to read file: {}", e))?;

    let mut result: ParsedCourseDto = parse_course_content(&content).into();
    result.source_path = Some(file_path);

    Ok(result)
}

/// 章节 Markdown 渲染为 HTML
pub async fn render_chapter(content: String) -> Result<String, String> {
    Ok(render_markdown(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCUMENT: &str = "# SUMMARY\nIntro.\n\n# CHAPTERS\n## One\nFirst chapter.\n\n# MCQs\n- Question: Pick one\n- Options: a) Yes b) No\n- Correct Answer: b\n";

    #[tokio::test]
    async fn test_parse_course_document() {
        let result = parse_course_document(DOCUMENT.to_string()).await.unwrap();

        assert!(!result.is_empty);
        assert_eq!(result.summary, "Intro.");
        assert_eq!(result.chapters.len(), 1);
        assert_eq!(result.mcqs[0].correct_answer, "No");
        assert!(result.flashcards.is_empty());
    }

    #[tokio::test]
    async fn test_parse_course_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let result = parse_course_file(path.clone()).await.unwrap();
        assert_eq!(result.source_path, Some(path));
        assert_eq!(result.chapters[0].title, "One");

        let missing = parse_course_file("/definitely/not/here.md".to_string()).await;
        assert!(missing.unwrap_err().starts_with("File not found"));
    }

    #[tokio::test]
    async fn test_render_chapter() {
        let html = render_chapter("## Title\n\n- item".to_string()).await.unwrap();
        assert!(html.contains("<h2>Title</h2>"));
        assert!(html.contains("<li>item</li>"));
    }
}
