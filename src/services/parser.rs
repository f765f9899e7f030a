//! 生成文本解析引擎
//! 将大模型输出的 Markdown 风格文本拆分为摘要、章节、闪卡、选择题与问答对，
//! 以及面试题目、面试反馈和语音评分

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

// ==================== 正则 ====================

/// 一级标题，仅匹配单个 `#`
static TOP_LEVEL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*$").expect("top-level header regex"));

static CHAPTER_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^##[ \t]+(.*?)[ \t]*$").expect("chapter header regex"));

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(```|~~~)").expect("code fence regex"));

static QUESTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:[-*+][ \t]*)?(?:\d+[.)][ \t]*)?(?:\*\*)?Question(?:[ \t]*\d+)?(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*",
    )
    .expect("question marker regex")
});

static ANSWER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(?:^[ \t]*(?:[-*+][ \t]*)?|[ \t]-[ \t]*)(?:\*\*)?Answer(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*")
        .expect("answer marker regex")
});

static OPTIONS_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)(?:^[ \t]*(?:[-*+][ \t]*)?|[ \t]-[ \t]*)(?:\*\*)?Options(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*")
        .expect("options marker regex")
});

static CORRECT_ANSWER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)(?:^[ \t]*(?:[-*+][ \t]*)?|[ \t]-[ \t]*|[ \t])(?:\*\*)?Correct[ \t]+Answer(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.*)$",
    )
    .expect("correct answer regex")
});

static OPTION_LETTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:^|[ \t])[ \t]*(?:[-*+][ \t]*)?\(?([a-dA-D])\)[ \t]*").expect("option letter regex")
});

static ANSWER_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?([a-dA-D])\)?(?:[\s.:)\-]|$)").expect("answer letter regex"));

static NUMBERED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:\*\*)?\d+[.)](?:\*\*)?[ \t]+(.+?)[ \t]*$").expect("numbered item regex")
});

static FEEDBACK_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:[-*#]+[ \t]*)?(?:\*\*)?(Technical Feedback|Communication Feedback|Strengths|Areas to Improve|Overall Rating)(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*",
    )
    .expect("feedback label regex")
});

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,3}").expect("number regex"));

static SPEECH_SCORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(clarity|confidence|fluency|grammar|technical accuracy)[^\n\d]{0,40}?(\d{1,3})")
        .expect("speech score regex")
});

// ==================== 结果类型 ====================

/// 课程文本中的一级分区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Summary,
    Chapters,
    Flashcards,
    Mcqs,
    QnaPairs,
}

impl SectionKind {
    /// 按标题前缀识别分区，忽略大小写与加粗标记
    pub fn from_header(header: &str) -> Option<Self> {
        let name = header.trim().trim_matches('*').trim().to_uppercase();

        if name.starts_with("SUMMARY") {
            Some(SectionKind::Summary)
        } else if name.starts_with("CHAPTERS") {
            Some(SectionKind::Chapters)
        } else if name.starts_with("FLASHCARDS") {
            Some(SectionKind::Flashcards)
        } else if name.starts_with("MCQ") {
            Some(SectionKind::Mcqs)
        } else if name.starts_with("Q&A") {
            Some(SectionKind::QnaPairs)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedChapter {
    pub title: String,
    pub content: String,
    pub order_number: u32,
}

/// 闪卡与问答对共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMcq {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// 解析后的课程
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCourse {
    pub summary: String,
    pub chapters: Vec<ParsedChapter>,
    pub flashcards: Vec<QuestionAnswer>,
    pub mcqs: Vec<ParsedMcq>,
    pub qnas: Vec<QuestionAnswer>,
}

impl ParsedCourse {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.chapters.is_empty()
            && self.flashcards.is_empty()
            && self.mcqs.is_empty()
            && self.qnas.is_empty()
    }
}

/// 面试回答反馈
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewFeedback {
    pub technical: String,
    pub communication: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub rating: Option<u32>,
}

/// 语音分析评分，0-100
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechScores {
    pub clarity: Option<u32>,
    pub confidence: Option<u32>,
    pub fluency: Option<u32>,
    pub grammar: Option<u32>,
    pub technical_accuracy: Option<u32>,
}

impl SpeechScores {
    pub fn average(&self) -> Option<u32> {
        let scores: Vec<u32> = [
            self.clarity,
            self.confidence,
            self.fluency,
            self.grammar,
            self.technical_accuracy,
        ]
        .into_iter()
        .flatten()
        .collect();

        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<u32>() / scores.len() as u32)
        }
    }
}

// ==================== 课程解析 ====================

/// 解析完整课程文本
///
/// 缺失或格式错误的分区得到空集合，不会返回错误。
pub fn parse_course_content(text: &str) -> ParsedCourse {
    let text = normalize_newlines(text);
    let mut course = ParsedCourse::default();
    let mut seen: Vec<SectionKind> = Vec::new();

    for (kind, body) in split_sections(&text) {
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        match kind {
            SectionKind::Summary => course.summary = body.trim().to_string(),
            SectionKind::Chapters => course.chapters = parse_chapters(body),
            SectionKind::Flashcards => course.flashcards = parse_question_answer_pairs(body),
            SectionKind::Mcqs => course.mcqs = parse_mcqs(body),
            SectionKind::QnaPairs => course.qnas = parse_question_answer_pairs(body),
        }
    }

    course
}

/// 仅取闪卡分区；文本没有一级标题时整体按闪卡解析
pub fn parse_flashcards(text: &str) -> Vec<QuestionAnswer> {
    let text = normalize_newlines(text);
    let sections = split_sections(&text);

    match sections.iter().find(|(kind, _)| *kind == SectionKind::Flashcards) {
        Some((_, body)) => parse_question_answer_pairs(body),
        None if sections.is_empty() => parse_question_answer_pairs(&text),
        None => Vec::new(),
    }
}

/// 按一级标题切分，返回已识别的分区及其正文
pub fn split_sections(text: &str) -> Vec<(SectionKind, &str)> {
    let fences = fenced_ranges(text);
    let headers: Vec<_> = TOP_LEVEL_HEADER
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            if in_ranges(&fences, whole.start()) {
                return None;
            }
            Some((whole.start(), whole.end(), cap.get(1)?.as_str()))
        })
        .collect();

    let mut sections = Vec::new();
    for (idx, (_, end, name)) in headers.iter().enumerate() {
        let body_end = headers.get(idx + 1).map(|h| h.0).unwrap_or(text.len());
        if let Some(kind) = SectionKind::from_header(name) {
            sections.push((kind, &text[*end..body_end]));
        }
    }

    sections
}

/// 以 `## ` 二级标题拆分章节
pub fn parse_chapters(body: &str) -> Vec<ParsedChapter> {
    let fences = fenced_ranges(body);
    let headers: Vec<_> = CHAPTER_HEADER
        .captures_iter(body)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            if in_ranges(&fences, whole.start()) {
                return None;
            }
            Some((whole.start(), whole.end(), cap.get(1)?.as_str()))
        })
        .collect();

    let mut chapters = Vec::new();
    for (idx, (_, end, title)) in headers.iter().enumerate() {
        let title = clean_inline(title);
        if title.is_empty() {
            continue;
        }
        let content_end = headers.get(idx + 1).map(|h| h.0).unwrap_or(body.len());

        chapters.push(ParsedChapter {
            title,
            content: body[*end..content_end].trim().to_string(),
            order_number: chapters.len() as u32 + 1,
        });
    }

    chapters
}

/// 解析 `- Question: ... - Answer: ...` 块
pub fn parse_question_answer_pairs(body: &str) -> Vec<QuestionAnswer> {
    question_blocks(body)
        .into_iter()
        .filter_map(|block| {
            let marker = ANSWER_MARKER.find(block)?;
            let question = clean_block(&block[..marker.start()]);
            let answer = clean_block(&block[marker.end()..]);

            if question.is_empty() || answer.is_empty() {
                None
            } else {
                Some(QuestionAnswer { question, answer })
            }
        })
        .collect()
}

/// 解析选择题块
pub fn parse_mcqs(body: &str) -> Vec<ParsedMcq> {
    question_blocks(body).into_iter().filter_map(parse_mcq_block).collect()
}

fn parse_mcq_block(block: &str) -> Option<ParsedMcq> {
    let correct = CORRECT_ANSWER_MARKER.captures(block);
    let region_end = correct
        .as_ref()
        .and_then(|c| c.get(0))
        .map(|m| m.start())
        .unwrap_or(block.len());

    let (question, region_start) = match OPTIONS_MARKER.find(&block[..region_end]) {
        Some(marker) => (clean_block(&block[..marker.start()]), marker.end()),
        None => {
            let line_end = block.find('\n').unwrap_or(block.len()).min(region_end);
            (clean_block(&block[..line_end]), line_end)
        }
    };

    let options = if region_start < region_end {
        parse_lettered_options(&block[region_start..region_end])
    } else {
        Vec::new()
    };

    if question.is_empty() || options.is_empty() {
        return None;
    }

    let raw_answer = correct
        .as_ref()
        .and_then(|c| c.get(1))
        .map(|m| clean_inline(m.as_str()))
        .unwrap_or_default();

    Some(ParsedMcq {
        correct_answer: resolve_correct_answer(&raw_answer, &options),
        question,
        options,
    })
}

/// 提取 `a) ... d)` 选项，字母须按顺序出现
pub fn parse_lettered_options(region: &str) -> Vec<String> {
    let mut markers: Vec<(usize, usize)> = Vec::new();

    for cap in OPTION_LETTER.captures_iter(region) {
        let (Some(whole), Some(letter)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if letter_index(letter.as_str()) == Some(markers.len()) {
            markers.push((whole.start(), whole.end()));
        }
    }

    markers
        .iter()
        .enumerate()
        .map(|(idx, (_, end))| {
            let next = markers.get(idx + 1).map(|m| m.0).unwrap_or(region.len());
            clean_block(&region[*end..next])
        })
        .filter(|opt| !opt.is_empty())
        .collect()
}

/// 将答案字母映射为选项原文；无法映射时保留原答案
pub fn resolve_correct_answer(raw: &str, options: &[String]) -> String {
    ANSWER_LETTER
        .captures(raw)
        .and_then(|cap| letter_index(cap.get(1)?.as_str()))
        .and_then(|idx| options.get(idx))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

fn letter_index(letter: &str) -> Option<usize> {
    let c = letter.chars().next()?.to_ascii_lowercase();
    ('a'..='d').contains(&c).then(|| (c as u8 - b'a') as usize)
}

fn question_blocks(body: &str) -> Vec<&str> {
    let markers: Vec<_> = QUESTION_MARKER.find_iter(body).collect();

    markers
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let end = markers.get(idx + 1).map(|n| n.start()).unwrap_or(body.len());
            &body[m.end()..end]
        })
        .collect()
}

// ==================== 面试相关解析 ====================

/// 提取编号列表形式的面试题目
pub fn parse_interview_questions(text: &str) -> Vec<String> {
    let text = normalize_newlines(text);
    let numbered: Vec<String> = NUMBERED_ITEM
        .captures_iter(&text)
        .filter_map(|cap| cap.get(1))
        .map(|m| clean_question_line(m.as_str()))
        .filter(|q| !q.is_empty())
        .collect();

    if !numbered.is_empty() {
        return numbered;
    }

    text.lines()
        .map(clean_question_line)
        .filter(|line| line.ends_with('?'))
        .collect()
}

/// 解析单题回答分析
pub fn parse_interview_feedback(text: &str) -> InterviewFeedback {
    let text = normalize_newlines(text);
    let labels: Vec<_> = FEEDBACK_LABEL
        .captures_iter(&text)
        .filter_map(|cap| Some((cap.get(0)?, cap.get(1)?.as_str().to_lowercase())))
        .collect();

    let mut feedback = InterviewFeedback::default();
    for (idx, (whole, label)) in labels.iter().enumerate() {
        let end = labels.get(idx + 1).map(|l| l.0.start()).unwrap_or(text.len());
        let body = &text[whole.end()..end];

        match label.as_str() {
            "technical feedback" => feedback.technical = clean_block(body),
            "communication feedback" => feedback.communication = clean_block(body),
            "strengths" => feedback.strengths = list_items(body),
            "areas to improve" => feedback.improvements = list_items(body),
            "overall rating" => {
                feedback.rating = FIRST_NUMBER
                    .find(body)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .map(|r| r.min(100));
            }
            _ => {}
        }
    }

    feedback
}

/// 解析语音分析中的各项评分，每项取首次出现
pub fn parse_speech_scores(text: &str) -> SpeechScores {
    let mut scores = SpeechScores::default();

    for cap in SPEECH_SCORE.captures_iter(text) {
        let (Some(label), Some(value)) = (cap.get(1), cap.get(2)) else {
            continue;
        };
        let Ok(value) = value.as_str().parse::<u32>() else {
            continue;
        };
        let value = Some(value.min(100));

        let slot = match label.as_str().to_lowercase().as_str() {
            "clarity" => &mut scores.clarity,
            "confidence" => &mut scores.confidence,
            "fluency" => &mut scores.fluency,
            "grammar" => &mut scores.grammar,
            _ => &mut scores.technical_accuracy,
        };
        if slot.is_none() {
            *slot = value;
        }
    }

    scores
}

fn list_items(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| {
            let line = line.trim();
            let line = line.trim_start_matches(['-', '*', '+', '•']).trim_start();
            match NUMBERED_ITEM.captures(line) {
                Some(cap) => cap.get(1).map(|m| m.as_str()).unwrap_or(line).to_string(),
                None => line.to_string(),
            }
        })
        .map(|item| clean_inline(&item))
        .filter(|item| !item.is_empty())
        .collect()
}

// ==================== Markdown 渲染 ====================

/// 章节 Markdown 转 HTML
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}

// ==================== 辅助函数 ====================

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// 代码块所在区间，其中的 `#` 不视为标题
fn fenced_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;

    for m in CODE_FENCE.find_iter(text) {
        match open.take() {
            Some(start) => ranges.push(start..m.end()),
            None => open = Some(m.start()),
        }
    }
    if let Some(start) = open {
        ranges.push(start..text.len());
    }

    ranges
}

fn in_ranges(ranges: &[Range<usize>], pos: usize) -> bool {
    ranges.iter().any(|r| r.contains(&pos))
}

/// 去掉首尾空白、列表符与加粗标记，保留内部换行
fn clean_block(s: &str) -> String {
    let trimmed = s.trim().trim_end_matches(['-', '*']).trim_end();
    let trimmed = trimmed.strip_prefix("**").unwrap_or(trimmed);
    trimmed.trim().to_string()
}

fn clean_inline(s: &str) -> String {
    s.trim().trim_matches('*').trim().to_string()
}

fn clean_question_line(s: &str) -> String {
    let s = s.trim().replace("**", "");
    s.trim_matches(|c: char| c == '"' || c == '“' || c == '”' || c.is_whitespace())
        .to_string()
}
