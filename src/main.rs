//! studyforge 命令行入口

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;

use studyforge::commands::{self, AppState};
use studyforge::models::FacialExpressionData;
use studyforge::services::{GeminiClient, PollOutcome};
use studyforge::{logging, server, utils, AppConfig};

/// AI 课程生成与模拟面试练习
#[derive(Parser, Debug)]
#[command(name = "studyforge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 日志详细程度（-v debug，-vv trace）
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// 仅输出错误日志
    #[arg(short, long, global = true)]
    quiet: bool,

    /// SQLite 数据库路径，覆盖 STUDYFORGE_DB_PATH
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// 当前用户 id，覆盖 STUDYFORGE_USER_ID
    #[arg(long, global = true)]
    user: Option<String>,

    /// 额外写入日志文件
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 解析生成的课程文本文件
    Parse {
        file: PathBuf,
        /// 输出章节 HTML 而不是 JSON
        #[arg(long)]
        html: bool,
    },
    /// 课程生成与查询
    Course {
        #[command(subcommand)]
        action: CourseCommand,
    },
    /// 模拟面试
    Interview {
        #[command(subcommand)]
        action: InterviewCommand,
    },
    /// 运行生成网关 HTTP 服务
    Serve {
        /// 监听地址，覆盖 STUDYFORGE_GATEWAY_ADDR
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

#[derive(Subcommand, Debug)]
enum CourseCommand {
    /// 创建课程并生成内容
    Generate {
        topic: String,
        #[arg(long, default_value = "practice")]
        purpose: String,
        #[arg(long, default_value = "beginner")]
        difficulty: String,
        /// 不轮询状态，仅等待后台任务写入结果
        #[arg(long)]
        no_wait: bool,
        /// 轮询间隔（秒），覆盖 STUDYFORGE_POLL_INTERVAL_SECS
        #[arg(long)]
        poll_interval: Option<u64>,
    },
    /// 重新生成已有课程
    Retry { course_id: String },
    List,
    Show {
        course_id: String,
        /// 输出章节 HTML
        #[arg(long)]
        html: bool,
    },
    Status { course_id: String },
    /// 等待课程生成结束
    Watch { course_id: String },
}

#[derive(Subcommand, Debug)]
enum InterviewCommand {
    /// 生成题目并开始面试
    Start {
        job_role: String,
        #[arg(long)]
        stack: String,
        #[arg(long)]
        experience: String,
        #[arg(long)]
        count: Option<u32>,
    },
    Answer { question_id: String, answer: String },
    /// 分析面试，可附带表情样本 JSON 数组
    Analyze {
        interview_id: String,
        #[arg(long, value_name = "FILE")]
        facial: Option<PathBuf>,
    },
    Show { interview_id: String },
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = logging::level_from_verbosity(cli.verbose, cli.quiet);
    if let Err(e) = logging::init(level, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    log::debug!("studyforge {} on {}", env!("CARGO_PKG_VERSION"), utils::get_platform());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(user) = cli.user {
        config.user_id = user;
    }

    match cli.command {
        Command::Parse { file, html } => {
            let parsed = commands::parse_course_file(file.to_string_lossy().to_string())
                .await
                .map_err(|e| anyhow!(e))?;
            if html {
                for chapter in &parsed.chapters {
                    let body = commands::render_chapter(chapter.content.clone())
                        .await
                        .map_err(|e| anyhow!(e))?;
                    println!("<h2>{}</h2>\n{}", chapter.title, body);
                }
            } else {
                print_json(&parsed)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or(config.gateway_addr);
            config.require_api_key()?;
            let client = GeminiClient::new(&config.gemini)?;
            server::serve(addr, Arc::new(client)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Course { action } => {
            if let CourseCommand::Generate {
                poll_interval: Some(secs),
                ..
            } = &action
            {
                config.poll_interval = std::time::Duration::from_secs((*secs).max(1));
            }
            let state = AppState::from_config(config)?;
            run_course(&state, action).await
        }
        Command::Interview { action } => {
            let state = AppState::from_config(config)?;
            run_interview(&state, action).await
        }
    }
}

async fn run_course(state: &AppState, action: CourseCommand) -> anyhow::Result<ExitCode> {
    match action {
        CourseCommand::Generate {
            topic,
            purpose,
            difficulty,
            no_wait,
            ..
        } => {
            let course = commands::create_course(state, topic, purpose, difficulty)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&course)?;
            if no_wait {
                // 运行时退出会中止后台任务，先等任务落库
                state.tracker.cancel(&course.id);
                let finished = commands::finish_generation(state, course.id)
                    .await
                    .map_err(|e| anyhow!(e))?;
                print_json(&finished)?;
                return Ok(if finished.status == "complete" {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                });
            }
            wait_for(state, course.id).await
        }
        CourseCommand::Retry { course_id } => {
            let course = commands::generate_course(state, course_id)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&course)?;
            wait_for(state, course.id).await
        }
        CourseCommand::List => {
            print_json(&commands::list_courses(state).await.map_err(|e| anyhow!(e))?)?;
            Ok(ExitCode::SUCCESS)
        }
        CourseCommand::Show { course_id, html } => {
            let detail = commands::get_course_detail(state, course_id)
                .await
                .map_err(|e| anyhow!(e))?;
            if html {
                for chapter in &detail.chapters {
                    let body = commands::render_chapter(chapter.content.clone())
                        .await
                        .map_err(|e| anyhow!(e))?;
                    println!("<h2>{}</h2>\n{}", chapter.title, body);
                }
            } else {
                print_json(&detail)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        CourseCommand::Status { course_id } => {
            print_json(&commands::get_course_status(state, course_id).await.map_err(|e| anyhow!(e))?)?;
            Ok(ExitCode::SUCCESS)
        }
        CourseCommand::Watch { course_id } => wait_for(state, course_id).await,
    }
}

async fn wait_for(state: &AppState, course_id: String) -> anyhow::Result<ExitCode> {
    log::info!(
        "Waiting for course {} (checking every {}s)",
        course_id,
        state.config.poll_interval.as_secs()
    );
    let outcome = commands::watch_course(state, course_id)
        .await
        .map_err(|e| anyhow!(e))?;
    print_json(&outcome)?;

    Ok(match outcome {
        PollOutcome::Completed { .. } => ExitCode::SUCCESS,
        PollOutcome::Failed { .. } | PollOutcome::CheckFailed { .. } => ExitCode::FAILURE,
    })
}

async fn run_interview(state: &AppState, action: InterviewCommand) -> anyhow::Result<ExitCode> {
    match action {
        InterviewCommand::Start {
            job_role,
            stack,
            experience,
            count,
        } => {
            let detail = commands::start_interview(state, job_role, stack, experience, count)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&detail)?;
        }
        InterviewCommand::Answer { question_id, answer } => {
            let question = commands::answer_question(state, question_id, answer)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&question)?;
        }
        InterviewCommand::Analyze { interview_id, facial } => {
            let samples: Vec<FacialExpressionData> = match facial {
                Some(path) => {
                    let raw = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str(&raw).context("Facial samples must be a JSON array")?
                }
                None => Vec::new(),
            };
            let analysis = commands::analyze_interview(state, interview_id, samples)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&analysis)?;
        }
        InterviewCommand::Show { interview_id } => {
            let detail = commands::get_interview_detail(state, interview_id)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&detail)?;
        }
        InterviewCommand::List => {
            print_json(&commands::list_interviews(state).await.map_err(|e| anyhow!(e))?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
