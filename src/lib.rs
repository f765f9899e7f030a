//! studyforge
//! AI 课程生成与模拟面试练习：课程文本解析、Gemini 生成网关、后台生成任务与状态轮询

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use error::{Error, Result};
