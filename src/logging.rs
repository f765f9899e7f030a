//! 日志初始化（log + fern）

use std::path::Path;

use crate::error::Result;

/// 安装全局日志：stderr 必选，文件可选
pub fn init(level: log::LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // 第三方 HTTP 栈过于啰嗦
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch
        .apply()
        .map_err(|e| crate::error::Error::Config(format!("logger already initialized: {}", e)))?;
    Ok(())
}

/// `-v` 次数映射到日志级别
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
