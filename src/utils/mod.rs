use std::path::PathBuf;

#[cfg(target_os = "macos")]
const PLATFORM: &str = "macos";

#[cfg(target_os = "windows")]
const PLATFORM: &str = "windows";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM: &str = "linux";

const APP_DIR_NAME: &str = "studyforge";

/// 平台本地数据目录下的 `studyforge`，无法确定时退回当前目录的 `data`
pub fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub fn get_database_path() -> PathBuf {
    let mut path = get_app_data_dir();
    path.push("studyforge.db");
    path
}

pub fn get_platform() -> &'static str {
    PLATFORM
}
