use crate::error::{AppError, AppResult, ConfigError};
use std::path::PathBuf;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- 课程目录 API 配置 ---
    /// API 根地址（不含 /api/v1）
    pub api_base_url: String,
    /// Bearer token
    pub access_token: String,
    /// 每页条数
    pub per_page: u32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 外部学号前缀，目录中的 sis_user_id = 前缀 + 学号
    pub student_id_prefix: String,
    // --- 本地文件 ---
    /// 所有课程共用的文档文件夹
    pub shared_document_folder: PathBuf,
    /// 名单 CSV 默认存放目录
    pub data_dir: PathBuf,
    /// 已管理课程列表
    pub course_registry_file: PathBuf,
    /// 日志文件，空字符串表示不写文件
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://canvas.instructure.com".to_string(),
            access_token: String::new(),
            per_page: 100,
            request_timeout_secs: 30,
            student_id_prefix: "c".to_string(),
            shared_document_folder: PathBuf::from("RAP"),
            data_dir: PathBuf::from("."),
            course_registry_file: PathBuf::from("courses.toml"),
            log_file: "rapydity.log".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base_url: std::env::var("DIRECTORY_BASE_URL").unwrap_or(default.api_base_url),
            access_token: std::env::var("DIRECTORY_ACCESS_TOKEN").unwrap_or(default.access_token),
            per_page: std::env::var("DIRECTORY_PER_PAGE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.per_page),
            request_timeout_secs: std::env::var("DIRECTORY_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            student_id_prefix: std::env::var("STUDENT_ID_PREFIX").unwrap_or(default.student_id_prefix),
            shared_document_folder: std::env::var("SHARED_DOCUMENT_FOLDER").map(PathBuf::from).unwrap_or(default.shared_document_folder),
            data_dir: std::env::var("ROSTER_DATA_DIR").map(PathBuf::from).unwrap_or(default.data_dir),
            course_registry_file: std::env::var("COURSE_REGISTRY_FILE").map(PathBuf::from).unwrap_or(default.course_registry_file),
            log_file: std::env::var("ROSTER_LOG_FILE").unwrap_or(default.log_file),
        }
    }

    /// 检查连接目录服务所需的配置
    pub fn validate(&self) -> AppResult<()> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::Config(ConfigError::MissingValue {
                var_name: "DIRECTORY_ACCESS_TOKEN".to_string(),
            }));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(AppError::Config(ConfigError::MissingValue {
                var_name: "DIRECTORY_BASE_URL".to_string(),
            }));
        }
        if self.per_page == 0 {
            return Err(AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: "DIRECTORY_PER_PAGE".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            }));
        }
        Ok(())
    }
}
