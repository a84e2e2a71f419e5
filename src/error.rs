use std::fmt;

/// 应用程序错误类型
///
/// 只覆盖需要调用方处理的失败：单条记录解析失败、学生未注册等情况
/// 在各自的层内记日志后降级处理，不会出现在这里。
#[derive(Debug)]
pub enum AppError {
    /// API 调用错误
    Api(ApiError),
    /// 文件操作错误
    File(FileError),
    /// 配置错误
    Config(ConfigError),
    /// 前置条件不满足（需要用户操作）
    Precondition(PreconditionError),
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Api(e) => write!(f, "API错误: {}", e),
            AppError::File(e) => write!(f, "文件错误: {}", e),
            AppError::Config(e) => write!(f, "配置错误: {}", e),
            AppError::Precondition(e) => write!(f, "无法继续: {}", e),
            AppError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Api(e) => Some(e),
            AppError::File(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::Precondition(e) => Some(e),
            AppError::Other(_) => None,
        }
    }
}

/// API 调用错误
///
/// 请求本身的失败在客户端层降级为空结果，不会出现在这里。
#[derive(Debug)]
pub enum ApiError {
    /// HTTP 客户端构建失败
    ClientBuildFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ClientBuildFailed { source } => {
                write!(f, "无法创建HTTP客户端: {}", source)
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::ClientBuildFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// CSV 格式错误（缺少列、表头不对等）
    CsvFormat {
        path: String,
        message: String,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 外部转换工具不可用（例如 pdftotext）
    ToolUnavailable {
        tool: String,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::CsvFormat { path, message } => {
                write!(f, "CSV格式错误 ({}): {}", path, message)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            FileError::ToolUnavailable { tool } => {
                write!(f, "未找到外部工具 {} (请安装 poppler-utils)", tool)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必填配置项为空
    MissingValue {
        var_name: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::MissingValue { var_name } => {
                write!(f, "缺少必填配置 {}", var_name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 前置条件错误
///
/// 需要用户先完成某个操作（选课程、配置文件夹等），只中止当前操作。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// 未选择课程
    NoCourseSelected,
    /// 课程不在已管理列表中
    UnknownCourse {
        course_id: String,
    },
    /// 没有找到任何可处理的文档
    NoDocumentSource {
        course_id: String,
    },
    /// 名单为空或不存在
    EmptyRoster {
        course_id: String,
    },
    /// 测验没有时间限制
    NoTimeBudget {
        assessment_id: String,
    },
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::NoCourseSelected => write!(f, "请先选择课程"),
            PreconditionError::UnknownCourse { course_id } => {
                write!(f, "课程 {} 未配置，请先刷新课程列表", course_id)
            }
            PreconditionError::NoDocumentSource { course_id } => {
                write!(f, "课程 {} 没有可处理的文档，请检查文档文件夹", course_id)
            }
            PreconditionError::EmptyRoster { course_id } => {
                write!(f, "课程 {} 的名单为空，请先处理文档或导入文件", course_id)
            }
            PreconditionError::NoTimeBudget { assessment_id } => {
                write!(f, "测验 {} 没有时间限制", assessment_id)
            }
        }
    }
}

impl std::error::Error for PreconditionError {}

// ========== 从常见错误类型转换 ==========

impl From<PreconditionError> for AppError {
    fn from(err: PreconditionError) -> Self {
        AppError::Precondition(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建 CSV 格式错误
    pub fn csv_format(path: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::File(FileError::CsvFormat {
            path: path.into(),
            message: message.into(),
        })
    }

    /// 是否为需要用户操作的前置条件错误
    pub fn is_precondition(&self) -> bool {
        matches!(self, AppError::Precondition(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
