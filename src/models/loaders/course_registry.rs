use crate::error::{AppError, AppResult, FileError};
use crate::models::course::CourseRegistry;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载课程列表
///
/// 文件不存在时返回空列表。
pub async fn load_course_registry(path: &Path) -> AppResult<CourseRegistry> {
    if !path.exists() {
        tracing::debug!("课程列表文件不存在，使用空列表: {}", path.display());
        return Ok(CourseRegistry::default());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let registry: CourseRegistry = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    tracing::info!("已加载 {} 门课程: {}", registry.courses.len(), path.display());

    Ok(registry)
}

/// 保存课程列表（先写临时文件再重命名）
pub async fn save_course_registry(path: &Path, registry: &CourseRegistry) -> AppResult<()> {
    let content = toml::to_string_pretty(registry)
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, content)
        .await
        .map_err(|e| AppError::file_write_failed(tmp_path.display().to_string(), e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    tracing::debug!("课程列表已保存: {}", path.display());

    Ok(())
}
