//! 扫描文档转文本 - 基础设施层
//!
//! 调用 poppler 的 `pdftotext`，只负责"把 PDF 变成文字"

use crate::error::{AppError, AppResult, FileError};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const PDFTOTEXT: &str = "pdftotext";

/// 查找 pdftotext 可执行文件
pub fn locate_pdftotext() -> AppResult<PathBuf> {
    which::which(PDFTOTEXT).map_err(|_| {
        AppError::File(FileError::ToolUnavailable {
            tool: PDFTOTEXT.to_string(),
        })
    })
}

/// 提取 PDF 全部文字
///
/// 输出写到 stdout，不生成临时文件。
pub async fn pdf_to_text(path: &Path) -> AppResult<String> {
    let tool = locate_pdftotext()?;
    debug!("pdftotext {}", path.display());

    let output = Command::new(&tool)
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::file_read_failed(
            path.display().to_string(),
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("pdftotext 退出码 {:?}: {}", output.status.code(), stderr.trim()),
            ),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.pdf");

        // 没装 pdftotext 时是 ToolUnavailable，装了则是读取失败，两者都是文件错误
        let err = pdf_to_text(&missing).await.unwrap_err();
        assert!(matches!(err, AppError::File(_)));
    }
}
