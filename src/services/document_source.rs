//! 扫描文档来源
//!
//! 共享文件夹中的文档对所有课程可见，课程文件夹只属于该课程。

use crate::error::{AppError, AppResult};
use crate::infrastructure::pdf_to_text;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// 文档来源
#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    shared_folder: Option<PathBuf>,
}

impl DocumentSource {
    pub fn new(shared_folder: Option<PathBuf>) -> Self {
        Self { shared_folder }
    }

    /// 课程的全部文档：先共享文件夹，后课程文件夹，各自按文件名排序
    pub async fn document_files(&self, course_folder: Option<&Path>) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(shared) = &self.shared_folder {
            files.extend(list_documents(shared).await);
        }
        if let Some(own) = course_folder {
            if Some(own) != self.shared_folder.as_deref() {
                files.extend(list_documents(own).await);
            }
        }
        debug!("找到 {} 份文档", files.len());
        files
    }

    /// 读取文档全文：txt 直接读，pdf 转文字
    pub async fn read_text(&self, path: &Path) -> AppResult<String> {
        if has_extension(path, "pdf") {
            pdf_to_text(path).await
        } else {
            fs::read_to_string(path)
                .await
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

async fn list_documents(folder: &Path) -> Vec<PathBuf> {
    let mut entries = match fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("⚠️ 无法读取文件夹 {}: {}", folder.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if path.is_file() && DOCUMENT_EXTENSIONS.iter().any(|ext| has_extension(&path, ext)) {
                    files.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("⚠️ 遍历文件夹 {} 出错: {}", folder.display(), e);
                break;
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files
}
