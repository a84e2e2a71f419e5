//! 名单持久化
//!
//! 每门课程一个 CSV 文件，每次都整体重写，不做追加。

use crate::error::{AppError, AppResult};
use crate::models::{AccommodationRecord, Roster};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// 名单文件的列，顺序固定
pub const ROSTER_COLUMNS: [&str; 5] = [
    "given_name",
    "family_name",
    "student_number",
    "extra_minutes_per_hour",
    "remote_id",
];

/// 单门课程的名单存储
#[derive(Debug, Clone)]
pub struct RosterStore {
    path: PathBuf,
}

impl RosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取名单
    ///
    /// 文件不存在返回空名单；重复学号保留第一条。
    /// 任何一行格式错误都视为整个文件不可用，避免重写时丢数据。
    pub async fn load(&self) -> AppResult<Roster> {
        let path_str = self.path.display().to_string();
        if !self.path.exists() {
            debug!("名单文件不存在，使用空名单: {}", path_str);
            return Ok(Roster::new());
        }

        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_str, e))?;
        let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content);

        let mut roster = Roster::new();
        for (i, row) in reader.deserialize::<AccommodationRecord>().enumerate() {
            let record = row.map_err(|e| {
                AppError::csv_format(&path_str, format!("第 {} 行: {}", i + 2, e))
            })?;
            let number = record.student_number.clone();
            if !roster.insert(record) {
                warn!("⚠️ 名单中学号 {} 重复，保留第一条", number);
            }
        }

        info!("📖 已读取 {} 名学生: {}", roster.len(), path_str);
        Ok(roster)
    }

    /// 整体重写名单（先写临时文件再重命名）
    pub async fn rewrite(&self, roster: &Roster) -> AppResult<()> {
        let path_str = self.path.display().to_string();

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(ROSTER_COLUMNS)
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        for record in roster {
            writer
                .serialize(record)
                .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        }
        let content = writer
            .into_inner()
            .map_err(|e| AppError::file_write_failed(&path_str, e.into_error()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        info!("💾 已写入 {} 名学生: {}", roster.len(), path_str);
        Ok(())
    }
}
