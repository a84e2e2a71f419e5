//! 额外时间记录提取
//!
//! 两种输入各自有提取规则，由调用方显式选择：
//! - 扫描文档的全文（[`ExtractionInput::FreeText`]）
//! - 批量导出表格的行（[`ExtractionInput::Tabular`]）
//!
//! 单条输入无法识别时只记日志并跳过，不会返回错误。

use crate::error::{AppError, AppResult, FileError};
use crate::models::AccommodationRecord;
use crate::utils::truncate_text;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

/// 导出表格中的一行（原始文本）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportRow {
    /// 带前缀的学号，例如 C1234567
    pub student_id: String,
    /// 申请的照顾内容，例如 "45 minutes"
    pub accommodation: String,
    /// 姓名全称
    pub name: String,
}

impl ExportRow {
    pub fn new(
        student_id: impl Into<String>,
        accommodation: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            accommodation: accommodation.into(),
            name: name.into(),
        }
    }
}

/// 提取输入
#[derive(Debug, Clone)]
pub enum ExtractionInput {
    /// 一份扫描文档的全文，`source` 只用于日志
    FreeText { source: String, text: String },
    /// 导出表格的全部行
    Tabular(Vec<ExportRow>),
}

/// 记录提取器
pub struct TextExtractor {
    name_pattern: Regex,
    extra_time_pattern: Regex,
    integer_pattern: Regex,
}

impl TextExtractor {
    pub fn new() -> AppResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::Other(format!("正则表达式无效: {}", e)))
        };
        Ok(Self {
            // 名 + 两个以上大写字母/连字符组成的姓 + 7 位学号
            name_pattern: compile(r"(\w+)\s*([A-Z][-A-Z]{1,}?)\s*([0-9]{7})")?,
            extra_time_pattern: compile(r"Extra time ([0-9]+) mins? per hour")?,
            // 只接受 ASCII 数字，其他数字字符 parse 不了
            integer_pattern: compile(r"[0-9]+")?,
        })
    }

    /// 按输入类型提取记录，顺序与输入一致
    pub fn extract(&self, input: &ExtractionInput) -> Vec<AccommodationRecord> {
        match input {
            ExtractionInput::FreeText { source, text } => {
                self.extract_free_text(source, text).into_iter().collect()
            }
            ExtractionInput::Tabular(rows) => rows
                .iter()
                .enumerate()
                .filter_map(|(i, row)| self.extract_row(i + 1, row))
                .collect(),
        }
    }

    /// 从一份文档全文中提取一条记录
    ///
    /// 姓名学号和额外时间两部分都找到才产生记录。
    pub fn extract_free_text(&self, source: &str, text: &str) -> Option<AccommodationRecord> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        debug!("[{}] 文本: {}", source, truncate_text(&normalized, 200));

        let name_match = self.name_pattern.captures(&normalized);
        let extra_match = self
            .extra_time_pattern
            .captures(&normalized)
            .and_then(|c| c[1].parse::<u32>().ok());

        match (name_match, extra_match) {
            (Some(caps), Some(0)) => {
                debug!("[{}] 额外时间为 0，跳过: {}", source, &caps[3]);
                None
            }
            (Some(caps), Some(minutes)) => {
                let record = AccommodationRecord::new(&caps[1], &caps[2], &caps[3], minutes);
                info!("✓ [{}] 找到学生: {}", source, record);
                Some(record)
            }
            (name, extra) => {
                warn!("⚠️ [{}] 信息不完整，跳过", source);
                if name.is_none() {
                    warn!("  缺少: 姓名和学号");
                }
                if extra.is_none() {
                    warn!("  缺少: 每小时额外时间");
                }
                None
            }
        }
    }

    /// 从导出表格的一行中提取记录
    pub fn extract_row(&self, line: usize, row: &ExportRow) -> Option<AccommodationRecord> {
        let Some(student_number) = canonical_student_number(&row.student_id) else {
            warn!("⚠️ 第 {} 行学号无效: '{}'", line, row.student_id);
            return None;
        };

        if is_no_additional_time(&row.accommodation) {
            debug!("第 {} 行无需额外时间: {}", line, student_number);
            return None;
        }

        let minutes = self
            .integer_pattern
            .find(&row.accommodation)
            .and_then(|m| m.as_str().parse::<u32>().ok());
        let Some(minutes) = minutes else {
            warn!(
                "⚠️ 第 {} 行无法识别额外时间: '{}'",
                line,
                truncate_text(&row.accommodation, 60)
            );
            return None;
        };
        if minutes == 0 {
            debug!("第 {} 行额外时间为 0: {}", line, student_number);
            return None;
        }

        let mut tokens = row.name.split_whitespace();
        let given_name = tokens.next().unwrap_or_default().to_string();
        let family_name = tokens.collect::<Vec<_>>().join(" ");

        Some(AccommodationRecord::new(
            given_name,
            family_name,
            student_number,
            minutes,
        ))
    }
}

/// 去掉单个字母前缀，剩下必须全是数字
pub fn canonical_student_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = match trimmed.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &trimmed[c.len_utf8()..],
        _ => trimmed,
    };
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits.to_string())
    } else {
        None
    }
}

/// "无需额外时间"的各种写法（含空字符串）
pub fn is_no_additional_time(text: &str) -> bool {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let normalized = normalized.trim_end_matches('.');
    normalized.is_empty()
        || normalized.starts_with("no additional time")
        || normalized.starts_with("no extra time")
}

// ========== 导出文件读取 ==========

const STUDENT_ID_HEADERS: &[&str] = &["studentid", "studentnumber", "id"];
const ACCOMMODATION_HEADERS: &[&str] = &[
    "extratime",
    "requestedaccommodation",
    "accommodation",
    "additionaltime",
];
const NAME_HEADERS: &[&str] = &["name", "studentname", "fullname"];

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

/// 读取导出的 CSV 文件
///
/// 文件读不了或缺少必需的列时返回错误；容忍 UTF-8 BOM。
pub async fn read_export_rows(path: &Path) -> AppResult<Vec<ExportRow>> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound { path: path_str }));
    }
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;
    let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::csv_format(&path_str, e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    let column = |candidates: &[&str], label: &str| {
        find_column(&headers, candidates)
            .ok_or_else(|| AppError::csv_format(&path_str, format!("缺少列: {}", label)))
    };
    let id_col = column(STUDENT_ID_HEADERS, "Student ID")?;
    let text_col = column(ACCOMMODATION_HEADERS, "Extra Time")?;
    let name_col = column(NAME_HEADERS, "Name")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::csv_format(&path_str, e.to_string()))?;
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        rows.push(ExportRow {
            student_id: field(id_col),
            accommodation: field(text_col),
            name: field(name_col),
        });
    }

    info!("📄 导出文件 {} 共 {} 行", path_str, rows.len());
    Ok(rows)
}
