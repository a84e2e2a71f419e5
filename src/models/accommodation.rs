use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 一条考试时间调整记录
///
/// 学号是名单中的唯一键，只保留纯数字部分（不含外部前缀）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccommodationRecord {
    #[serde(alias = "name")]
    pub given_name: String,
    #[serde(alias = "surname")]
    pub family_name: String,
    pub student_number: String,
    /// 每小时额外分钟数
    #[serde(alias = "extra_time_per_hour")]
    pub extra_minutes_per_hour: u32,
    /// 目录中的用户 ID，解析成功后才有
    #[serde(default, alias = "canvas_id", deserialize_with = "deserialize_optional_id")]
    pub remote_id: Option<String>,
}

impl AccommodationRecord {
    pub fn new(
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        student_number: impl Into<String>,
        extra_minutes_per_hour: u32,
    ) -> Self {
        Self {
            given_name: given_name.into(),
            family_name: family_name.into(),
            student_number: student_number.into(),
            extra_minutes_per_hour,
            remote_id: None,
        }
    }

    /// 附加目录 ID
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// 用于日志显示的姓名
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
            .trim()
            .to_string()
    }
}

impl std::fmt::Display for AccommodationRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) +{} 分钟/小时",
            self.display_name(),
            self.student_number,
            self.extra_minutes_per_hour
        )
    }
}

// CSV 中空单元格读作 None，避免把 "" 当成 ID
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// 课程名单
///
/// 按插入顺序保存记录，学号唯一。合并只会追加，不会修改或删除已有记录。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    records: Vec<AccommodationRecord>,
    index: HashMap<String, usize>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, student_number: &str) -> bool {
        self.index.contains_key(student_number)
    }

    pub fn get(&self, student_number: &str) -> Option<&AccommodationRecord> {
        self.index.get(student_number).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccommodationRecord> {
        self.records.iter()
    }

    /// 插入新记录
    ///
    /// 学号已存在时不覆盖，返回 false。
    pub fn insert(&mut self, record: AccommodationRecord) -> bool {
        if self.index.contains_key(&record.student_number) {
            return false;
        }
        self.index
            .insert(record.student_number.clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// 人工修正每小时额外分钟数
    ///
    /// 这是唯一允许修改已有记录的入口，合并流程不会调用它。
    pub fn correct_extra_minutes(&mut self, student_number: &str, minutes: u32) -> bool {
        match self.index.get(student_number) {
            Some(&i) => {
                self.records[i].extra_minutes_per_hour = minutes;
                true
            }
            None => false,
        }
    }

    /// 所有已解析的目录 ID（按名单顺序）
    pub fn remote_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.remote_id.clone())
            .collect()
    }
}

impl FromIterator<AccommodationRecord> for Roster {
    fn from_iter<I: IntoIterator<Item = AccommodationRecord>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for record in iter {
            roster.insert(record);
        }
        roster
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a AccommodationRecord;
    type IntoIter = std::slice::Iter<'a, AccommodationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// 单个学生在单个测验上的额外时间，只在提交时临时构造
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentAdjustment {
    #[serde(rename = "user_id")]
    pub remote_id: String,
    #[serde(rename = "extra_time")]
    pub extra_minutes: u32,
}
