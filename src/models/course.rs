use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 目录服务返回的课程摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub name: String,
    /// 学期开始时间（排序用）
    pub term_start: Option<String>,
    /// 依次尝试课程结束、学期结束、注册学期结束、已结课则取创建时间
    pub effective_end_at: Option<String>,
}

/// 课程接口的原始字段
#[derive(Debug, Clone, Deserialize)]
pub struct RawCourse {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub concluded: Option<bool>,
    #[serde(default)]
    pub term: Option<RawTerm>,
    #[serde(default)]
    pub enrollment_term: Option<RawTerm>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTerm {
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
}

impl RawCourse {
    /// 计算实际结束时间
    pub fn effective_end_at(&self) -> Option<String> {
        non_empty(&self.end_at)
            .or_else(|| self.term.as_ref().and_then(|t| non_empty(&t.end_at)))
            .or_else(|| {
                self.enrollment_term
                    .as_ref()
                    .and_then(|t| non_empty(&t.end_at))
            })
            .or_else(|| {
                if self.concluded.unwrap_or(false) {
                    non_empty(&self.created_at)
                } else {
                    None
                }
            })
    }

    pub fn into_summary(self) -> CourseSummary {
        let effective_end_at = self.effective_end_at();
        let term_start = self.term.as_ref().and_then(|t| non_empty(&t.start_at));
        CourseSummary {
            id: self.id,
            name: self.name,
            term_start,
            effective_end_at,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// 按 (学期开始, 名称) 倒序排列，最近的课程在前
pub fn sort_courses_desc(courses: &mut [CourseSummary]) {
    courses.sort_by(|a, b| {
        let key_a = (a.term_start.as_deref().unwrap_or(""), a.name.as_str());
        let key_b = (b.term_start.as_deref().unwrap_or(""), b.name.as_str());
        key_b.cmp(&key_a)
    });
}

/// 测验/作业
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub published: bool,
}

/// 本地管理的课程配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseConfig {
    pub course_id: String,
    pub course_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    /// 课程专属文档文件夹（与共享文件夹一起扫描）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_folder: Option<PathBuf>,
    /// 名单 CSV 路径
    pub roster_file: PathBuf,
}

impl CourseConfig {
    pub fn new(
        course_id: impl Into<String>,
        course_name: impl Into<String>,
        end_at: Option<String>,
        data_dir: &Path,
    ) -> Self {
        let course_id = course_id.into();
        let roster_file = data_dir.join(format!("extra_time_{}.csv", course_id));
        Self {
            course_id,
            course_name: course_name.into(),
            end_at,
            document_folder: None,
            roster_file,
        }
    }

    /// 下拉列表中显示的名称
    pub fn label(&self) -> String {
        format!("{} (ID: {})", self.course_name, self.course_id)
    }

    /// 课程是否仍在进行
    ///
    /// 没有结束时间或结束时间无法解析都算进行中。
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        match self.end_at.as_deref().filter(|v| !v.is_empty()) {
            None => true,
            Some(end_at) => match DateTime::parse_from_rfc3339(end_at) {
                Ok(end) => end.with_timezone(&Utc) > now,
                Err(_) => true,
            },
        }
    }
}

/// 已管理的课程列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRegistry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_document_folder: Option<PathBuf>,
    #[serde(default)]
    pub courses: BTreeMap<String, CourseConfig>,
}

impl CourseRegistry {
    /// 添加或替换课程
    ///
    /// 替换时保留原有的文档文件夹和名单路径，只更新名称和结束时间。
    pub fn add_course(&mut self, course: CourseConfig) -> &CourseConfig {
        let id = course.course_id.clone();
        let merged = match self.courses.remove(&id) {
            Some(existing) => CourseConfig {
                course_name: course.course_name,
                end_at: course.end_at,
                ..existing
            },
            None => course,
        };
        self.courses.entry(id).or_insert(merged)
    }

    pub fn get(&self, course_id: &str) -> Option<&CourseConfig> {
        self.courses.get(course_id)
    }

    pub fn get_mut(&mut self, course_id: &str) -> Option<&mut CourseConfig> {
        self.courses.get_mut(course_id)
    }

    /// 按显示名称排序的课程列表
    pub fn list(&self, current_only: bool, now: DateTime<Utc>) -> Vec<&CourseConfig> {
        let mut courses: Vec<&CourseConfig> = self
            .courses
            .values()
            .filter(|c| !current_only || c.is_current(now))
            .collect();
        courses.sort_by_key(|c| c.label());
        courses
    }

    /// 仍在进行的课程
    pub fn current_courses(&self, now: DateTime<Utc>) -> Vec<&CourseConfig> {
        self.list(true, now)
    }
}

/// 兼容数字或字符串形式的 ID
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawCourse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_effective_end_prefers_course_end() {
        let course = raw(json!({
            "id": 1, "name": "A",
            "end_at": "2025-06-30T00:00:00Z",
            "term": {"end_at": "2025-07-30T00:00:00Z"}
        }));
        assert_eq!(course.effective_end_at().as_deref(), Some("2025-06-30T00:00:00Z"));
    }

    #[test]
    fn test_effective_end_fallback_chain() {
        let term = raw(json!({"id": 1, "name": "A", "end_at": null, "term": {"end_at": "T"}}));
        assert_eq!(term.effective_end_at().as_deref(), Some("T"));

        let enrollment_term = raw(json!({
            "id": 1, "name": "A",
            "term": {"end_at": null},
            "enrollment_term": {"end_at": "E"}
        }));
        assert_eq!(enrollment_term.effective_end_at().as_deref(), Some("E"));

        let concluded = raw(json!({
            "id": 1, "name": "A", "concluded": true, "created_at": "C"
        }));
        assert_eq!(concluded.effective_end_at().as_deref(), Some("C"));

        let open = raw(json!({"id": 1, "name": "A", "concluded": false, "created_at": "C"}));
        assert_eq!(open.effective_end_at(), None);
    }

    #[test]
    fn test_sort_courses_desc() {
        let mut courses = vec![
            raw(json!({"id": 1, "name": "Alpha", "term": {"start_at": "2024-02-01"}})).into_summary(),
            raw(json!({"id": 2, "name": "Beta", "term": {"start_at": "2025-02-01"}})).into_summary(),
            raw(json!({"id": 3, "name": "Gamma", "term": {"start_at": "2025-02-01"}})).into_summary(),
            raw(json!({"id": 4, "name": "Delta"})).into_summary(),
        ];
        sort_courses_desc(&mut courses);
        let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1", "4"]);
    }

    #[test]
    fn test_string_and_numeric_ids() {
        let a: Assessment = serde_json::from_value(json!({"id": 42, "name": "Quiz"})).unwrap();
        let b: Assessment = serde_json::from_value(json!({"id": "43", "name": "Quiz"})).unwrap();
        assert_eq!(a.id, "42");
        assert_eq!(b.id, "43");
        assert!(!a.published);
    }

    #[test]
    fn test_current_courses_filter() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let dir = Path::new("data");
        let mut registry = CourseRegistry::default();
        registry.add_course(CourseConfig::new("1", "Old", Some("2024-12-01T00:00:00Z".into()), dir));
        registry.add_course(CourseConfig::new("2", "Open", None, dir));
        registry.add_course(CourseConfig::new("3", "Running", Some("2025-06-01T00:00:00Z".into()), dir));
        registry.add_course(CourseConfig::new("4", "Odd", Some("someday".into()), dir));

        let current: Vec<&str> = registry
            .list(true, now)
            .iter()
            .map(|c| c.course_id.as_str())
            .collect();
        assert_eq!(current, vec!["4", "2", "3"]);
        assert_eq!(registry.current_courses(now).len(), 3);
        assert_eq!(registry.list(false, now).len(), 4);
    }

    #[test]
    fn test_add_course_keeps_local_settings() {
        let dir = Path::new("data");
        let mut registry = CourseRegistry::default();
        let mut course = CourseConfig::new("7", "Chem", None, dir);
        course.document_folder = Some(PathBuf::from("chem_raps"));
        registry.add_course(course);

        registry.add_course(CourseConfig::new("7", "Chemistry", Some("2025-01-01T00:00:00Z".into()), dir));

        let stored = registry.get("7").unwrap();
        assert_eq!(stored.course_name, "Chemistry");
        assert_eq!(stored.document_folder, Some(PathBuf::from("chem_raps")));
        assert_eq!(stored.roster_file, dir.join("extra_time_7.csv"));
    }
}
