//! 课程处理上下文
//!
//! 封装"我正在处理哪门课程"这一信息

use crate::models::CourseConfig;
use crate::services::RosterStore;
use std::fmt::Display;
use std::path::PathBuf;

/// 课程处理上下文
///
/// 由 `App::select_course` 创建，之后的名单和提交操作都以它为参数
#[derive(Debug, Clone)]
pub struct CourseCtx {
    /// 课程ID
    pub course_id: String,

    /// 课程名称（仅用于日志显示）
    pub course_name: String,

    /// 名单 CSV
    pub roster_file: PathBuf,

    /// 课程专属文档文件夹
    pub document_folder: Option<PathBuf>,
}

impl CourseCtx {
    pub fn from_config(course: &CourseConfig) -> Self {
        Self {
            course_id: course.course_id.clone(),
            course_name: course.course_name.clone(),
            roster_file: course.roster_file.clone(),
            document_folder: course.document_folder.clone(),
        }
    }

    pub fn roster_store(&self) -> RosterStore {
        RosterStore::new(&self.roster_file)
    }

    pub fn label(&self) -> String {
        format!("{} (ID: {})", self.course_name, self.course_id)
    }
}

impl Display for CourseCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[课程 ID#{} {}]", self.course_id, self.course_name)
    }
}
