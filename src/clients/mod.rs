//! 客户端层
//!
//! 对课程目录服务的调用全部经过 [`Directory`]。

pub mod directory_client;
pub mod enrollment_cache;

#[cfg(test)]
pub(crate) mod fake_directory;

pub use directory_client::DirectoryClient;
pub use enrollment_cache::{EnrolledPerson, EnrollmentCache};

use crate::models::{Assessment, AssessmentAdjustment, CourseSummary};
use async_trait::async_trait;

/// 课程目录服务
///
/// 所有方法都不返回错误：取不到数据时记日志并返回空结果。
#[async_trait]
pub trait Directory: Send + Sync {
    /// 当前用户任教的课程，按 (学期开始, 名称) 倒序
    async fn list_courses(&self) -> Vec<CourseSummary>;

    /// 学号 → 目录用户 ID
    async fn resolve_student(&self, course_id: &str, student_number: &str) -> Option<String>;

    async fn list_assessments(&self, course_id: &str, published_only: bool) -> Vec<Assessment>;

    /// 测验时长（分钟）；None 表示不限时，0 是有效值
    async fn get_time_budget_minutes(&self, course_id: &str, assessment_id: &str) -> Option<u32>;

    async fn submit_adjustments(
        &self,
        course_id: &str,
        assessment_id: &str,
        batch: &[AssessmentAdjustment],
    ) -> bool;

    /// 返回仍在课程中注册的 ID，保持输入顺序
    async fn verify_enrollment(&self, course_id: &str, candidates: &[String]) -> Vec<String>;
}
