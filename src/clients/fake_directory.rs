//! 内存版目录服务，只在单元测试中使用

use crate::clients::Directory;
use crate::models::{Assessment, AssessmentAdjustment, CourseSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeDirectory {
    /// 学号 → 目录 ID
    pub students: HashMap<String, String>,
    /// 当前注册的目录 ID
    pub enrolled: Vec<String>,
    /// 测验 → 时长（None 表示不限时）
    pub time_budgets: HashMap<String, Option<u32>>,
    /// 提交会失败的测验
    pub failing_submissions: Vec<String>,
    pub assessments: Vec<Assessment>,
    pub courses: Vec<CourseSummary>,

    pub resolve_calls: Mutex<Vec<String>>,
    pub verify_calls: Mutex<usize>,
    pub submissions: Mutex<Vec<(String, Vec<AssessmentAdjustment>)>>,
}

impl FakeDirectory {
    pub fn with_student(mut self, student_number: &str, remote_id: &str) -> Self {
        self.students
            .insert(student_number.to_string(), remote_id.to_string());
        self.enrolled.push(remote_id.to_string());
        self
    }

    pub fn with_budget(mut self, assessment_id: &str, minutes: Option<u32>) -> Self {
        self.time_budgets.insert(assessment_id.to_string(), minutes);
        self
    }

    pub fn submitted(&self) -> Vec<(String, Vec<AssessmentAdjustment>)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn list_courses(&self) -> Vec<CourseSummary> {
        self.courses.clone()
    }

    async fn resolve_student(&self, _course_id: &str, student_number: &str) -> Option<String> {
        self.resolve_calls
            .lock()
            .unwrap()
            .push(student_number.to_string());
        self.students.get(student_number).cloned()
    }

    async fn list_assessments(&self, _course_id: &str, published_only: bool) -> Vec<Assessment> {
        self.assessments
            .iter()
            .filter(|a| !published_only || a.published)
            .cloned()
            .collect()
    }

    async fn get_time_budget_minutes(&self, _course_id: &str, assessment_id: &str) -> Option<u32> {
        self.time_budgets.get(assessment_id).copied().flatten()
    }

    async fn submit_adjustments(
        &self,
        _course_id: &str,
        assessment_id: &str,
        batch: &[AssessmentAdjustment],
    ) -> bool {
        self.submissions
            .lock()
            .unwrap()
            .push((assessment_id.to_string(), batch.to_vec()));
        !self.failing_submissions.iter().any(|a| a == assessment_id)
    }

    async fn verify_enrollment(&self, _course_id: &str, candidates: &[String]) -> Vec<String> {
        *self.verify_calls.lock().unwrap() += 1;
        candidates
            .iter()
            .filter(|id| self.enrolled.contains(id))
            .cloned()
            .collect()
    }
}
