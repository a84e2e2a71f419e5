/// 课程目录 API 客户端
///
/// 封装课程、注册名单、测验和额外时间提交的全部调用
use crate::clients::enrollment_cache::{EnrolledPerson, EnrollmentCache};
use crate::clients::Directory;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::HttpExecutor;
use crate::models::course::{sort_courses_desc, RawCourse};
use crate::models::{Assessment, AssessmentAdjustment, CourseSummary};
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 目录客户端
pub struct DirectoryClient {
    executor: HttpExecutor,
    enrollments: EnrollmentCache,
    student_id_prefix: String,
    per_page: u32,
}

impl DirectoryClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let executor = HttpExecutor::new(config)?;
        Ok(Self::with_executor(
            executor,
            config.student_id_prefix.clone(),
            config.per_page,
        ))
    }

    pub fn with_executor(
        executor: HttpExecutor,
        student_id_prefix: impl Into<String>,
        per_page: u32,
    ) -> Self {
        Self {
            executor,
            enrollments: EnrollmentCache::new(),
            student_id_prefix: student_id_prefix.into(),
            per_page,
        }
    }

    /// 丢弃某门课程的注册名单缓存，下次访问时重新拉取
    pub fn invalidate_enrollments(&self, course_id: &str) -> bool {
        self.enrollments.invalidate(course_id)
    }

    fn per_page_query(&self) -> Vec<(&'static str, String)> {
        vec![("per_page", self.per_page.to_string())]
    }

    /// 课程注册名单（带缓存）
    ///
    /// 拉取失败时返回空名单且不写入缓存。
    async fn enrolled_people(&self, course_id: &str) -> Arc<Vec<EnrolledPerson>> {
        if let Some(cached) = self.enrollments.get(course_id) {
            return cached;
        }

        let path = format!("/api/v1/courses/{}/enrollments", course_id);
        match self.executor.get_paginated(&path, &self.per_page_query()).await {
            Ok(items) => {
                let people: Vec<EnrolledPerson> = items
                    .iter()
                    .filter_map(EnrolledPerson::from_enrollment)
                    .collect();
                info!("👥 课程 {} 注册人数: {}", course_id, people.len());
                self.enrollments.store(course_id, people)
            }
            Err(e) => {
                log_fetch_failure("获取注册名单", course_id, &e);
                Arc::new(Vec::new())
            }
        }
    }

    /// 测验对应的 quiz_id，非测验作业返回 None
    async fn quiz_id(&self, course_id: &str, assessment_id: &str) -> Option<String> {
        let path = format!("/api/v1/courses/{}/assignments/{}", course_id, assessment_id);
        let assignment = match self.executor.get_json(&path, &[]).await {
            Ok(value) => value,
            Err(e) => {
                log_fetch_failure("获取作业详情", course_id, &e);
                return None;
            }
        };

        if !assignment
            .get("is_quiz_assignment")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
        {
            debug!("作业 {} 不是测验", assessment_id);
            return None;
        }

        match assignment.get("quiz_id") {
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => {
                warn!("⚠️ 测验作业 {} 缺少 quiz_id", assessment_id);
                None
            }
        }
    }
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn list_courses(&self) -> Vec<CourseSummary> {
        let query = vec![
            ("enrollment_type", "teacher".to_string()),
            ("state[]", "available".to_string()),
            ("state[]", "completed".to_string()),
            ("include[]", "term".to_string()),
            ("include[]", "concluded".to_string()),
            ("include[]", "enrollment_term".to_string()),
            ("per_page", self.per_page.to_string()),
        ];

        let items = match self.executor.get_paginated("/api/v1/courses", &query).await {
            Ok(items) => items,
            Err(e) => {
                log_fetch_failure("获取课程列表", "-", &e);
                return Vec::new();
            }
        };

        let mut courses: Vec<CourseSummary> = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawCourse>(item) {
                Ok(raw) => Some(raw.into_summary()),
                Err(e) => {
                    warn!("⚠️ 跳过无法解析的课程: {}", e);
                    None
                }
            })
            .collect();

        sort_courses_desc(&mut courses);
        info!("📚 获取到 {} 门课程", courses.len());
        courses
    }

    async fn resolve_student(&self, course_id: &str, student_number: &str) -> Option<String> {
        let sis_user_id = format!("{}{}", self.student_id_prefix, student_number);
        let people = self.enrolled_people(course_id).await;

        let found = people
            .iter()
            .find(|p| p.sis_user_id.as_deref() == Some(sis_user_id.as_str()))
            .map(|p| p.remote_id.clone());

        match &found {
            Some(remote_id) => debug!("学号 {} → 用户 {}", student_number, remote_id),
            None => debug!("课程 {} 中找不到 {}", course_id, sis_user_id),
        }
        found
    }

    async fn list_assessments(&self, course_id: &str, published_only: bool) -> Vec<Assessment> {
        let path = format!("/api/v1/courses/{}/assignments", course_id);
        let items = match self.executor.get_paginated(&path, &self.per_page_query()).await {
            Ok(items) => items,
            Err(e) => {
                log_fetch_failure("获取测验列表", course_id, &e);
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<Assessment>(item).ok())
            .filter(|a| !published_only || a.published)
            .collect()
    }

    async fn get_time_budget_minutes(&self, course_id: &str, assessment_id: &str) -> Option<u32> {
        let quiz_id = self.quiz_id(course_id, assessment_id).await?;

        let path = format!("/api/v1/courses/{}/quizzes/{}", course_id, quiz_id);
        let quiz = match self.executor.get_json(&path, &[]).await {
            Ok(value) => value,
            Err(e) => {
                log_fetch_failure("获取测验详情", course_id, &e);
                return None;
            }
        };

        let minutes = match quiz.get("time_limit") {
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|m| u32::try_from(m).ok()),
            _ => None,
        };

        debug!("测验 {} 时长: {:?} 分钟", assessment_id, minutes);
        minutes
    }

    async fn submit_adjustments(
        &self,
        course_id: &str,
        assessment_id: &str,
        batch: &[AssessmentAdjustment],
    ) -> bool {
        if batch.is_empty() {
            return true;
        }

        let Some(quiz_id) = self.quiz_id(course_id, assessment_id).await else {
            error!("❌ 作业 {} 无法提交额外时间：不是测验", assessment_id);
            return false;
        };

        let path = format!("/api/v1/courses/{}/quizzes/{}/extensions", course_id, quiz_id);
        let body = json!({ "quiz_extensions": batch });

        match self.executor.post_json(&path, &body).await {
            Ok(_) => {
                info!("✓ 测验 {} 已提交 {} 条额外时间", assessment_id, batch.len());
                true
            }
            Err(e) => {
                error!("❌ 测验 {} 提交失败: {}", assessment_id, e);
                false
            }
        }
    }

    async fn verify_enrollment(&self, course_id: &str, candidates: &[String]) -> Vec<String> {
        let people = self.enrolled_people(course_id).await;
        let enrolled: HashSet<&str> = people.iter().map(|p| p.remote_id.as_str()).collect();

        let active: Vec<String> = candidates
            .iter()
            .filter(|id| enrolled.contains(id.as_str()))
            .cloned()
            .collect();

        if active.len() < candidates.len() {
            info!(
                "👥 {} 名学生已不在课程 {} 中",
                candidates.len() - active.len(),
                course_id
            );
        }
        active
    }
}

// ========== 日志辅助函数 ==========

fn log_fetch_failure(action: &str, course_id: &str, err: &crate::infrastructure::FetchError) {
    if err.is_transient() {
        error!("❌ {}失败（课程 {}，可能是暂时性故障）: {}", action, course_id, err);
    } else {
        warn!("⚠️ {}失败（课程 {}）: {}", action, course_id, err);
    }
}
