//! 额外时间批量提交 - 编排层
//!
//! ## 职责
//!
//! 对一批测验逐个：查时长 → 计算 → 提交。
//!
//! ## 设计特点
//!
//! - 注册状态在一次调用中只核对一次，所有测验共用
//! - 单个测验失败不影响其他测验，也不自动重试
//! - 不读写名单文件，名单由调用方传入

use crate::clients::Directory;
use crate::models::Roster;
use crate::workflow::{compute_adjustments, CourseCtx};
use std::fmt;
use tracing::{error, info, warn};

/// 单个测验的提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentOutcome {
    /// 已提交，附带人数
    Applied(usize),
    /// 测验不限时
    SkippedNoTimeLimit,
    /// 没有符合条件的学生
    SkippedNoEligibleStudents,
    /// 提交失败
    Failed,
}

impl AssessmentOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            AssessmentOutcome::SkippedNoTimeLimit | AssessmentOutcome::SkippedNoEligibleStudents
        )
    }
}

impl fmt::Display for AssessmentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentOutcome::Applied(count) => write!(f, "已应用 ({} 人)", count),
            AssessmentOutcome::SkippedNoTimeLimit => write!(f, "跳过：不限时"),
            AssessmentOutcome::SkippedNoEligibleStudents => write!(f, "跳过：无符合条件的学生"),
            AssessmentOutcome::Failed => write!(f, "失败"),
        }
    }
}

/// 一次批量提交的结果，顺序与输入一致
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub outcomes: Vec<(String, AssessmentOutcome)>,
}

impl SubmissionReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, AssessmentOutcome::Applied(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(AssessmentOutcome::is_skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| *o == AssessmentOutcome::Failed)
    }

    pub fn outcome(&self, assessment_id: &str) -> Option<AssessmentOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == assessment_id)
            .map(|(_, o)| *o)
    }

    fn count(&self, pred: impl Fn(&AssessmentOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// 额外时间提交器
pub struct AdjustmentSubmitter<'a> {
    directory: &'a dyn Directory,
}

impl<'a> AdjustmentSubmitter<'a> {
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// 为多个测验提交额外时间
    pub async fn apply_to_assessments(
        &self,
        ctx: &CourseCtx,
        assessment_ids: &[String],
        roster: &Roster,
    ) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        // 第一次需要时才核对注册状态
        let mut active_ids: Option<Vec<String>> = None;

        for assessment_id in assessment_ids {
            let Some(budget) = self
                .directory
                .get_time_budget_minutes(&ctx.course_id, assessment_id)
                .await
            else {
                warn!("{} ⏭️ 测验 {} 不限时，跳过", ctx, assessment_id);
                report
                    .outcomes
                    .push((assessment_id.clone(), AssessmentOutcome::SkippedNoTimeLimit));
                continue;
            };

            if active_ids.is_none() {
                let verified = self
                    .directory
                    .verify_enrollment(&ctx.course_id, &roster.remote_ids())
                    .await;
                info!("{} 👥 仍在课程中的学生: {}", ctx, verified.len());
                active_ids = Some(verified);
            }
            let active = active_ids.as_deref().unwrap_or_default();

            let adjustments = compute_adjustments(roster, active, budget);
            if adjustments.is_empty() {
                warn!("{} ⏭️ 测验 {} 没有符合条件的学生", ctx, assessment_id);
                report.outcomes.push((
                    assessment_id.clone(),
                    AssessmentOutcome::SkippedNoEligibleStudents,
                ));
                continue;
            }

            info!(
                "{} 📤 测验 {} (时长 {} 分钟): 提交 {} 人",
                ctx,
                assessment_id,
                budget,
                adjustments.len()
            );

            let outcome = if self
                .directory
                .submit_adjustments(&ctx.course_id, assessment_id, &adjustments)
                .await
            {
                AssessmentOutcome::Applied(adjustments.len())
            } else {
                error!("{} ❌ 测验 {} 提交失败", ctx, assessment_id);
                AssessmentOutcome::Failed
            };
            report.outcomes.push((assessment_id.clone(), outcome));
        }

        report
    }
}
