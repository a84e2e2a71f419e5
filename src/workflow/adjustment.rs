//! 额外时间计算
//!
//! 额外分钟 = floor(每小时额外分钟 × 测验时长 / 60 + 0.5)

use crate::models::{AssessmentAdjustment, Roster};
use std::collections::HashSet;

/// 单个学生的额外分钟数（四舍五入，0.5 进位）
pub fn extra_minutes(extra_minutes_per_hour: u32, time_budget_minutes: u32) -> u32 {
    // 整数运算：floor(x / 60 + 0.5) == (x + 30) / 60
    let scaled = u64::from(extra_minutes_per_hour) * u64::from(time_budget_minutes);
    u32::try_from((scaled + 30) / 60).unwrap_or(u32::MAX)
}

/// 为仍在课程中的学生计算额外时间
///
/// 没有目录 ID 或已不在 `active_remote_ids` 中的学生不会出现在结果里。
/// 时长为 0 时每人得到 0 分钟，而不是被跳过。
pub fn compute_adjustments(
    roster: &Roster,
    active_remote_ids: &[String],
    time_budget_minutes: u32,
) -> Vec<AssessmentAdjustment> {
    let active: HashSet<&str> = active_remote_ids.iter().map(String::as_str).collect();

    roster
        .iter()
        .filter_map(|record| {
            let remote_id = record.remote_id.as_deref()?;
            if !active.contains(remote_id) {
                return None;
            }
            Some(AssessmentAdjustment {
                remote_id: remote_id.to_string(),
                extra_minutes: extra_minutes(record.extra_minutes_per_hour, time_budget_minutes),
            })
        })
        .collect()
}
