//! 名单合并流程 - 流程层
//!
//! 核心职责：把新提取的记录合并进课程名单
//!
//! 每条记录的处理顺序：
//! 1. 学号已在名单中 → 保持不变
//! 2. 在目录中查找 ID → 找到则追加
//! 3. 找不到 → 跳过（多半是没注册这门课）
//!
//! 合并只追加，已有记录的 ID 和额外时间不会被改动，
//! 所以同样的输入重复运行结果不变。

use tracing::{info, warn};

use crate::clients::Directory;
use crate::error::AppResult;
use crate::models::{AccommodationRecord, Roster};
use crate::workflow::course_ctx::CourseCtx;

/// 合并统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// 新增
    pub new: usize,
    /// 目录中找不到
    pub skipped_unresolved: usize,
    /// 名单中已存在
    pub already_present: usize,
}

impl ReconcileStats {
    pub fn total(&self) -> usize {
        self.new + self.skipped_unresolved + self.already_present
    }
}

/// 名单合并引擎
///
/// - 不持有名单，名单由调用方传入
/// - 只通过 Directory 查询身份
/// - 合并完成后整体写回名单文件
pub struct ReconciliationEngine<'a> {
    directory: &'a dyn Directory,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// 合并并持久化
    pub async fn reconcile(
        &self,
        ctx: &CourseCtx,
        existing: Roster,
        extracted: Vec<AccommodationRecord>,
    ) -> AppResult<(Roster, ReconcileStats)> {
        let (roster, stats) = self.merge(ctx, existing, extracted).await;
        ctx.roster_store().rewrite(&roster).await?;
        Ok((roster, stats))
    }

    /// 只合并，不写文件
    pub async fn merge(
        &self,
        ctx: &CourseCtx,
        existing: Roster,
        extracted: Vec<AccommodationRecord>,
    ) -> (Roster, ReconcileStats) {
        let mut roster = existing;
        let mut stats = ReconcileStats::default();

        for mut record in extracted {
            if roster.contains(&record.student_number) {
                info!("{} 已在名单中: {}", ctx, record.display_name());
                stats.already_present += 1;
                continue;
            }

            match self
                .directory
                .resolve_student(&ctx.course_id, &record.student_number)
                .await
            {
                Some(remote_id) => {
                    record.remote_id = Some(remote_id);
                    info!("{} ✅ 新增学生: {}", ctx, record);
                    roster.insert(record);
                    stats.new += 1;
                }
                None => {
                    warn!(
                        "{} ⚠️ 找不到学生 {} ({})，可能未注册本课程",
                        ctx,
                        record.display_name(),
                        record.student_number
                    );
                    stats.skipped_unresolved += 1;
                }
            }
        }

        (roster, stats)
    }
}
