//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 对外暴露全部操作，调用方（命令行或界面）只和 `App` 打交道。
//!
//! ## 核心功能
//!
//! 1. **初始化**：校验配置、加载课程列表、创建目录客户端
//! 2. **课程管理**：刷新、列出、选择、配置课程
//! 3. **名单更新**：扫描文档或导入表格，然后合并
//! 4. **额外时间**：预览并批量提交
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有目录客户端和课程列表的模块
//! - **向下委托**：合并交给 workflow，提交交给 AdjustmentSubmitter
//! - **只在本层区分**前置条件错误（未选课程、无文档、名单为空）

use crate::clients::{Directory, DirectoryClient};
use crate::config::Config;
use crate::error::{AppResult, PreconditionError};
use crate::models::{
    load_course_registry, save_course_registry, AccommodationRecord, Assessment,
    AssessmentAdjustment, CourseConfig, CourseRegistry, Roster,
};
use crate::orchestrator::adjustment_submitter::{AdjustmentSubmitter, SubmissionReport};
use crate::services::{read_export_rows, DocumentSource, ExtractionInput, TextExtractor};
use crate::utils::logging;
use crate::workflow::{compute_adjustments, CourseCtx, ReconcileStats, ReconciliationEngine};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    registry: CourseRegistry,
    directory: Box<dyn Directory>,
    extractor: TextExtractor,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        let registry = load_course_registry(&config.course_registry_file).await?;
        let directory = DirectoryClient::new(&config)?;

        logging::log_startup(&config.api_base_url, registry.courses.len());

        Self::with_directory(config, registry, Box::new(directory))
    }

    /// 使用指定的目录服务创建（测试用内存实现）
    pub fn with_directory(
        config: Config,
        registry: CourseRegistry,
        directory: Box<dyn Directory>,
    ) -> AppResult<Self> {
        Ok(Self {
            config,
            registry,
            directory,
            extractor: TextExtractor::new()?,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &CourseRegistry {
        &self.registry
    }

    // ========== 课程管理 ==========

    /// 从目录服务刷新课程列表并保存
    pub async fn refresh_courses(&mut self) -> AppResult<usize> {
        info!("\n📚 正在获取课程列表...");
        let courses = self.directory.list_courses().await;
        if courses.is_empty() {
            warn!("⚠️ 没有获取到任何课程，课程列表保持不变");
            return Ok(0);
        }

        for course in &courses {
            self.registry.add_course(CourseConfig::new(
                &course.id,
                &course.name,
                course.effective_end_at.clone(),
                &self.config.data_dir,
            ));
        }
        self.save_registry().await?;

        info!("✓ 已更新 {} 门课程", courses.len());
        Ok(courses.len())
    }

    /// 已管理的课程，按显示名排序
    pub fn list_courses(&self, current_only: bool) -> Vec<&CourseConfig> {
        self.registry.list(current_only, Utc::now())
    }

    /// 选择课程
    pub fn select_course(&self, course_id: Option<&str>) -> AppResult<CourseCtx> {
        let course_id = course_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(PreconditionError::NoCourseSelected)?;

        let course = self
            .registry
            .get(course_id)
            .ok_or_else(|| PreconditionError::UnknownCourse {
                course_id: course_id.to_string(),
            })?;

        let ctx = CourseCtx::from_config(course);
        info!("📘 当前课程: {}", ctx.label());
        Ok(ctx)
    }

    /// 设置课程的文档文件夹和名单路径
    pub async fn configure_course(
        &mut self,
        ctx: &CourseCtx,
        document_folder: Option<PathBuf>,
        roster_file: Option<PathBuf>,
    ) -> AppResult<CourseCtx> {
        let course = self
            .registry
            .get_mut(&ctx.course_id)
            .ok_or_else(|| PreconditionError::UnknownCourse {
                course_id: ctx.course_id.clone(),
            })?;

        if let Some(folder) = document_folder {
            course.document_folder = Some(folder);
        }
        if let Some(file) = roster_file {
            course.roster_file = file;
        }
        let updated = CourseCtx::from_config(course);

        self.save_registry().await?;
        info!("✓ 课程 {} 配置已保存", updated.label());
        Ok(updated)
    }

    async fn save_registry(&self) -> AppResult<()> {
        save_course_registry(&self.config.course_registry_file, &self.registry).await
    }

    fn document_source(&self) -> DocumentSource {
        let shared = self
            .registry
            .shared_document_folder
            .clone()
            .unwrap_or_else(|| self.config.shared_document_folder.clone());
        DocumentSource::new(Some(shared))
    }

    // ========== 名单更新 ==========

    /// 扫描文档并更新名单
    pub async fn update_roster_from_documents(&self, ctx: &CourseCtx) -> AppResult<ReconcileStats> {
        let source = self.document_source();
        let files = source.document_files(ctx.document_folder.as_deref()).await;
        if files.is_empty() {
            return Err(PreconditionError::NoDocumentSource {
                course_id: ctx.course_id.clone(),
            }
            .into());
        }

        info!("{} 📄 开始处理 {} 份文档...", ctx, files.len());
        let existing = ctx.roster_store().load().await?;

        let mut extracted = Vec::new();
        for path in &files {
            let name = file_label(path);
            match source.read_text(path).await {
                Ok(text) => {
                    if let Some(record) = self.extractor.extract_free_text(&name, &text) {
                        extracted.push(record);
                    }
                }
                Err(e) => warn!("⚠️ [{}] 无法读取，跳过: {}", name, e),
            }
        }
        info!(
            "{} 已处理 {} 份文档，识别出 {} 名学生",
            ctx,
            files.len(),
            extracted.len()
        );

        self.reconcile(ctx, existing, extracted).await
    }

    /// 导入批量导出的表格并更新名单
    pub async fn import_export(&self, ctx: &CourseCtx, path: &Path) -> AppResult<ReconcileStats> {
        let rows = read_export_rows(path).await?;
        let existing = ctx.roster_store().load().await?;

        let extracted = self.extractor.extract(&ExtractionInput::Tabular(rows));
        info!("{} 导出文件中识别出 {} 名学生", ctx, extracted.len());

        self.reconcile(ctx, existing, extracted).await
    }

    async fn reconcile(
        &self,
        ctx: &CourseCtx,
        existing: Roster,
        extracted: Vec<AccommodationRecord>,
    ) -> AppResult<ReconcileStats> {
        let engine = ReconciliationEngine::new(self.directory.as_ref());
        let (_, stats) = engine.reconcile(ctx, existing, extracted).await?;
        logging::log_reconcile_summary(
            &ctx.label(),
            stats.new,
            stats.skipped_unresolved,
            stats.already_present,
        );
        Ok(stats)
    }

    /// 人工修正某个学生的每小时额外分钟数
    pub async fn correct_extra_minutes(
        &self,
        ctx: &CourseCtx,
        student_number: &str,
        minutes: u32,
    ) -> AppResult<bool> {
        let store = ctx.roster_store();
        let mut roster = store.load().await?;
        if !roster.correct_extra_minutes(student_number, minutes) {
            warn!("{} ⚠️ 名单中没有学号 {}", ctx, student_number);
            return Ok(false);
        }
        store.rewrite(&roster).await?;
        info!("{} ✓ 学号 {} 已改为每小时 {} 分钟", ctx, student_number, minutes);
        Ok(true)
    }

    // ========== 查询 ==========

    /// 读取课程名单
    pub async fn view_roster(&self, ctx: &CourseCtx) -> AppResult<Roster> {
        ctx.roster_store().load().await
    }

    pub async fn list_assessments(&self, ctx: &CourseCtx, published_only: bool) -> Vec<Assessment> {
        self.directory
            .list_assessments(&ctx.course_id, published_only)
            .await
    }

    // ========== 额外时间 ==========

    async fn load_non_empty_roster(&self, ctx: &CourseCtx) -> AppResult<Roster> {
        let roster = ctx.roster_store().load().await?;
        if roster.is_empty() {
            return Err(PreconditionError::EmptyRoster {
                course_id: ctx.course_id.clone(),
            }
            .into());
        }
        Ok(roster)
    }

    /// 预览单个测验的额外时间（不提交）
    pub async fn preview_adjustments(
        &self,
        ctx: &CourseCtx,
        assessment_id: &str,
    ) -> AppResult<Vec<AssessmentAdjustment>> {
        let roster = self.load_non_empty_roster(ctx).await?;
        let budget = self
            .directory
            .get_time_budget_minutes(&ctx.course_id, assessment_id)
            .await
            .ok_or_else(|| PreconditionError::NoTimeBudget {
                assessment_id: assessment_id.to_string(),
            })?;

        let active = self
            .directory
            .verify_enrollment(&ctx.course_id, &roster.remote_ids())
            .await;
        Ok(compute_adjustments(&roster, &active, budget))
    }

    /// 为多个测验提交额外时间
    pub async fn apply_extra_time(
        &self,
        ctx: &CourseCtx,
        assessment_ids: &[String],
    ) -> AppResult<SubmissionReport> {
        let roster = self.load_non_empty_roster(ctx).await?;

        let submitter = AdjustmentSubmitter::new(self.directory.as_ref());
        let report = submitter
            .apply_to_assessments(ctx, assessment_ids, &roster)
            .await;

        logging::log_submission_summary(
            report.applied(),
            report.skipped(),
            report.failed(),
            assessment_ids.len(),
        );
        Ok(report)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::fake_directory::FakeDirectory;
    use crate::error::AppError;
    use crate::models::CourseSummary;
    use crate::orchestrator::AssessmentOutcome;
    use crate::services::RosterStore;

    fn test_config(dir: &Path) -> Config {
        Config {
            access_token: "token".to_string(),
            shared_document_folder: dir.join("RAP"),
            data_dir: dir.to_path_buf(),
            course_registry_file: dir.join("courses.toml"),
            log_file: String::new(),
            ..Config::default()
        }
    }

    fn registry_with_course(dir: &Path) -> CourseRegistry {
        let mut registry = CourseRegistry::default();
        registry.add_course(CourseConfig::new("101", "Physics", None, dir));
        registry
    }

    fn app(dir: &Path, directory: FakeDirectory) -> App {
        App::with_directory(test_config(dir), registry_with_course(dir), Box::new(directory))
            .unwrap()
    }

    #[test]
    fn test_select_course_preconditions() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), FakeDirectory::default());

        let err = app.select_course(None).unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::NoCourseSelected)
        ));
        let err = app.select_course(Some("999")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::UnknownCourse { .. })
        ));
        assert_eq!(app.select_course(Some(" 101 ")).unwrap().course_id, "101");
    }

    #[tokio::test]
    async fn test_refresh_courses_saves_registry() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FakeDirectory {
            courses: vec![CourseSummary {
                id: "202".into(),
                name: "Chemistry".into(),
                term_start: None,
                effective_end_at: Some("2020-01-01T00:00:00Z".into()),
            }],
            ..Default::default()
        };
        let mut app = app(dir.path(), directory);

        assert_eq!(app.refresh_courses().await.unwrap(), 1);
        assert_eq!(app.list_courses(false).len(), 2);
        // 已结束的课程不在当前列表中
        assert_eq!(app.list_courses(true).len(), 1);

        let saved = load_course_registry(&dir.path().join("courses.toml"))
            .await
            .unwrap();
        assert!(saved.get("202").is_some());
    }

    #[tokio::test]
    async fn test_update_from_documents() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("RAP");
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(
            shared.join("a.txt"),
            "Student John DOE-SMITH 3456789\nExtra time 20 mins per hour",
        )
        .unwrap();
        std::fs::write(shared.join("b.txt"), "no useful content").unwrap();

        let app = app(dir.path(), FakeDirectory::default().with_student("3456789", "11"));
        let ctx = app.select_course(Some("101")).unwrap();

        let stats = app.update_roster_from_documents(&ctx).await.unwrap();
        assert_eq!(stats.new, 1);

        let roster = app.view_roster(&ctx).await.unwrap();
        assert_eq!(roster.get("3456789").unwrap().remote_id.as_deref(), Some("11"));
    }

    #[tokio::test]
    async fn test_update_without_documents_is_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), FakeDirectory::default());
        let ctx = app.select_course(Some("101")).unwrap();

        let err = app.update_roster_from_documents(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::NoDocumentSource { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_requires_roster() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), FakeDirectory::default().with_budget("q1", Some(60)));
        let ctx = app.select_course(Some("101")).unwrap();

        let err = app
            .apply_extra_time(&ctx, &["q1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::EmptyRoster { .. })
        ));
    }

    #[tokio::test]
    async fn test_preview_and_apply() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FakeDirectory::default()
            .with_student("1234567", "12")
            .with_budget("q1", Some(90))
            .with_budget("q2", None);
        let app = app(dir.path(), directory);
        let ctx = app.select_course(Some("101")).unwrap();

        let roster: Roster =
            vec![AccommodationRecord::new("Jane", "Doe", "1234567", 15).with_remote_id("12")]
                .into_iter()
                .collect();
        RosterStore::new(&ctx.roster_file)
            .rewrite(&roster)
            .await
            .unwrap();

        let preview = app.preview_adjustments(&ctx, "q1").await.unwrap();
        assert_eq!(preview[0].extra_minutes, 23);

        let err = app.preview_adjustments(&ctx, "q2").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::NoTimeBudget { .. })
        ));

        let report = app
            .apply_extra_time(&ctx, &["q1".to_string(), "q2".to_string()])
            .await
            .unwrap();
        assert_eq!(report.outcome("q1"), Some(AssessmentOutcome::Applied(1)));
        assert_eq!(
            report.outcome("q2"),
            Some(AssessmentOutcome::SkippedNoTimeLimit)
        );
    }

    #[tokio::test]
    async fn test_correct_extra_minutes() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), FakeDirectory::default());
        let ctx = app.select_course(Some("101")).unwrap();

        let roster: Roster = vec![AccommodationRecord::new("Jane", "Doe", "1234567", 15)]
            .into_iter()
            .collect();
        ctx.roster_store().rewrite(&roster).await.unwrap();

        assert!(app.correct_extra_minutes(&ctx, "1234567", 25).await.unwrap());
        assert!(!app.correct_extra_minutes(&ctx, "7654321", 25).await.unwrap());
        let roster = app.view_roster(&ctx).await.unwrap();
        assert_eq!(roster.get("1234567").unwrap().extra_minutes_per_hour, 25);
    }

    #[tokio::test]
    async fn test_configure_course_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app(dir.path(), FakeDirectory::default());
        let ctx = app.select_course(Some("101")).unwrap();

        let updated = app
            .configure_course(&ctx, Some(dir.path().join("phys")), None)
            .await
            .unwrap();
        assert_eq!(updated.document_folder, Some(dir.path().join("phys")));

        let saved = load_course_registry(&dir.path().join("courses.toml"))
            .await
            .unwrap();
        assert_eq!(
            saved.get("101").unwrap().document_folder,
            Some(dir.path().join("phys"))
        );
    }
}
