use accommodation_roster::config::Config;
use accommodation_roster::orchestrator::App;
use accommodation_roster::utils::logging;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "accommodation-roster")]
#[command(about = "维护考试照顾名单并为限时测验设置额外时间")]
#[command(version)]
struct Cli {
    /// 课程 ID
    #[arg(long, short = 'c', global = true, env = "ROSTER_COURSE")]
    course: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 列出已管理的课程
    Courses {
        /// 先从目录服务刷新
        #[arg(long)]
        refresh: bool,
        /// 包括已结束的课程
        #[arg(long)]
        all: bool,
    },
    /// 设置课程的文档文件夹或名单文件
    Configure {
        #[arg(long)]
        folder: Option<PathBuf>,
        #[arg(long)]
        roster: Option<PathBuf>,
    },
    /// 扫描文档并更新名单
    Update,
    /// 导入批量导出的 CSV 并更新名单
    Import { file: PathBuf },
    /// 显示课程名单
    Roster,
    /// 修正某个学生的每小时额外分钟数
    Correct { student_number: String, minutes: u32 },
    /// 列出课程的测验
    Assessments {
        /// 包括未发布的测验
        #[arg(long)]
        all: bool,
    },
    /// 预览某个测验的额外时间
    Preview { assessment: String },
    /// 为测验提交额外时间
    Apply {
        #[arg(required = true)]
        assessments: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    let log_file = Some(config.log_file.as_str())
        .filter(|f| !f.is_empty())
        .map(Path::new);
    logging::init(log_file)?;

    let mut app = App::initialize(config)
        .await
        .context("初始化失败")?;

    run(&mut app, cli).await
}

async fn run(app: &mut App, cli: Cli) -> Result<()> {
    let course = cli.course.as_deref();

    match cli.command {
        Command::Courses { refresh, all } => {
            if refresh {
                app.refresh_courses().await?;
            }
            for course in app.list_courses(!all) {
                println!("{}", course.label());
            }
        }
        Command::Configure { folder, roster } => {
            let ctx = app.select_course(course)?;
            let ctx = app.configure_course(&ctx, folder, roster).await?;
            println!("{}", ctx.label());
            if let Some(folder) = &ctx.document_folder {
                println!("  文档文件夹: {}", folder.display());
            }
            println!("  名单文件: {}", ctx.roster_file.display());
        }
        Command::Update => {
            let ctx = app.select_course(course)?;
            let stats = app.update_roster_from_documents(&ctx).await?;
            println!(
                "新增 {} / 已存在 {} / 未找到 {}",
                stats.new, stats.already_present, stats.skipped_unresolved
            );
        }
        Command::Import { file } => {
            let ctx = app.select_course(course)?;
            let stats = app
                .import_export(&ctx, &file)
                .await
                .with_context(|| format!("导入失败: {}", file.display()))?;
            println!(
                "新增 {} / 已存在 {} / 未找到 {}",
                stats.new, stats.already_present, stats.skipped_unresolved
            );
        }
        Command::Roster => {
            let ctx = app.select_course(course)?;
            let roster = app.view_roster(&ctx).await?;
            for record in &roster {
                println!(
                    "{}\t{}\t{}\t{}",
                    record.given_name,
                    record.family_name,
                    record.student_number,
                    record.extra_minutes_per_hour
                );
            }
            println!("共 {} 人", roster.len());
        }
        Command::Correct {
            student_number,
            minutes,
        } => {
            let ctx = app.select_course(course)?;
            if !app
                .correct_extra_minutes(&ctx, &student_number, minutes)
                .await?
            {
                anyhow::bail!("名单中没有学号 {}", student_number);
            }
        }
        Command::Assessments { all } => {
            let ctx = app.select_course(course)?;
            for assessment in app.list_assessments(&ctx, !all).await {
                println!("{}\t{}", assessment.id, assessment.name);
            }
        }
        Command::Preview { assessment } => {
            let ctx = app.select_course(course)?;
            for adjustment in app.preview_adjustments(&ctx, &assessment).await? {
                println!("{}\t+{} 分钟", adjustment.remote_id, adjustment.extra_minutes);
            }
        }
        Command::Apply { assessments } => {
            let ctx = app.select_course(course)?;
            let report = app.apply_extra_time(&ctx, &assessments).await?;
            for (assessment_id, outcome) in &report.outcomes {
                println!("{}\t{}", assessment_id, outcome);
            }
            if report.failed() > 0 {
                anyhow::bail!("{} 个测验提交失败", report.failed());
            }
        }
    }

    Ok(())
}
