/// 日志工具模块
///
/// 初始化 tracing 订阅器，并提供统计信息的输出函数
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///
/// # 参数
/// - `log_file`: 额外写入的日志文件，None 表示只输出到终端
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer().with_target(true).with_line_number(true);

    let file_layer = match log_file {
        Some(path) => {
            init_log_file(path)?;
            let file = OpenOptions::new()
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;
    Ok(())
}

/// 初始化测试环境的日志系统
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// 写入日志文件头（覆盖旧文件）
fn init_log_file(log_file_path: &Path) -> Result<()> {
    let log_header = format!(
        "{}\n额外时间处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(api_base_url: &str, course_count: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考试额外时间管理");
    info!("🌐 目录服务: {}", api_base_url);
    info!("📚 已管理课程: {} 门", course_count);
    info!("{}", "=".repeat(60));
}

/// 打印名单合并统计
///
/// # 参数
/// - `course_label`: 课程显示名
/// - `new`: 新增人数
/// - `skipped_unresolved`: 目录中找不到的人数
/// - `already_present`: 名单中已存在的人数
pub fn log_reconcile_summary(
    course_label: &str,
    new: usize,
    skipped_unresolved: usize,
    already_present: usize,
) {
    info!("\n{}", "─".repeat(60));
    info!("📋 名单更新完成: {}", course_label);
    info!("✅ 新增: {}", new);
    info!("⏭️ 已存在: {}", already_present);
    info!("❓ 未找到（可能未注册本课程）: {}", skipped_unresolved);
    info!("{}", "─".repeat(60));
}

/// 打印额外时间提交统计
pub fn log_submission_summary(applied: usize, skipped: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 额外时间提交统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 已应用: {}/{}", applied, total);
    info!("⏭️ 已跳过: {}", skipped);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
