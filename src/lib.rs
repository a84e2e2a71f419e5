//! # Accommodation Roster
//!
//! 根据学生的考试照顾文件维护课程名单，并为限时测验批量设置额外时间
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `HttpExecutor` - 唯一的 HTTP 客户端持有者，提供 GET / 分页 GET / POST
//! - `pdf_text` - 调用 pdftotext 把扫描文档转成文字
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 课程目录服务
//! - `Directory` - 目录服务接口（课程、学生、测验、额外时间）
//! - `DirectoryClient` - HTTP 实现，按课程缓存注册名单
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `TextExtractor` - 从文档全文或导出表格中提取记录
//! - `RosterStore` - 名单 CSV 的读取和整体重写
//! - `DocumentSource` - 找到课程的扫描文档
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一次合并"和"一次计算"
//! - `CourseCtx` - 上下文封装（课程 ID + 名单路径）
//! - `ReconciliationEngine` - 只追加的名单合并
//! - `compute_adjustments` - 额外分钟计算
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/app` - 对外的全部操作
//! - `orchestrator/adjustment_submitter` - 多个测验的额外时间提交
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{Directory, DirectoryClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{FetchError, HttpExecutor};
pub use models::{AccommodationRecord, AssessmentAdjustment, Roster};
pub use orchestrator::{App, AssessmentOutcome, SubmissionReport};
pub use workflow::{CourseCtx, ReconcileStats};
