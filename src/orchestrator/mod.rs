//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把各层能力组合成对外的操作，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理课程列表（刷新、选择、配置）
//! - 扫描文档 / 导入表格后合并名单
//! - 查询名单和测验
//! - 持有目录客户端
//!
//! ### `adjustment_submitter` - 额外时间提交
//! - 逐个测验查询时长、计算、提交
//! - 注册状态每次调用只核对一次
//! - 单个测验失败不影响其他测验
//!
//! ## 层次关系
//!
//! ```text
//! app (课程 / 名单 / 测验操作)
//!     ↓
//! adjustment_submitter (Vec<测验>)
//!     ↓
//! workflow::ReconciliationEngine / compute_adjustments
//!     ↓
//! services (能力层：extract / roster / documents)
//!     ↓
//! clients::Directory → infrastructure (HttpExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：app 管操作入口，submitter 管批量提交
//! 2. **资源隔离**：只有编排层持有 DirectoryClient
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure

pub mod adjustment_submitter;
pub mod app;

// 重新导出主要类型
pub use adjustment_submitter::{AdjustmentSubmitter, AssessmentOutcome, SubmissionReport};
pub use app::App;
