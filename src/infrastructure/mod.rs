//! 基础设施层
//!
//! 只持有外部资源（HTTP 客户端、外部工具），不认识课程和名单。

pub mod http_executor;
pub mod pdf_text;

pub use http_executor::{FetchError, HttpExecutor};
pub use pdf_text::pdf_to_text;
