//! # 批量处理模块
//!
//! 提供独立校验任务的并行执行与输出文件收集。
//!
//! ## 功能
//! - 并行运行相互独立的模拟任务
//! - 递归收集日志文件
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `commands/verify/` 和 `commands/inspect.rs` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner, ProcessResult};
