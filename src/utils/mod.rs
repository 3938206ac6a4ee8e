//! # 工具函数模块
//!
//! 提供美化输出、进度条、FEHM 调用与绘图等工具。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 子模块: output, progress, fehm, plot

pub mod fehm;
pub mod output;
pub mod plot;
pub mod progress;
