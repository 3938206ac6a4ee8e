//! # 数据模型模块
//!
//! 定义结构网格与 FEHM 输入卡片的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`vtk/` 和 `commands/` 使用
//! - 子模块: grid, deck

pub mod deck;
pub mod grid;

pub use deck::{Deck, Macro, ZoneRef};
pub use grid::{Axis, Grid};
