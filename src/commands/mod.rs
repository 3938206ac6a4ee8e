//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `reference/`, `utils/`, `vtk/`
//! - 子模块: verify, export, inspect

pub mod export;
pub mod inspect;
pub mod verify;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Verify(args) => verify::execute(args),
        Commands::Export(args) => export::execute(args),
        Commands::Inspect(args) => inspect::execute(args),
    }
}
