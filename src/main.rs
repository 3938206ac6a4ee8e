//! # fehm-verify - FEHM 模拟器校验工具
//!
//! 生成 FEHM 输入卡片、运行模拟器、解析输出，并与解析解 / ODE 参考解比较。
//!
//! ## 子命令
//! - `verify` - 校验案例
//!   - `diffusion` - 一维热传导 / Darcy 扩散收敛性研究
//!   - `block` - 单块体质量与热量守恒
//!   - `co2-injection`, `co2-vs-water`, `co2-column`, `co2-static` - CO2 模块
//! - `export` - VTK 导出与 ParaView 启动脚本
//! - `inspect` - 查看历史、快照和日志
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── models/    (网格与输入卡片)
//!   │     ├── parsers/   (输出解析器)
//!   │     ├── reference/ (参考解)
//!   │     └── vtk/       (可视化导出)
//!   ├── batch/      (并行执行与文件收集)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod reference;
mod utils;
mod vtk;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
