//! # inspect 子命令 CLI 定义
//!
//! 查看模拟器输出文件：历史曲线、等值线快照和日志扫描。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// inspect 主命令参数
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(subcommand)]
    pub command: InspectCommands,
}

/// inspect 子命令
#[derive(Subcommand, Debug)]
pub enum InspectCommands {
    /// Print a history (*_his.dat) file as a table
    History(HistoryArgs),

    /// List contour snapshot times and columns
    Contour(ContourArgs),

    /// Scan work directories for simulator failures
    Log(LogArgs),
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// History file
    pub file: PathBuf,

    /// Number of rows shown at the start and end of the series
    #[arg(long, default_value_t = 5)]
    pub rows: usize,
}

#[derive(Args, Debug)]
pub struct ContourArgs {
    /// Simulation work directory
    #[arg(long)]
    pub work_dir: PathBuf,

    /// Output root name used for the simulation
    #[arg(long)]
    pub root: String,

    /// Print every column for this node at each snapshot time
    #[arg(long)]
    pub node: Option<usize>,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Directory (or single file) to scan
    pub dir: PathBuf,

    /// File name patterns to scan, comma separated
    #[arg(long, default_value = "fehmn.err,*.outp")]
    pub pattern: String,

    /// Do not descend into subdirectories
    #[arg(long, default_value_t = false)]
    pub no_recursive: bool,
}
