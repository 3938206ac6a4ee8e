//! # export 子命令 CLI 定义
//!
//! 将已完成的模拟工作目录导出为可视化格式。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/export.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// export 主命令参数
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub command: ExportCommands,
}

/// export 子命令
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Write a legacy VTK unstructured grid and a ParaView startup script
    Vtk(VtkArgs),
}

/// VTK 导出参数
#[derive(Args, Debug)]
pub struct VtkArgs {
    /// Simulation work directory (contains grid.inp and contour files)
    #[arg(long)]
    pub work_dir: PathBuf,

    /// Output root name used for the simulation
    #[arg(long)]
    pub root: String,

    /// Uniform permeability kx,ky,kz (m²) written as node data
    #[arg(long)]
    pub perm: Option<String>,

    /// Output VTK file (default: <work-dir>/<root>.vtk)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip contour snapshots, export geometry and permeability only
    #[arg(long, default_value_t = false)]
    pub no_contours: bool,
}
