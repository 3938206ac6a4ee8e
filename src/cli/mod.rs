//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `verify`: 校验案例（嵌套子命令）
//!   - `diffusion`, `block`, `co2-injection`, `co2-vs-water`, `co2-column`, `co2-static`
//! - `export`: 可视化导出
//!   - `vtk`: VTK 非结构网格 + ParaView 启动脚本
//! - `inspect`: 查看模拟器输出
//!   - `history`, `contour`, `log`
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: verify, export, inspect

pub mod export;
pub mod inspect;
pub mod verify;

use clap::{Parser, Subcommand};
use std::str::FromStr;

/// fehm-verify - FEHM 模拟器校验工具
#[derive(Parser)]
#[command(name = "fehm-verify")]
#[command(version)]
#[command(
    about = "Verification harness for the FEHM subsurface flow and heat simulator",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run verification cases against analytical or ODE references
    Verify(verify::VerifyArgs),

    /// Export simulator results for visualization
    Export(export::ExportArgs),

    /// Inspect simulator output files
    Inspect(inspect::InspectArgs),
}

/// 解析逗号分隔的列表（如 "21,51,101"）
pub fn parse_list<T: FromStr>(input: &str) -> Result<Vec<T>, String> {
    let items: Vec<T> = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| format!("'{}' is not a valid entry in '{}'", s, input))
        })
        .collect::<Result<_, _>>()?;
    if items.is_empty() {
        return Err(format!("'{}' is empty", input));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list::<usize>("21, 51,101").unwrap(), vec![21, 51, 101]);
        assert_eq!(parse_list::<f64>("1e-12,1e-13").unwrap(), vec![1e-12, 1e-13]);
        assert!(parse_list::<usize>("21,x").is_err());
        assert!(parse_list::<usize>(" , ").is_err());
    }

    #[test]
    fn test_parse_verify_with_global_flags() {
        let cli = Cli::try_parse_from([
            "fehm-verify",
            "verify",
            "--dry-run",
            "diffusion",
            "--resolutions",
            "11,21",
            "--jobs",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify(args) => {
                assert!(args.common.dry_run);
                assert_eq!(args.common.jobs, 2);
                match args.case {
                    verify::VerifyCase::Diffusion(d) => assert_eq!(d.resolutions, "11,21"),
                    _ => panic!("expected diffusion"),
                }
            }
            _ => panic!("expected verify"),
        }
    }
}
