//! # 解析器模块
//!
//! 提供 FEHM 网格文件和模拟输出（历史、快照、日志）的解析器。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: grid_inp, history, contour, log

pub mod contour;
pub mod grid_inp;
pub mod history;
pub mod log;

use crate::error::{FehmError, Result};
use std::path::Path;

/// 输出文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    History,
    Contour,
    Grid,
    ErrorLog,
    Output,
}

/// 从文件名推断输出类型
pub fn detect_output_kind(path: &Path) -> Result<OutputKind> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if name.ends_with("_his.dat") {
        Ok(OutputKind::History)
    } else if name.ends_with("_sca_node.csv") {
        Ok(OutputKind::Contour)
    } else if name == log::ERROR_FILE {
        Ok(OutputKind::ErrorLog)
    } else if name.ends_with(".outp") {
        Ok(OutputKind::Output)
    } else if name.ends_with(".inp") {
        Ok(OutputKind::Grid)
    } else {
        Err(FehmError::InvalidArgument(format!(
            "Cannot determine FEHM output type for: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_output_kind() {
        let kind = |s: &str| detect_output_kind(Path::new(s)).ok();
        assert_eq!(kind("a/run_presWAT_his.dat"), Some(OutputKind::History));
        assert_eq!(kind("run.1.0_days_sca_node.csv"), Some(OutputKind::Contour));
        assert_eq!(kind("fehmn.err"), Some(OutputKind::ErrorLog));
        assert_eq!(kind("run.outp"), Some(OutputKind::Output));
        assert_eq!(kind("grid.inp"), Some(OutputKind::Grid));
        assert_eq!(kind("notes.txt"), None);
    }
}
