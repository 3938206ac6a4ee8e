//! # FEHM 日志扫描
//!
//! 模拟结束后扫描错误文件与输出文件中的失败关键字。
//!
//! ## 规则
//! - `fehmn.err` 含 `stopping` 或 `nan`（不区分大小写）视为失败
//! - `<root>.outp` 中含 `error` 的行仅作为警告
//! - 文件不存在不视为失败
//!
//! ## 依赖关系
//! - 被 `utils/fehm.rs`, `commands/inspect.rs` 使用

use crate::error::{FehmError, Result};

use std::fs;
use std::path::Path;

/// 错误文件名
pub const ERROR_FILE: &str = "fehmn.err";

/// 失败关键字
pub const FAILURE_KEYWORDS: [&str; 2] = ["stopping", "nan"];

/// 失败摘要最大长度
const EXCERPT_LEN: usize = 500;

/// 检测到的失败
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub keyword: String,
    pub excerpt: String,
}

/// 扫描错误文件文本
pub fn scan_error_text(text: &str) -> Option<Failure> {
    let lower = text.to_lowercase();
    FAILURE_KEYWORDS
        .iter()
        .find(|k| lower.contains(**k))
        .map(|k| Failure {
            keyword: k.to_string(),
            excerpt: text.chars().take(EXCERPT_LEN).collect(),
        })
}

/// 扫描错误文件
pub fn scan_error_file(path: &Path) -> Result<Option<Failure>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| FehmError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(scan_error_text(&text))
}

/// 输出文件中含 `error` 的行
pub fn scan_output_text(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| l.to_lowercase().contains("error"))
        .map(|l| l.trim().to_string())
        .collect()
}

/// 扫描输出文件
pub fn scan_output_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let text = fs::read_to_string(path).map_err(|e| FehmError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(scan_output_text(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopping_detected() {
        let f = scan_error_text("Timestep less than daymin\nSTOPPING execution").unwrap();
        assert_eq!(f.keyword, "stopping");
    }

    #[test]
    fn test_nan_detected() {
        let f = scan_error_text("residual = NaN at node 12").unwrap();
        assert_eq!(f.keyword, "nan");
        assert!(scan_error_text("residual = nan").is_some());
    }

    #[test]
    fn test_nan_variants_detected() {
        assert_eq!(scan_error_text("pressure -nan(ind)").unwrap().keyword, "nan");
        assert_eq!(scan_error_text("value NaNQ").unwrap().keyword, "nan");
        assert!(scan_error_text("converged").is_none());
        assert!(scan_error_text("").is_none());
    }

    #[test]
    fn test_output_error_lines() {
        let lines = scan_output_text("ok\n  Error in zone 3\nfine\nmass balance ERROR\n");
        assert_eq!(lines, vec!["Error in zone 3", "mass balance ERROR"]);
    }

    #[test]
    fn test_missing_files_are_clean() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_error_file(&dir.path().join(ERROR_FILE)).unwrap().is_none());
        assert!(scan_output_file(&dir.path().join("x.outp")).unwrap().is_empty());
    }
}
