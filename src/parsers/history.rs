//! # FEHM 历史文件解析器
//!
//! 解析 Tecplot 格式的 `<root>_<var>_his.dat` 时间序列文件。
//!
//! ## 格式说明
//! ```text
//! TITLE = "..."
//! variables = "Time (days)" "Node 1" "Node 12"
//! zone t = "..."
//! 0.00000000  1.00000000  1.00000000
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/verify/`, `commands/inspect.rs` 使用
//! - 使用 `regex` 提取表头中的节点编号

use crate::error::{FehmError, Result};

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 单变量历史记录
#[derive(Debug, Clone, Default)]
pub struct History {
    /// 变量名（文件名后缀，如 presWAT）
    pub variable: String,
    /// 各列对应的节点编号
    pub nodes: Vec<usize>,
    /// 时间 (days)
    pub times: Vec<f64>,
    /// values[列][时间步]
    pub values: Vec<Vec<f64>>,
}

impl History {
    /// 某节点的时间序列
    pub fn series(&self, node: usize) -> Option<&[f64]> {
        let col = self.nodes.iter().position(|&n| n == node)?;
        self.values.get(col).map(|v| v.as_slice())
    }

    /// 第一列
    pub fn first_series(&self) -> Option<&[f64]> {
        self.values.first().map(|v| v.as_slice())
    }

    /// 某节点最后一个值
    pub fn last(&self, node: usize) -> Option<f64> {
        self.series(node).and_then(|s| s.last().copied())
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// 解析历史文件
pub fn parse_history(path: &Path) -> Result<History> {
    let content = fs::read_to_string(path).map_err(|e| FehmError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let variable = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(variable_from_file_name)
        .unwrap_or_default();

    let history = parse_history_content(&content, &variable);
    if history.is_empty() {
        return Err(FehmError::ParseError {
            format: "history".to_string(),
            path: path.display().to_string(),
            reason: "no numeric rows".to_string(),
        });
    }
    Ok(history)
}

/// 从字符串解析
pub fn parse_history_content(content: &str, variable: &str) -> History {
    let node_re = Regex::new(r"(?i)node\s*(\d+)").expect("valid regex");

    let mut history = History {
        variable: variable.to_string(),
        ..Default::default()
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let lower = trimmed.to_lowercase();
        if lower.starts_with("var") {
            history.nodes = node_re
                .captures_iter(trimmed)
                .filter_map(|c| c[1].parse().ok())
                .collect();
            continue;
        }
        if lower.starts_with("title") || lower.starts_with("text") || lower.starts_with("zone") {
            continue;
        }

        let parsed: std::result::Result<Vec<f64>, _> =
            trimmed.split_whitespace().map(|s| s.parse::<f64>()).collect();
        let Ok(row) = parsed else {
            continue;
        };
        if row.len() < 2 {
            continue;
        }

        if history.values.is_empty() {
            history.values = vec![Vec::new(); row.len() - 1];
        }
        if row.len() - 1 != history.values.len() {
            continue;
        }

        history.times.push(row[0]);
        for (col, v) in row[1..].iter().enumerate() {
            history.values[col].push(*v);
        }
    }

    if history.nodes.len() != history.values.len() {
        history.nodes = (1..=history.values.len()).collect();
    }

    history
}

/// 从 `<root>_<var>_his.dat` 中取出 `<var>`
fn variable_from_file_name(name: &str) -> String {
    let stem = name.strip_suffix("_his.dat").unwrap_or(name);
    stem.rsplit('_').next().unwrap_or(stem).to_string()
}

/// 历史文件路径
pub fn history_path(work_dir: &Path, root: &str, variable: &str) -> PathBuf {
    work_dir.join(format!("{}_{}_his.dat", root, variable))
}

/// 读取工作目录中 root 对应的全部历史文件
pub fn read_histories(work_dir: &Path, root: &str) -> Result<BTreeMap<String, History>> {
    let entries = fs::read_dir(work_dir).map_err(|e| FehmError::FileReadError {
        path: work_dir.display().to_string(),
        source: e,
    })?;

    let prefix = format!("{}_", root);
    let mut out = BTreeMap::new();

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(var) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix("_his.dat"))
        else {
            continue;
        };
        if let Ok(mut history) = parse_history(&entry.path()) {
            history.variable = var.to_string();
            out.insert(var.to_string(), history);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"TITLE = "mass_test history"
variables = "Time (days)" "Node 1" "Node 5"
zone t = "Liquid Pressure (MPa)"
0.00000000 1.00000000 1.00000000
0.50000000 1.49000000 1.48000000
text header garbage
1.00000000 1.99000000 1.98000000
"#;

    #[test]
    fn test_parse_multi_node() {
        let h = parse_history_content(SAMPLE, "presWAT");
        assert_eq!(h.nodes, vec![1, 5]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.series(5).unwrap(), &[1.0, 1.48, 1.98]);
        assert_eq!(h.last(1), Some(1.99));
        assert!(h.series(2).is_none());
    }

    #[test]
    fn test_missing_header_falls_back() {
        let h = parse_history_content("0 10.0\n1 10.5\n", "presCO2");
        assert_eq!(h.nodes, vec![1]);
        assert_eq!(h.first_series().unwrap(), &[10.0, 10.5]);
    }

    #[test]
    fn test_variable_from_file_name() {
        assert_eq!(variable_from_file_name("mass_test_presWAT_his.dat"), "presWAT");
        assert_eq!(variable_from_file_name("co2_test_temp_his.dat"), "temp");
    }

    #[test]
    fn test_read_histories_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("co2_test_presCO2_his.dat"), SAMPLE).unwrap();
        fs::write(dir.path().join("co2_test_temp_his.dat"), SAMPLE).unwrap();
        fs::write(dir.path().join("other_temp_his.dat"), SAMPLE).unwrap();
        let all = read_histories(dir.path(), "co2_test").unwrap();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec!["presCO2", "temp"]);
    }
}
