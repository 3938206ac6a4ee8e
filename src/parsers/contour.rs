//! # FEHM 等值线快照解析器
//!
//! 解析 `surf` 格式输出的 `<root>.<time>_days_sca_node.csv` 节点快照。
//!
//! ## 功能
//! - 读取表头与节点数值（csv）
//! - 从文件名提取输出时间（regex）
//! - 按坐标轴求剖面平均
//!
//! ## 依赖关系
//! - 被 `commands/verify/`, `commands/export.rs`, `vtk/` 使用
//! - 使用 `parsers/grid_inp.rs` 的节点坐标

use crate::error::{FehmError, Result};
use crate::parsers::grid_inp::NodeCoords;

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// 剖面坐标合并容差
const PROFILE_TOL: f64 = 1e-6;

/// 单个时刻的节点快照
#[derive(Debug, Clone)]
pub struct ContourSnapshot {
    /// 时间 (days)
    pub time: f64,
    /// 小写、去空白后的列名（不含节点列）
    pub headers: Vec<String>,
    /// 节点编号
    pub nodes: Vec<usize>,
    /// columns[列][节点]
    pub columns: Vec<Vec<f64>>,
}

impl ContourSnapshot {
    /// 按子串（不区分大小写）查找列
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let needle = name.to_lowercase();
        self.headers
            .iter()
            .position(|h| h.contains(&needle))
            .map(|i| self.columns[i].as_slice())
    }

    /// 液态 / 超临界 CO2 饱和度列
    ///
    /// 列名须同时含 `co2` 与 `saturation` 且不含 `gas`；含 `liquid` 的列优先。
    pub fn co2_saturation(&self) -> Option<&[f64]> {
        let candidates: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.contains("co2") && h.contains("saturation") && !h.contains("gas"))
            .map(|(i, _)| i)
            .collect();
        candidates
            .iter()
            .find(|&&i| self.headers[i].contains("liquid"))
            .or_else(|| candidates.first())
            .map(|&i| self.columns[i].as_slice())
    }
}

/// 按时间排序的快照序列
#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub snapshots: Vec<ContourSnapshot>,
}

impl Contour {
    pub fn times(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.time).collect()
    }

    /// 所有快照共有的列名
    pub fn variables(&self) -> Vec<String> {
        self.snapshots
            .first()
            .map(|s| s.headers.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// 从文件名提取时间：`<root>.<time>_days_sca_node.csv`
pub fn contour_time(file_name: &str, root: &str) -> Option<f64> {
    let pattern = format!(
        r"^{}\.(?P<t>[0-9eE+\-.]+?)_days_sca_node\.csv$",
        regex::escape(root)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(file_name)?.name("t")?.as_str().parse().ok()
}

/// 解析单个快照文件
pub fn parse_snapshot(path: &Path, time: f64) -> Result<ContourSnapshot> {
    let content = fs::read_to_string(path).map_err(|e| FehmError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_snapshot_content(&content, time).map_err(|e| match e {
        FehmError::Other(reason) => FehmError::ParseError {
            format: "contour".to_string(),
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串解析快照
pub fn parse_snapshot_content(content: &str, time: f64) -> Result<ContourSnapshot> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let header = rdr.headers()?.clone();
    if header.len() < 2 {
        return Err(FehmError::Other("header has fewer than two columns".into()));
    }
    let headers: Vec<String> = header.iter().skip(1).map(|h| h.to_lowercase()).collect();

    let mut nodes = Vec::new();
    let mut columns = vec![Vec::new(); headers.len()];

    for record in rdr.records() {
        let record = record?;
        let Some(node) = record
            .get(0)
            .and_then(|s| s.parse::<f64>().ok())
            .map(|v| v as usize)
        else {
            continue;
        };
        let row: Vec<f64> = (1..=headers.len())
            .map(|i| {
                record
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(f64::NAN)
            })
            .collect();
        nodes.push(node);
        for (col, v) in row.into_iter().enumerate() {
            columns[col].push(v);
        }
    }

    Ok(ContourSnapshot {
        time,
        headers,
        nodes,
        columns,
    })
}

/// 工作目录中 root 对应的快照文件（含时间），按时间排序
pub fn contour_files(work_dir: &Path, root: &str) -> Result<Vec<(f64, PathBuf)>> {
    let pattern = work_dir.join(format!("{}*_sca_node.csv", root));
    let pattern = pattern.to_string_lossy().to_string();
    let paths = glob::glob(&pattern).map_err(|e| FehmError::InvalidArgument(e.to_string()))?;

    let mut files: Vec<(f64, PathBuf)> = paths
        .filter_map(|p| p.ok())
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            contour_time(&name, root).map(|t| (t, p))
        })
        .collect();
    files.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(files)
}

/// 读取全部快照；无法解析的文件跳过
pub fn read_contours(work_dir: &Path, root: &str) -> Result<Contour> {
    let snapshots = contour_files(work_dir, root)?
        .into_iter()
        .filter_map(|(t, p)| parse_snapshot(&p, t).ok())
        .collect();
    Ok(Contour { snapshots })
}

/// 沿某轴的剖面：同一坐标上的节点取平均，按坐标排序
pub fn profile(
    snapshot: &ContourSnapshot,
    coords: &NodeCoords,
    variable: &str,
    axis: usize,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let values = snapshot.column(variable)?;
    Some(profile_values(snapshot, coords, values, axis))
}

/// 对给定列求剖面（列与 `snapshot.nodes` 一一对应）
pub fn profile_values(
    snapshot: &ContourSnapshot,
    coords: &NodeCoords,
    values: &[f64],
    axis: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut samples: Vec<(f64, f64)> = snapshot
        .nodes
        .iter()
        .zip(values)
        .filter_map(|(n, v)| coords.get(n).map(|p| (p[axis], *v)))
        .collect();
    samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut xs: Vec<f64> = Vec::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    for (x, v) in samples {
        match xs.last() {
            Some(last) if (x - last).abs() < PROFILE_TOL => {
                if let Some(acc) = sums.last_mut() {
                    acc.0 += v;
                    acc.1 += 1;
                }
            }
            _ => {
                xs.push(x);
                sums.push((v, 1));
            }
        }
    }

    let avg = sums.into_iter().map(|(s, n)| s / n as f64).collect();
    (xs, avg)
}
