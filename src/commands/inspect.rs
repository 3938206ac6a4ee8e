//! # inspect 命令实现
//!
//! 以表格形式查看模拟器输出。
//!
//! ## 功能
//! - history: 历史文件前后若干行
//! - contour: 快照时刻与列名
//! - log: 递归扫描 `fehmn.err` / `*.outp`，汇总失败与警告
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的参数
//! - 使用 `parsers/`, `batch/collector.rs`

use crate::batch::FileCollector;
use crate::cli::inspect::{ContourArgs, HistoryArgs, InspectArgs, InspectCommands, LogArgs};
use crate::error::{FehmError, Result};
use crate::parsers::history::{self, History};
use crate::parsers::contour::{self, Contour};
use crate::parsers::{self, log, OutputKind};
use crate::utils::output;

use std::path::Path;
use tabled::{builder::Builder, Table, Tabled};

/// 执行 inspect 命令
pub fn execute(args: InspectArgs) -> Result<()> {
    match args.command {
        InspectCommands::History(a) => inspect_history(a),
        InspectCommands::Contour(a) => inspect_contour(a),
        InspectCommands::Log(a) => inspect_log(a),
    }
}

// ─────────────────────────────────────────────────────────────
// history
// ─────────────────────────────────────────────────────────────

/// 前 `rows` 行和后 `rows` 行的下标（不重复）
fn shown_rows(len: usize, rows: usize) -> Vec<usize> {
    if len <= rows * 2 {
        return (0..len).collect();
    }
    (0..rows).chain(len - rows..len).collect()
}

/// 历史数据表：时间列 + 每个节点一列
pub fn history_table(hist: &History, rows: usize) -> Table {
    let mut builder = Builder::default();
    let mut header = vec!["Time (days)".to_string()];
    header.extend(hist.nodes.iter().map(|n| format!("Node {}", n)));
    builder.push_record(header);

    let shown = shown_rows(hist.len(), rows);
    for (k, &i) in shown.iter().enumerate() {
        if k > 0 && i != shown[k - 1] + 1 {
            builder.push_record(vec!["...".to_string(); hist.nodes.len() + 1]);
        }
        let mut record = vec![format!("{:.6}", hist.times[i])];
        record.extend(
            hist.values
                .iter()
                .map(|col| col.get(i).map_or("-".to_string(), |v| format!("{:.6}", v))),
        );
        builder.push_record(record);
    }
    builder.build()
}

fn inspect_history(args: HistoryArgs) -> Result<()> {
    if !args.file.exists() {
        return Err(FehmError::FileNotFound {
            path: args.file.display().to_string(),
        });
    }
    let hist = history::parse_history(&args.file)?;

    output::print_header(&format!("History: {}", hist.variable));
    output::print_kv("File", &args.file.display().to_string());
    output::print_kv("Nodes", &format!("{:?}", hist.nodes));
    output::print_kv("Records", &hist.len().to_string());
    println!("{}", history_table(&hist, args.rows));

    for node in &hist.nodes {
        if let Some(v) = hist.last(*node) {
            output::print_kv(&format!("Final, node {}", node), &format!("{:.6}", v));
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// contour
// ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Time (days)")]
    time: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "Columns")]
    columns: String,
}

fn inspect_contour(args: ContourArgs) -> Result<()> {
    if !args.work_dir.is_dir() {
        return Err(FehmError::DirectoryNotFound {
            path: args.work_dir.display().to_string(),
        });
    }
    let contours = contour::read_contours(&args.work_dir, &args.root)?;
    if contours.is_empty() {
        return Err(FehmError::NoFilesFound {
            pattern: format!("{}*_sca_node.csv", args.root),
        });
    }

    output::print_header(&format!("Contour snapshots: {}", args.root));
    let rows: Vec<SnapshotRow> = contours
        .snapshots
        .iter()
        .map(|s| SnapshotRow {
            time: format!("{}", s.time),
            nodes: s.nodes.len(),
            columns: s.headers.join(", "),
        })
        .collect();
    println!("{}", Table::new(&rows));
    output::print_kv("Variables", &contours.variables().join(", "));

    if let Some(node) = args.node {
        output::print_info(&format!("Node {}", node));
        println!("{}", node_table(&contours, node));
    }
    Ok(())
}

/// 某节点在各快照时刻的所有列
pub fn node_table(contours: &Contour, node: usize) -> Table {
    let mut builder = Builder::default();
    let mut header = vec!["Time (days)".to_string()];
    header.extend(contours.variables());
    builder.push_record(header);

    for (time, snapshot) in contours.times().into_iter().zip(&contours.snapshots) {
        let row = snapshot.nodes.iter().position(|&n| n == node);
        let mut record = vec![format!("{}", time)];
        record.extend(snapshot.columns.iter().map(|col| {
            row.and_then(|i| col.get(i))
                .map_or("-".to_string(), |v| format!("{:.6}", v))
        }));
        builder.push_record(record);
    }
    builder.build()
}

// ─────────────────────────────────────────────────────────────
// log
// ─────────────────────────────────────────────────────────────

/// 单个日志文件的扫描结果
#[derive(Debug, Clone, PartialEq)]
pub enum LogStatus {
    Clean,
    Failed(String),
    Warnings(usize),
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// 按文件类型扫描
pub fn scan_log(path: &Path) -> Result<(LogStatus, String)> {
    match parsers::detect_output_kind(path)? {
        OutputKind::ErrorLog => Ok(match log::scan_error_file(path)? {
            Some(failure) => {
                let first_line = failure.excerpt.lines().next().unwrap_or("").trim().to_string();
                (LogStatus::Failed(failure.keyword), first_line)
            }
            None => (LogStatus::Clean, String::new()),
        }),
        OutputKind::Output => {
            let lines = log::scan_output_file(path)?;
            let detail = lines.first().cloned().unwrap_or_default();
            if lines.is_empty() {
                Ok((LogStatus::Clean, detail))
            } else {
                Ok((LogStatus::Warnings(lines.len()), detail))
            }
        }
        other => Err(FehmError::InvalidArgument(format!(
            "{} is a {:?} file, not a log",
            path.display(),
            other
        ))),
    }
}

fn inspect_log(args: LogArgs) -> Result<()> {
    let files = FileCollector::new(args.dir.clone())
        .with_pattern(&args.pattern)?
        .recursive(!args.no_recursive)
        .collect()?;
    if files.is_empty() {
        return Err(FehmError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    output::print_header("Log Scan");
    output::print_info(&format!("Scanning {} file(s)", files.len()));

    let mut rows = Vec::new();
    let mut failed = 0;
    for path in &files {
        let (status, detail) = match scan_log(path) {
            Ok(r) => r,
            Err(e) => {
                output::print_skip(&format!("{}", e));
                continue;
            }
        };
        let status = match status {
            LogStatus::Clean => "clean".to_string(),
            LogStatus::Failed(keyword) => {
                failed += 1;
                format!("FAILED ({})", keyword)
            }
            LogStatus::Warnings(n) => format!("{} warning(s)", n),
        };
        rows.push(LogRow {
            file: path
                .strip_prefix(&args.dir)
                .unwrap_or(path)
                .display()
                .to_string(),
            status,
            detail,
        });
    }

    println!("{}", Table::new(&rows));
    if failed > 0 {
        output::print_error(&format!("{} simulation(s) reported failures", failed));
    } else {
        output::print_success("No failures found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::history::parse_history_content;
    use std::fs;

    #[test]
    fn test_shown_rows() {
        assert_eq!(shown_rows(4, 5), vec![0, 1, 2, 3]);
        assert_eq!(shown_rows(10, 2), vec![0, 1, 8, 9]);
    }

    #[test]
    fn test_history_table_elides_middle() {
        let mut content = String::from("variables = \"Time (days)\" \"Node 3\"\n");
        for i in 0..10 {
            content.push_str(&format!("{} {}\n", i, 20 + i));
        }
        let hist = parse_history_content(&content, "presWAT");
        let text = history_table(&hist, 2).to_string();
        assert!(text.contains("Node 3"));
        assert!(text.contains("..."));
        assert!(text.contains("29.000000"));
        assert!(!text.contains("25.000000"));
    }

    #[test]
    fn test_node_table() {
        let snapshot = contour::parse_snapshot_content(
            "node, Liquid Pressure (MPa), Temperature (deg C)\n1, 1.5, 20.0\n2, 1.0, 25.0\n",
            0.5,
        )
        .unwrap();
        let contours = Contour {
            snapshots: vec![snapshot],
        };
        let text = node_table(&contours, 2).to_string();
        assert!(text.contains("liquid pressure (mpa)"));
        assert!(text.contains("25.000000"));
        assert!(!text.contains("1.500000"));
    }

    #[test]
    fn test_scan_log_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let err = dir.path().join("fehmn.err");
        fs::write(&err, "timestep too small, stopping\n").unwrap();
        let outp = dir.path().join("run.outp");
        fs::write(&outp, "ok\n**** error in input ****\n").unwrap();
        let grid = dir.path().join("grid.inp");
        fs::write(&grid, "coor\n").unwrap();

        assert_eq!(
            scan_log(&err).unwrap().0,
            LogStatus::Failed("stopping".to_string())
        );
        assert_eq!(scan_log(&outp).unwrap().0, LogStatus::Warnings(1));
        assert!(scan_log(&grid).is_err());
    }
}
