//! # FEHM 调用工具
//!
//! 准备工作目录、写出输入文件并运行模拟器。
//!
//! ## 流程
//! 1. 清理上一次运行留下的输出文件
//! 2. 写出 `grid.inp`、`<root>.dat`、`fehmn.files`
//! 3. 在工作目录中启动模拟器并阻塞等待
//! 4. 扫描 `fehmn.err` 中的失败关键字，`<root>.outp` 中的 `error` 行作为警告
//!
//! ## 依赖关系
//! - 被 `commands/verify/` 使用
//! - 使用 `models/deck.rs`, `parsers/log.rs`, `utils/progress.rs`
//! - 使用 `glob` 匹配待清理文件

use crate::error::{FehmError, Result};
use crate::models::deck::{Deck, CONTROL_FILE};
use crate::parsers::log;
use crate::utils::progress;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

/// 运行前需要清理的输出文件
pub const CLEAN_PATTERNS: [&str; 12] = [
    "*.outp",
    "*.err",
    "*.chk",
    "*.rsto",
    "*_his.dat",
    "*.avs",
    "*.csv",
    "nop.temp",
    "fehmn.err",
    "*.his",
    "*.ini",
    "*.avs_log",
];

/// 错误输出中保留的尾部行数
const STDERR_TAIL: usize = 20;

/// 一次模拟运行的结果
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// 输出文件中的 error 行
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

/// 删除工作目录中的旧输出，返回删除的文件数
pub fn clean_outputs(work_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for pattern in CLEAN_PATTERNS {
        let full = work_dir.join(pattern).to_string_lossy().to_string();
        let paths = glob::glob(&full).map_err(|e| FehmError::InvalidArgument(e.to_string()))?;
        for path in paths.filter_map(|p| p.ok()) {
            if !path.is_file() {
                continue;
            }
            fs::remove_file(&path).map_err(|e| FehmError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// 写出运行控制文件 `fehmn.files`
pub fn write_control_file(work_dir: &Path, deck: &Deck) -> Result<()> {
    let path = work_dir.join(CONTROL_FILE);
    fs::write(&path, deck.control_file()).map_err(|e| FehmError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 建立工作目录，清理旧输出并写出全部输入文件
pub fn prepare(work_dir: &Path, deck: &Deck) -> Result<()> {
    fs::create_dir_all(work_dir).map_err(|e| FehmError::FileWriteError {
        path: work_dir.display().to_string(),
        source: e,
    })?;
    clean_outputs(work_dir)?;
    deck.write(work_dir)?;
    write_control_file(work_dir, deck)
}

/// 在工作目录中运行模拟器
pub fn run(exe: &Path, work_dir: &Path, root: &str) -> Result<RunOutcome> {
    if !work_dir.is_dir() {
        return Err(FehmError::DirectoryNotFound {
            path: work_dir.display().to_string(),
        });
    }

    let command = exe.display().to_string();
    let spinner = progress::create_spinner(&format!("Running FEHM in {}", work_dir.display()));
    let start = Instant::now();

    let output = Command::new(exe).current_dir(work_dir).output();
    spinner.finish_and_clear();

    let output = output.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            FehmError::CommandNotFound {
                command: command.clone(),
            }
        }
        _ => FehmError::CommandFailed {
            command: command.clone(),
            stderr: e.to_string(),
        },
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).to_string()
        } else {
            stderr.to_string()
        };
        return Err(FehmError::CommandFailed {
            command,
            stderr: tail(&text, STDERR_TAIL),
        });
    }

    if let Some(failure) = log::scan_error_file(&work_dir.join(log::ERROR_FILE))? {
        return Err(FehmError::SimulationFailed {
            work_dir: work_dir.display().to_string(),
            keyword: failure.keyword,
            excerpt: failure.excerpt,
        });
    }

    let warnings = log::scan_output_file(&work_dir.join(format!("{}.outp", root)))?;

    Ok(RunOutcome {
        warnings,
        elapsed: start.elapsed(),
    })
}

/// 最后 n 行
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::Grid;

    fn deck() -> Deck {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        Deck::new("run_test", grid)
    }

    #[test]
    fn test_clean_outputs_only_matching() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.outp", "fehmn.err", "r_presWAT_his.dat", "r.1_days_sca_node.csv", "nop.temp"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::write(dir.path().join("grid.inp"), "keep").unwrap();
        fs::write(dir.path().join("run_test.dat"), "keep").unwrap();

        let removed = clean_outputs(dir.path()).unwrap();
        assert_eq!(removed, 5);
        assert!(dir.path().join("grid.inp").exists());
        assert!(dir.path().join("run_test.dat").exists());
    }

    #[test]
    fn test_prepare_writes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("case");
        prepare(&work, &deck()).unwrap();
        let control = fs::read_to_string(work.join(CONTROL_FILE)).unwrap();
        assert!(control.contains("input: run_test.dat"));
        assert!(work.join("grid.inp").exists());
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("no-such-fehm"), dir.path(), "run_test").unwrap_err();
        assert!(matches!(err, FehmError::CommandNotFound { .. }));
    }

    #[test]
    fn test_missing_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Path::new("fehm"), &dir.path().join("absent"), "x").unwrap_err();
        assert!(matches!(err, FehmError::DirectoryNotFound { .. }));
    }

    #[cfg(unix)]
    fn fake_exe(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake_fehm.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_run_success_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_exe(
            dir.path(),
            "printf 'step 1\\n error in mass balance\\n' > run_test.outp",
        );
        let outcome = run(&exe, dir.path(), "run_test").unwrap();
        assert_eq!(outcome.warnings, vec!["error in mass balance"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_detects_stopping() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_exe(dir.path(), "echo 'timestep too small, STOPPING' > fehmn.err");
        let err = run(&exe, dir.path(), "run_test").unwrap_err();
        match err {
            FehmError::SimulationFailed { keyword, .. } => assert_eq!(keyword, "stopping"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_run_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_exe(dir.path(), "echo 'segfault' >&2\nexit 3");
        let err = run(&exe, dir.path(), "run_test").unwrap_err();
        match err {
            FehmError::CommandFailed { stderr, .. } => assert!(stderr.contains("segfault")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}
