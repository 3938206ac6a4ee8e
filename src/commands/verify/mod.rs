//! # verify 子命令实现
//!
//! 每个校验案例：生成输入卡片 → (dry-run 到此为止) → 运行 FEHM → 读取输出
//! → 与参考解比较 → 表格 / CSV / 图。
//!
//! ## 失败处理
//! 单次模拟失败只打印错误并返回空结果，同一批次的其他模拟继续执行。
//!
//! ## 依赖关系
//! - 使用 `cli/verify.rs` 定义的参数
//! - 使用 `batch/runner.rs` 并行执行相互独立的模拟
//! - 使用 `utils/fehm.rs`, `utils/plot.rs`, `vtk/`
//! - 子模块: diffusion, block, co2, radial

pub mod block;
pub mod co2;
pub mod diffusion;
pub mod radial;

use crate::batch::{BatchRunner, ProcessResult};
use crate::cli::verify::{CommonArgs, PlotFormat, VerifyArgs, VerifyCase};
use crate::error::{FehmError, Result};
use crate::models::Deck;
use crate::parsers::contour;
use crate::utils::plot::{self, Figure};
use crate::utils::{fehm, output};
use crate::vtk::{self, VtkExport};

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 执行 verify 子命令
pub fn execute(args: VerifyArgs) -> Result<()> {
    let ctx = Context::new(args.common)?;

    let metrics = match args.case {
        VerifyCase::Diffusion(a) => diffusion::execute(&ctx, a)?,
        VerifyCase::Block(a) => block::execute(&ctx, a)?,
        VerifyCase::Co2Injection(a) => co2::execute_injection(&ctx, a)?,
        VerifyCase::Co2VsWater(a) => radial::execute(&ctx, a)?,
        VerifyCase::Co2Column(a) => co2::execute_column(&ctx, a)?,
        VerifyCase::Co2Static(a) => co2::execute_static(&ctx, a)?,
    };

    if metrics.is_empty() {
        return Ok(());
    }

    output::print_header("Summary");
    let rows: Vec<MetricRow> = metrics.iter().map(MetricRow::from).collect();
    println!("{}", Table::new(&rows));

    if let Some(path) = &ctx.common.summary_csv {
        append_summary_csv(path, &metrics)?;
        output::print_success(&format!("Metrics appended to '{}'", path.display()));
    }

    output::print_done(&format!("{} metric(s) collected", metrics.len()));
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 执行上下文
// ─────────────────────────────────────────────────────────────

/// 单次模拟任务，`spec` 携带读取结果时需要的案例参数
#[derive(Debug, Clone)]
pub struct Job<S> {
    pub name: String,
    pub work_dir: PathBuf,
    pub deck: Deck,
    pub spec: S,
}

/// 所有案例共享的执行上下文
pub struct Context {
    pub common: CommonArgs,
    exe: PathBuf,
    co2_table: String,
    runner: BatchRunner,
}

impl Context {
    pub fn new(common: CommonArgs) -> Result<Self> {
        // 带目录的相对路径在切换工作目录后失效，先转为绝对路径
        let exe = if common.exe.components().count() > 1 {
            fs::canonicalize(&common.exe).unwrap_or_else(|_| common.exe.clone())
        } else {
            common.exe.clone()
        };
        let co2_table = fs::canonicalize(&common.co2_table)
            .unwrap_or_else(|_| common.co2_table.clone())
            .display()
            .to_string();
        let runner = BatchRunner::new(common.jobs);

        Ok(Context {
            common,
            exe,
            co2_table,
            runner,
        })
    }

    /// `<work-root>/<case>/<name>`
    pub fn work_dir(&self, case: &str, name: &str) -> PathBuf {
        self.common.work_root.join(case).join(name)
    }

    /// 写入控制文件的 CO2 物性表路径
    pub fn co2_table(&self) -> String {
        self.co2_table.clone()
    }

    pub fn dry_run(&self) -> bool {
        self.common.dry_run
    }

    /// 并行运行一批模拟，`read` 在模拟成功后读取并整理结果
    ///
    /// 返回值与输入顺序一致；失败或 dry-run 的任务为 `None`。
    pub fn run_jobs<S, O, F>(&self, jobs: &[Job<S>], message: &str, read: F) -> Result<Vec<Option<O>>>
    where
        S: Sync,
        O: Send,
        F: Fn(&Job<S>) -> Result<O> + Sync + Send,
    {
        if jobs.is_empty() {
            return Ok(vec![]);
        }
        output::print_info(&format!(
            "{} simulation(s), {} parallel job(s)",
            jobs.len(),
            self.runner.jobs()
        ));

        let (summary, outputs) = self.runner.run(jobs, message, |job| {
            match self.run_job(job, &read) {
                Ok(Some(out)) => (ProcessResult::Success(job.name.clone()), Some(out)),
                Ok(None) => (ProcessResult::Skipped(job.name.clone()), None),
                Err(e) => (ProcessResult::Failed(job.name.clone(), e.to_string()), None),
            }
        })?;

        for (name, err) in &summary.failures {
            output::print_error(&format!("{}: {}", name, err));
        }
        if summary.skipped > 0 {
            output::print_skip(&format!(
                "Dry run: input decks written for {} simulation(s) under '{}'",
                summary.skipped,
                self.common.work_root.display()
            ));
        }
        if summary.success > 0 {
            output::print_success(&format!(
                "{}/{} simulation(s) finished",
                summary.success,
                summary.total()
            ));
        }

        Ok(outputs)
    }

    fn run_job<S, O, F>(&self, job: &Job<S>, read: &F) -> Result<Option<O>>
    where
        F: Fn(&Job<S>) -> Result<O>,
    {
        fehm::prepare(&job.work_dir, &job.deck)?;
        if self.common.dry_run {
            return Ok(None);
        }

        let outcome = fehm::run(&self.exe, &job.work_dir, &job.deck.root)?;
        for warning in &outcome.warnings {
            output::print_warning(&format!("{}: {}", job.name, warning));
        }
        output::print_info(&format!(
            "{} finished in {:.1} s",
            job.name,
            outcome.elapsed.as_secs_f64()
        ));

        if self.common.vtk {
            if let Err(e) = export_vtk(&job.deck, &job.work_dir) {
                output::print_warning(&format!("{}: VTK export failed: {}", job.name, e));
            }
        }

        read(job).map(Some)
    }

    /// 保存对比图（`--no-plot` 或 dry-run 时跳过）
    pub fn save_plot(&self, figure: &Figure, stem: &str) -> Result<()> {
        if self.common.no_plot || self.common.dry_run {
            return Ok(());
        }
        fs::create_dir_all(&self.common.work_root).map_err(|e| FehmError::FileWriteError {
            path: self.common.work_root.display().to_string(),
            source: e,
        })?;

        let path = self
            .common
            .work_root
            .join(format!("{}.{}", stem, self.common.plot_format.extension()));
        plot::render(figure, &path, self.common.plot_format == PlotFormat::Svg)?;
        output::print_success(&format!("Plot saved to '{}'", path.display()));
        Ok(())
    }
}

/// 将完成的模拟导出为 VTK 和 ParaView 启动脚本
pub fn export_vtk(deck: &Deck, work_dir: &Path) -> Result<PathBuf> {
    let properties = deck.node_properties()?;
    let contours = contour::read_contours(work_dir, &deck.root)?;

    let mut export = VtkExport::new(&deck.grid, &properties, Some(&contours));
    export.assemble()?;

    let path = work_dir.join(format!("{}.vtk", deck.root));
    export.write(&path)?;
    export.startup_script(&work_dir.join(vtk::STARTUP_SCRIPT))?;
    Ok(path)
}

// ─────────────────────────────────────────────────────────────
// 汇总指标
// ─────────────────────────────────────────────────────────────

/// 单项校验指标
#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub case: String,
    pub metric: String,
    pub value: f64,
    pub reference: Option<f64>,
    pub unit: String,
    pub status: String,
}

impl Metric {
    pub fn new(case: &str, metric: &str, value: f64, unit: &str) -> Self {
        Metric {
            case: case.to_string(),
            metric: metric.to_string(),
            value,
            reference: None,
            unit: unit.to_string(),
            status: "ok".to_string(),
        }
    }

    pub fn with_reference(mut self, reference: f64) -> Self {
        self.reference = Some(reference);
        self
    }

    /// PASS/FAIL 类指标
    pub fn pass_fail(case: &str, metric: &str, passed: bool) -> Self {
        Metric {
            status: if passed { "PASS" } else { "FAIL" }.to_string(),
            ..Metric::new(case, metric, if passed { 1.0 } else { 0.0 }, "")
        }
    }

    /// 模拟值 / 参考值
    pub fn ratio(&self) -> Option<f64> {
        self.reference
            .filter(|r| *r != 0.0)
            .map(|r| self.value / r)
    }
}

/// 终端表格行
#[derive(Debug, Clone, Tabled)]
struct MetricRow {
    #[tabled(rename = "Case")]
    case: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Reference")]
    reference: String,
    #[tabled(rename = "Ratio")]
    ratio: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Metric> for MetricRow {
    fn from(m: &Metric) -> Self {
        let with_unit = |v: f64| {
            if m.unit.is_empty() {
                format!("{:.6}", v)
            } else {
                format!("{:.6} {}", v, m.unit)
            }
        };
        MetricRow {
            case: m.case.clone(),
            metric: m.metric.clone(),
            value: with_unit(m.value),
            reference: m.reference.map(with_unit).unwrap_or_else(|| "-".to_string()),
            ratio: m
                .ratio()
                .map(|r| format!("{:.4}", r))
                .unwrap_or_else(|| "-".to_string()),
            status: m.status.clone(),
        }
    }
}

/// 追加写入汇总 CSV（新文件写表头）
fn append_summary_csv(path: &Path, metrics: &[Metric]) -> Result<()> {
    let has_headers = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FehmError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(has_headers)
        .from_writer(file);
    for metric in metrics {
        wtr.serialize(metric)?;
    }
    wtr.flush().map_err(|e| FehmError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grid;

    fn common(work_root: &Path, dry_run: bool) -> CommonArgs {
        CommonArgs {
            exe: PathBuf::from("fehm"),
            co2_table: PathBuf::from("co2_interp_table.txt"),
            work_root: work_root.to_path_buf(),
            jobs: 2,
            dry_run,
            no_plot: true,
            plot_format: PlotFormat::Png,
            vtk: false,
            summary_csv: None,
        }
    }

    fn job(ctx: &Context, name: &str) -> Job<usize> {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        Job {
            name: name.to_string(),
            work_dir: ctx.work_dir("unit", name),
            deck: Deck::new(name, grid),
            spec: 7,
        }
    }

    #[test]
    fn test_dry_run_writes_decks_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(common(dir.path(), true)).unwrap();
        let jobs = vec![job(&ctx, "a"), job(&ctx, "b")];

        let outputs = ctx.run_jobs(&jobs, "test", |j| Ok(j.spec)).unwrap();
        assert_eq!(outputs, vec![None, None]);
        assert!(dir.path().join("unit").join("a").join("a.dat").exists());
        assert!(dir.path().join("unit").join("b").join("fehmn.files").exists());
    }

    #[test]
    fn test_missing_simulator_fails_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = common(dir.path(), false);
        args.exe = dir.path().join("bin").join("no-such-fehm");
        let ctx = Context::new(args).unwrap();
        let jobs = vec![job(&ctx, "a"), job(&ctx, "b")];

        let outputs = ctx.run_jobs(&jobs, "test", |j| Ok(j.spec)).unwrap();
        assert_eq!(outputs, vec![None, None]);
    }

    #[cfg(unix)]
    #[test]
    fn test_vtk_failure_keeps_results() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("fake_fehm.sh");
        // 在脚本路径上建目录，使启动脚本无法写出
        fs::write(&exe, format!("#!/bin/sh\nmkdir {}\n", vtk::STARTUP_SCRIPT)).unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let mut args = common(&dir.path().join("runs"), false);
        args.exe = exe;
        args.vtk = true;
        let ctx = Context::new(args).unwrap();
        let jobs = vec![job(&ctx, "a")];

        let outputs = ctx.run_jobs(&jobs, "test", |j| Ok(j.spec)).unwrap();
        assert_eq!(outputs, vec![Some(7)]);
        assert!(ctx.work_dir("unit", "a").join("a.vtk").exists());
    }

    #[test]
    fn test_metric_ratio_and_status() {
        let m = Metric::new("block", "dP", 0.99, "MPa").with_reference(1.0);
        assert!((m.ratio().unwrap() - 0.99).abs() < 1e-12);
        let row = MetricRow::from(&m);
        assert_eq!(row.value, "0.990000 MPa");
        assert_eq!(row.ratio, "0.9900");

        let failed = Metric::pass_fail("co2-static", "2a", false);
        assert_eq!(failed.status, "FAIL");
        assert!(failed.ratio().is_none());
    }

    #[test]
    fn test_summary_csv_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let m = vec![Metric::new("block", "dT", 1.5, "C").with_reference(1.6)];
        append_summary_csv(&path, &m).unwrap();
        append_summary_csv(&path, &m).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "case,metric,value,reference,unit,status");
        assert_eq!(lines[1], "block,dT,1.5,1.6,C,ok");
    }
}
