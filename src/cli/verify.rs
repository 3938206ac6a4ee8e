//! # verify 子命令 CLI 定义
//!
//! 校验案例统一入口。公共参数（模拟器路径、工作目录、并行数、绘图设置）
//! 可写在案例名之前或之后，均支持环境变量。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/verify/` 相应模块

use crate::reference::diffusion::DEFAULT_TERMS;

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// Verify 主命令
// ─────────────────────────────────────────────────────────────

/// verify 主命令参数
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub case: VerifyCase,
}

/// 图像输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum PlotFormat {
    /// PNG image
    #[default]
    Png,
    /// SVG vector image
    Svg,
}

impl PlotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for PlotFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// 所有案例共用的参数
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// FEHM executable
    #[arg(long, env = "FEHM_EXE", default_value = "fehm", global = true)]
    pub exe: PathBuf,

    /// CO2 property interpolation table passed to FEHM
    #[arg(
        long,
        env = "FEHM_CO2_TABLE",
        default_value = "co2_interp_table.txt",
        global = true
    )]
    pub co2_table: PathBuf,

    /// Directory holding one work directory per simulation
    #[arg(long, env = "FEHM_WORK_ROOT", default_value = "fehm_runs", global = true)]
    pub work_root: PathBuf,

    /// Number of simulations run in parallel (0 = all CPUs)
    #[arg(short, long, default_value_t = 1, global = true)]
    pub jobs: usize,

    /// Write input decks only, do not run FEHM
    #[arg(long, default_value_t = false, global = true)]
    pub dry_run: bool,

    /// Skip plot generation
    #[arg(long, default_value_t = false, global = true)]
    pub no_plot: bool,

    /// Plot output format
    #[arg(long, value_enum, default_value = "png", global = true)]
    pub plot_format: PlotFormat,

    /// Export every finished simulation to VTK
    #[arg(long, default_value_t = false, global = true)]
    pub vtk: bool,

    /// Append per-case metrics to this CSV file
    #[arg(long, global = true)]
    pub summary_csv: Option<PathBuf>,
}

/// verify 子命令
#[derive(Subcommand, Debug)]
pub enum VerifyCase {
    /// 1D heat conduction and Darcy flow with swapped boundaries (grid convergence)
    Diffusion(DiffusionArgs),

    /// Single-block mass and heat balance
    Block(BlockArgs),

    /// CO2-only block with pressure-driven CO2 injection
    Co2Injection(Co2InjectionArgs),

    /// Radial water vs CO2 injection, closed and open outer boundary
    Co2VsWater(Co2VsWaterArgs),

    /// Vertical column with a CO2 cap over water, gravity on
    Co2Column(Co2ColumnArgs),

    /// Static CO2 and water+CO2 setups (PASS/FAIL)
    Co2Static(Co2StaticArgs),
}

// ─────────────────────────────────────────────────────────────
// diffusion
// ─────────────────────────────────────────────────────────────

/// 扩散问题类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DiffusionMode {
    /// Heat conduction only
    Heat,
    /// Darcy pressure diffusion only
    Darcy,
    /// Both problems
    Both,
}

impl std::fmt::Display for DiffusionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffusionMode::Heat => write!(f, "heat"),
            DiffusionMode::Darcy => write!(f, "darcy"),
            DiffusionMode::Both => write!(f, "both"),
        }
    }
}

#[derive(Args, Debug)]
pub struct DiffusionArgs {
    /// Grid resolutions (number of nodes along x), comma separated
    #[arg(long, default_value = "21,51,101")]
    pub resolutions: String,

    /// Which diffusion problem to run
    #[arg(long, value_enum, default_value = "both")]
    pub mode: DiffusionMode,

    /// Number of Fourier terms in the analytical solution
    #[arg(long, default_value_t = DEFAULT_TERMS)]
    pub terms: usize,
}

// ─────────────────────────────────────────────────────────────
// block
// ─────────────────────────────────────────────────────────────

/// 块体测试类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BlockMode {
    /// Mass injection only
    Mass,
    /// Heat injection only
    Heat,
    /// Both tests
    Both,
}

#[derive(Args, Debug)]
pub struct BlockArgs {
    /// Which balance test to run
    #[arg(long, value_enum, default_value = "both")]
    pub mode: BlockMode,

    /// Target pressure rise rate for the mass test (MPa/day)
    #[arg(long, default_value_t = 1.0)]
    pub target_rate: f64,

    /// Total heating rate for the heat test (MW)
    #[arg(long, default_value_t = 3.0e-5)]
    pub heat_rate: f64,

    /// Simulated time (days)
    #[arg(long, default_value_t = 1.0)]
    pub tf: f64,
}

// ─────────────────────────────────────────────────────────────
// CO2 cases
// ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct Co2InjectionArgs {
    /// Injection pressure above the initial pressure (MPa)
    #[arg(long, default_value_t = 2.0)]
    pub overpressure: f64,

    /// Injection impedance
    #[arg(long, default_value_t = 1.0e-2)]
    pub impedance: f64,

    /// Simulated time (days)
    #[arg(long, default_value_t = 10.0)]
    pub tf: f64,
}

#[derive(Args, Debug)]
pub struct Co2VsWaterArgs {
    /// Full-cylinder water injection rate (kg/s)
    #[arg(long, default_value_t = 1.0e-3)]
    pub rate: f64,

    /// Number of radial nodes
    #[arg(long, default_value_t = 101)]
    pub nodes: usize,

    /// Simulated time (days)
    #[arg(long, default_value_t = 10.0)]
    pub tf: f64,

    /// Only run these cases (comma separated, e.g. "water_closed,co2_equal_mass_open")
    #[arg(long)]
    pub cases: Option<String>,
}

#[derive(Args, Debug)]
pub struct Co2ColumnArgs {
    /// Dissolved CO2 diffusivity (m²/s)
    #[arg(long, default_value_t = 2.0e-9)]
    pub diffusivity: f64,

    /// Simulated time (days)
    #[arg(long, default_value_t = 1000.0)]
    pub tf: f64,
}

#[derive(Args, Debug)]
pub struct Co2StaticArgs {
    /// Sub-tests to run (a: CO2 only, b: water+CO2 with pressure BC,
    /// c: water+CO2 with injection, d: closed CO2 injection)
    #[arg(long, default_value = "a,b,c,d")]
    pub tests: String,
}
