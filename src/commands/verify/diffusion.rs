//! # 一维扩散校验
//!
//! 0 < x < L 的平板，初始线性剖面，t > 0 时两端边界值互换。
//! 热传导与 Darcy 压力扩散具有相同的数学形式，与 Fourier 级数解比较，
//! 并在多个网格分辨率上做收敛性研究。
//!
//! ## 问题设置
//! - 热传导：κ = k / ((1-φ) ρ c)，`grad` 设置初始温度，`hflx` 固定边界温度
//! - Darcy：D = k / (φ μ c_f)，物性取平均压力处的值，`flow` 固定边界压力
//! - 输出时刻为特征时间 L²/D 的若干分数，终止时间 0.5 L²/D
//!
//! ## 依赖关系
//! - 使用 `reference/diffusion.rs`, `reference/eos.rs`
//! - 使用 `parsers/contour.rs`, `parsers/grid_inp.rs`

use super::{Context, Job, Metric};
use crate::cli::parse_list;
use crate::cli::verify::{DiffusionArgs, DiffusionMode};
use crate::error::{FehmError, Result};
use crate::models::deck::{Macro, GRID_FILE};
use crate::models::grid::{linspace, Grid};
use crate::models::{Deck, ZoneRef};
use crate::parsers::contour::{self, Contour};
use crate::parsers::grid_inp::{self, NodeCoords};
use crate::reference::balance::SECONDS_PER_DAY;
use crate::reference::diffusion::{self, SwappedSlab};
use crate::reference::eos;
use crate::utils::output;
use crate::utils::plot::{Figure, Panel, Series, Style, PALETTE};

use std::path::Path;
use tabled::{Table, Tabled};

const LENGTH: f64 = 1.0;
const CROSS_SECTION: [f64; 2] = [0.0, 0.1];
const ROCK_DENSITY: f64 = 2500.0;
const ROCK_SPECIFIC_HEAT: f64 = 1000.0;

// 热传导
const T1: f64 = 10.0;
const T2: f64 = 20.0;
const HEAT_P0: f64 = 0.1;
const HEAT_CONDUCTIVITY: f64 = 2.5;
const HEAT_POROSITY: f64 = 0.01;
const HEAT_PERMEABILITY: f64 = 1.0e-20;
/// dx = 0.05 m 时的 hflx 系数 (MW/°C)，与 dx 成反比缩放
const HFLX_MULTIPLIER: f64 = 5.0e-5;
const HFLX_REFERENCE_DX: f64 = 0.05;
const HEAT_FRACTIONS: [f64; 6] = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5];

// Darcy
const P1: f64 = 1.0;
const P2: f64 = 2.0;
const DARCY_T0: f64 = 15.0;
const DARCY_POROSITY: f64 = 0.1;
const DARCY_PERMEABILITY: f64 = 1.0e-18;
const DARCY_CONDUCTIVITY: f64 = 1.0e-3;
const DARCY_FRACTIONS: [f64; 4] = [0.001, 0.01, 0.1, 0.5];

/// 扩散问题类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Physics {
    Heat,
    Darcy,
}

impl Physics {
    pub fn root(self) -> &'static str {
        match self {
            Physics::Heat => "heat_1d",
            Physics::Darcy => "darcy_1d",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Physics::Heat => "Heat conduction",
            Physics::Darcy => "Darcy flow",
        }
    }

    /// 快照中比较的列
    pub fn column(self) -> &'static str {
        match self {
            Physics::Heat => "temperature",
            Physics::Darcy => "liquid pressure",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Physics::Heat => "°C",
            Physics::Darcy => "MPa",
        }
    }

    fn fractions(self) -> &'static [f64] {
        match self {
            Physics::Heat => &HEAT_FRACTIONS,
            Physics::Darcy => &DARCY_FRACTIONS,
        }
    }

    /// 解析解参数
    pub fn slab(self) -> SwappedSlab {
        match self {
            Physics::Heat => SwappedSlab {
                length: LENGTH,
                v1: T1,
                v2: T2,
                diffusivity: HEAT_CONDUCTIVITY
                    / ((1.0 - HEAT_POROSITY) * ROCK_DENSITY * ROCK_SPECIFIC_HEAT),
            },
            Physics::Darcy => {
                let p_mean = 0.5 * (P1 + P2);
                let mu = eos::water_viscosity(p_mean, DARCY_T0);
                // 1/MPa -> 1/Pa
                let c_f = eos::water_compressibility(p_mean, DARCY_T0) * 1.0e-6;
                SwappedSlab {
                    length: LENGTH,
                    v1: P1,
                    v2: P2,
                    diffusivity: DARCY_PERMEABILITY / (DARCY_POROSITY * mu * c_f),
                }
            }
        }
    }

    /// 特征时间 (days)
    pub fn characteristic_days(self) -> f64 {
        self.slab().characteristic_time() / SECONDS_PER_DAY
    }

    pub fn tf_days(self) -> f64 {
        0.5 * self.characteristic_days()
    }

    pub fn output_times(self) -> Vec<f64> {
        let t_char = self.characteristic_days();
        self.fractions().iter().map(|f| f * t_char).collect()
    }

    /// 生成 n 个 x 方向节点的输入卡片
    pub fn deck(self, n_nodes: usize) -> Result<Deck> {
        if n_nodes < 3 {
            return Err(FehmError::InvalidArgument(format!(
                "diffusion grid needs at least 3 nodes along x, got {}",
                n_nodes
            )));
        }
        let x = linspace(0.0, LENGTH, n_nodes);
        let dx = LENGTH / (n_nodes - 1) as f64;
        let grid = Grid::make(&x, &CROSS_SECTION, &CROSS_SECTION, false)?;

        let mut deck = Deck::new(self.root(), grid);
        deck.add_boundary_zones();
        let tf = self.tf_days();

        match self {
            Physics::Heat => {
                deck.add(rock(HEAT_POROSITY), ZoneRef::All);
                deck.add(isotropic_perm(HEAT_PERMEABILITY), ZoneRef::All);
                deck.add(isotropic_cond(HEAT_CONDUCTIVITY), ZoneRef::All);
                deck.add(
                    Macro::Pres {
                        pressure: HEAT_P0,
                        temperature: T1,
                        saturation: 1,
                    },
                    ZoneRef::All,
                );
                deck.add(
                    Macro::Grad {
                        reference_coord: 0.0,
                        direction: 1,
                        variable: 2,
                        reference_value: T1,
                        gradient: (T2 - T1) / LENGTH,
                    },
                    ZoneRef::All,
                );
                let multiplier = HFLX_MULTIPLIER * (HFLX_REFERENCE_DX / dx);
                deck.fix_temperature("XMIN", T2, multiplier);
                deck.fix_temperature("XMAX", T1, multiplier);

                deck.time.dti = 1.0e-6;
                deck.time.dtmax = tf / 50.0;
                deck.time.dtmin = 1.0e-12;
            }
            Physics::Darcy => {
                deck.add(rock(DARCY_POROSITY), ZoneRef::All);
                deck.add(isotropic_perm(DARCY_PERMEABILITY), ZoneRef::All);
                deck.add(isotropic_cond(DARCY_CONDUCTIVITY), ZoneRef::All);
                deck.add(
                    Macro::Pres {
                        pressure: P1,
                        temperature: DARCY_T0,
                        saturation: 1,
                    },
                    ZoneRef::All,
                );
                deck.add(
                    Macro::Grad {
                        reference_coord: 0.0,
                        direction: 1,
                        variable: 1,
                        reference_value: P1,
                        gradient: (P2 - P1) / LENGTH,
                    },
                    ZoneRef::All,
                );
                deck.fix_pressure("XMIN", P2, DARCY_T0);
                deck.fix_pressure("XMAX", P1, DARCY_T0);

                deck.time.dti = tf / 1.0e5;
                deck.time.dtmax = tf / 20.0;
                deck.time.dtmin = 1.0e-10;
            }
        }

        deck.time.tf = tf;
        deck.time.output_times = self.output_times();
        deck.cont.variables = vec!["pressure".to_string(), "temperature".to_string()];
        deck.cont.format = "surf".to_string();
        Ok(deck)
    }
}

fn rock(porosity: f64) -> Macro {
    Macro::Rock {
        density: ROCK_DENSITY,
        specific_heat: ROCK_SPECIFIC_HEAT,
        porosity,
    }
}

fn isotropic_perm(k: f64) -> Macro {
    Macro::Perm { kx: k, ky: k, kz: k }
}

fn isotropic_cond(k: f64) -> Macro {
    Macro::Cond { x: k, y: k, z: k }
}

// ─────────────────────────────────────────────────────────────
// 结果比较
// ─────────────────────────────────────────────────────────────

/// 单个分辨率的比较结果
#[derive(Debug, Clone)]
pub struct Comparison {
    pub physics: Physics,
    pub n_nodes: usize,
    /// 输出时刻 (days)
    pub times: Vec<f64>,
    /// 每个时刻的 (x, 数值解, 解析解)
    pub profiles: Vec<(Vec<f64>, Vec<f64>, Vec<f64>)>,
    pub max_abs: f64,
    pub max_rms: f64,
}

/// 读取工作目录并与解析解比较
pub fn compare(physics: Physics, n_nodes: usize, work_dir: &Path, terms: usize) -> Result<Comparison> {
    let coords = grid_inp::parse_grid_coords(&work_dir.join(GRID_FILE))?;
    let contours = contour::read_contours(work_dir, physics.root())?;
    compare_snapshots(physics, n_nodes, &contours, &coords, terms)
}

/// 对每个 t > 0 的快照求 x 剖面并计算内部点误差
pub fn compare_snapshots(
    physics: Physics,
    n_nodes: usize,
    contours: &Contour,
    coords: &NodeCoords,
    terms: usize,
) -> Result<Comparison> {
    let slab = physics.slab();
    let mut times = Vec::new();
    let mut profiles = Vec::new();
    let mut per_time = Vec::new();

    for snapshot in contours.snapshots.iter().filter(|s| s.time > 0.0) {
        let Some((xs, numerical)) = contour::profile(snapshot, coords, physics.column(), 0) else {
            continue;
        };
        let t = snapshot.time * SECONDS_PER_DAY;
        let analytical: Vec<f64> = xs.iter().map(|&x| slab.value(x, t, terms)).collect();
        if let Some(e) = diffusion::errors(&xs, &numerical, &analytical, LENGTH) {
            per_time.push(e);
        }
        times.push(snapshot.time);
        profiles.push((xs, numerical, analytical));
    }

    if times.is_empty() {
        return Err(FehmError::Other(format!(
            "no '{}' contour snapshots found for {}",
            physics.column(),
            physics.root()
        )));
    }

    let (max_abs, max_rms) = diffusion::aggregate(&per_time);
    Ok(Comparison {
        physics,
        n_nodes,
        times,
        profiles,
        max_abs,
        max_rms,
    })
}

/// 收敛表格行
#[derive(Debug, Clone, Tabled)]
struct ConvergenceRow {
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "Max Abs Error")]
    max_abs: String,
    #[tabled(rename = "Max RMS Error")]
    max_rms: String,
    #[tabled(rename = "Ratio to prev")]
    ratio: String,
}

fn convergence_rows(results: &[&Comparison]) -> Vec<ConvergenceRow> {
    let max_errors: Vec<f64> = results.iter().map(|c| c.max_abs).collect();
    let ratios = diffusion::convergence_ratios(&max_errors);
    results
        .iter()
        .zip(ratios)
        .map(|(c, ratio)| ConvergenceRow {
            nodes: c.n_nodes,
            max_abs: format!("{:.6} {}", c.max_abs, c.physics.unit()),
            max_rms: format!("{:.6} {}", c.max_rms, c.physics.unit()),
            ratio: ratio.map_or("-".to_string(), |r| format!("{:.2}", r)),
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────
// 执行
// ─────────────────────────────────────────────────────────────

/// 执行扩散校验
pub fn execute(ctx: &Context, args: DiffusionArgs) -> Result<Vec<Metric>> {
    output::print_header("1D Diffusion Verification");

    let mut resolutions: Vec<usize> = parse_list(&args.resolutions).map_err(FehmError::InvalidList)?;
    resolutions.sort_unstable();
    resolutions.dedup();

    let physics: Vec<Physics> = match args.mode {
        DiffusionMode::Heat => vec![Physics::Heat],
        DiffusionMode::Darcy => vec![Physics::Darcy],
        DiffusionMode::Both => vec![Physics::Heat, Physics::Darcy],
    };

    for p in &physics {
        let slab = p.slab();
        output::print_info(p.label());
        output::print_kv("Diffusivity (m²/s)", &output::sci(slab.diffusivity));
        output::print_kv("Characteristic time (days)", &format!("{:.6}", p.characteristic_days()));
        output::print_kv("Final time (days)", &format!("{:.6}", p.tf_days()));
        output::print_kv(
            "Boundary values",
            &format!("{} -> {} / {} -> {} {}", slab.v1, slab.v2, slab.v2, slab.v1, p.unit()),
        );
    }
    output::print_kv("Resolutions", &format!("{:?}", resolutions));

    let mut jobs = Vec::new();
    for p in &physics {
        for &n in &resolutions {
            let name = format!("{}_n{}", p.root(), n);
            jobs.push(Job {
                work_dir: ctx.work_dir("diffusion", &name),
                name,
                deck: p.deck(n)?,
                spec: (*p, n),
            });
        }
    }

    let terms = args.terms.max(2);
    let results = ctx.run_jobs(&jobs, "Diffusion", |job| {
        let (p, n) = job.spec;
        compare(p, n, &job.work_dir, terms)
    })?;

    let mut metrics = Vec::new();
    let mut figure = Figure::new("1D diffusion with swapped boundaries", 2);

    for p in &physics {
        let done: Vec<&Comparison> = results
            .iter()
            .flatten()
            .filter(|c| c.physics == *p)
            .collect();
        if done.is_empty() {
            continue;
        }

        output::print_header(&format!("{}: grid convergence", p.label()));
        println!("{}", Table::new(convergence_rows(&done)));

        for c in &done {
            metrics.push(Metric::new(
                p.root(),
                &format!("max_abs_error_n{}", c.n_nodes),
                c.max_abs,
                p.unit(),
            ));
            metrics.push(Metric::new(
                p.root(),
                &format!("max_rms_error_n{}", c.n_nodes),
                c.max_rms,
                p.unit(),
            ));
        }

        if let Some(finest) = done.last() {
            let (profiles, errors) = comparison_panels(finest);
            figure.push(profiles);
            figure.push(errors);
        }
    }

    if !figure.panels.is_empty() {
        ctx.save_plot(&figure, "diffusion_results")?;
    }

    Ok(metrics)
}

/// 剖面图与误差图
fn comparison_panels(c: &Comparison) -> (Panel, Panel) {
    let p = c.physics;
    let slab = p.slab();
    let y_label = format!("{} ({})", p.column(), p.unit());

    let mut profiles = Panel::new(
        &format!("{} (n = {}): markers numerical, lines analytical", p.label(), c.n_nodes),
        "x (m)",
        &y_label,
    );
    let mut errors = Panel::new(
        &format!("{}: numerical - analytical", p.label()),
        "x (m)",
        &format!("error ({})", p.unit()),
    );

    for (i, (t, (xs, num, ana))) in c.times.iter().zip(&c.profiles).enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let label = format!("t = {:.4} d", t);
        profiles = profiles
            .with(Series::new(&label, xs, ana, color, Style::Line))
            .with(Series::new("", xs, num, color, Style::Markers));
        let diff: Vec<f64> = num.iter().zip(ana).map(|(n, a)| n - a).collect();
        errors = errors.with(Series::new(&label, xs, &diff, color, Style::Line));
    }

    let x_fine = linspace(0.0, LENGTH, 100);
    let initial: Vec<f64> = x_fine.iter().map(|&x| slab.initial(x)).collect();
    let steady: Vec<f64> = x_fine.iter().map(|&x| slab.steady_state(x)).collect();
    profiles = profiles
        .with(Series::new("initial", &x_fine, &initial, PALETTE[5], Style::Dashed))
        .with(Series::new("steady state", &x_fine, &steady, PALETTE[5], Style::Line));

    (profiles, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::contour::parse_snapshot_content;

    #[test]
    fn test_heat_diffusivity_and_times() {
        let slab = Physics::Heat.slab();
        assert!((slab.diffusivity - 2.5 / (0.99 * 2.5e6)).abs() < 1e-15);
        let t_char = Physics::Heat.characteristic_days();
        assert!((t_char - 11.4583).abs() < 1e-3);
        let times = Physics::Heat.output_times();
        assert_eq!(times.len(), 6);
        assert!((times[5] - Physics::Heat.tf_days()).abs() < 1e-12);
    }

    #[test]
    fn test_darcy_diffusivity_order_of_magnitude() {
        let d = Physics::Darcy.slab().diffusivity;
        assert!(d > 1.0e-5 && d < 3.0e-5, "D = {}", d);
    }

    #[test]
    fn test_heat_deck_contents() {
        let deck = Physics::Heat.deck(21).unwrap();
        assert_eq!(deck.grid.number_nodes(), 21 * 4);
        let text = deck.render().unwrap();
        assert!(text.contains("grad\n1\n0 0. 1 2 1.00000000e1 1.00000000e1\n"));
        // dx = 0.05 keeps the reference multiplier
        assert!(text.contains("-999 0 0 2.00000000e1 5.00000000e-5"));
        assert!(text.contains("-998 0 0 1.00000000e1 5.00000000e-5"));
        assert!(deck.cont.variables.contains(&"temperature".to_string()));
    }

    #[test]
    fn test_darcy_deck_boundaries() {
        let deck = Physics::Darcy.deck(11).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("-999 0 0 2.00000000e0 -1.50000000e1 1.00000000e6"));
        assert!(text.contains("-998 0 0 1.00000000e0 -1.50000000e1 1.00000000e6"));
        assert!((deck.time.dtmax - deck.time.tf / 20.0).abs() < 1e-15);
    }

    #[test]
    fn test_too_few_nodes() {
        assert!(Physics::Heat.deck(2).is_err());
    }

    #[test]
    fn test_compare_exact_steady_profile() {
        let coords: NodeCoords = (1..=4)
            .map(|n| (n, [(n - 1) as f64 / 3.0, 0.0, 0.0]))
            .collect();
        // late time: the analytical solution equals the steady state
        let t_days = 1.0e4;
        let slab = Physics::Heat.slab();
        let mut csv = String::from("node, x (m), Temperature (deg C)\n");
        for (n, p) in &coords {
            csv.push_str(&format!("{}, {}, {}\n", n, p[0], slab.steady_state(p[0])));
        }
        let contours = Contour {
            snapshots: vec![
                parse_snapshot_content(&csv, 0.0).unwrap(),
                parse_snapshot_content(&csv, t_days).unwrap(),
            ],
        };

        let c = compare_snapshots(Physics::Heat, 4, &contours, &coords, 200).unwrap();
        assert_eq!(c.times, vec![t_days]);
        assert!(c.max_abs < 1e-9);
        assert_eq!(c.profiles[0].0.len(), 4);
    }

    #[test]
    fn test_compare_without_column() {
        let coords: NodeCoords = [(1, [0.5, 0.0, 0.0])].into_iter().collect();
        let contours = Contour {
            snapshots: vec![parse_snapshot_content("node, Temperature (deg C)\n1, 15.0\n", 1.0).unwrap()],
        };
        assert!(compare_snapshots(Physics::Darcy, 2, &contours, &coords, 10).is_err());
    }
}
