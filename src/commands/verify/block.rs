//! # 单块体守恒校验
//!
//! 2×2×2 节点（一个 1 m³ 单元）的封闭块体：
//! - 质量注入：按目标压升速率换算注入量，与常 β 线性解和变 β ODE 解比较
//! - 热量注入：`hflx` 固定加热功率，与 `ΔT = Q t / C` 比较
//!
//! ## 依赖关系
//! - 使用 `reference/balance.rs`
//! - 使用 `parsers/history.rs`

use super::{Context, Job, Metric};
use crate::cli::verify::{BlockArgs, BlockMode};
use crate::error::{FehmError, Result};
use crate::models::deck::Macro;
use crate::models::grid::Grid;
use crate::models::{Deck, ZoneRef};
use crate::parsers::history::{self, History};
use crate::reference::balance::{self, HeatCapacity, MassInjection};
use crate::reference::radial::interp;
use crate::utils::output;
use crate::utils::plot::{Figure, Panel, Series, Style, PALETTE};

use std::path::Path;

const VOLUME: f64 = 1.0;
const POROSITY: f64 = 0.1;
const P0: f64 = 1.0;
const T0: f64 = 25.0;
const ROCK_DENSITY: f64 = 2500.0;
const ROCK_SPECIFIC_HEAT: f64 = 1000.0;
const PERMEABILITY: f64 = 1.0e-25;
const N_NODES: usize = 8;
/// 变 β ODE 输出点数
const ODE_POINTS: usize = 100;
const HISTORY_NODE: usize = 1;

/// 块体测试类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    Mass,
    Heat,
}

impl Test {
    pub fn root(self) -> &'static str {
        match self {
            Test::Mass => "mass_test",
            Test::Heat => "heat_test",
        }
    }
}

fn base_deck(root: &str) -> Result<Deck> {
    let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false)?;
    let mut deck = Deck::new(root, grid);
    deck.add(
        Macro::Rock {
            density: ROCK_DENSITY,
            specific_heat: ROCK_SPECIFIC_HEAT,
            porosity: POROSITY,
        },
        ZoneRef::All,
    );
    deck.add(
        Macro::Perm {
            kx: PERMEABILITY,
            ky: PERMEABILITY,
            kz: PERMEABILITY,
        },
        ZoneRef::All,
    );
    deck.add(
        Macro::Pres {
            pressure: P0,
            temperature: T0,
            saturation: 1,
        },
        ZoneRef::All,
    );
    deck.hist.nodes = vec![HISTORY_NODE];
    deck.hist.variables = vec!["pressure".to_string(), "temperature".to_string()];
    deck.cont.variables = vec!["pressure".to_string(), "temperature".to_string()];
    Ok(deck)
}

/// 质量注入卡片：总速率平均分配到 8 个节点
pub fn mass_deck(mass_rate: f64, tf: f64) -> Result<Deck> {
    let mut deck = base_deck(Test::Mass.root())?;
    deck.add(
        Macro::Flow {
            rate: -mass_rate / N_NODES as f64,
            energy: -T0,
            impedance: 0.0,
        },
        ZoneRef::All,
    );
    deck.time.tf = tf;
    deck.time.dti = 0.001;
    deck.time.dtmax = 0.01;
    deck.hist.time_interval = 0.01;
    deck.cont.time_interval = 0.1;
    Ok(deck)
}

/// 热量注入卡片：总功率平均分配到 8 个节点
pub fn heat_deck(q_mw: f64, tf: f64) -> Result<Deck> {
    let mut deck = base_deck(Test::Heat.root())?;
    deck.fix_heating_rate(ZoneRef::All, q_mw / N_NODES as f64);
    deck.time.tf = tf;
    deck.time.dti = 0.01;
    deck.time.dtmax = 0.5;
    deck.hist.time_interval = 0.1;
    deck.cont.time_interval = 1.0;
    Ok(deck)
}

/// 块体节点 1 的压力与温度历史
#[derive(Debug, Clone)]
pub struct BlockHistory {
    pub times: Vec<f64>,
    pub pressure: Vec<f64>,
    pub temperature: Vec<f64>,
}

impl BlockHistory {
    pub fn from_histories(pressure: &History, temperature: &History) -> Result<Self> {
        let p = pressure
            .series(HISTORY_NODE)
            .or_else(|| pressure.first_series())
            .ok_or_else(|| FehmError::Other("pressure history has no node columns".into()))?;
        let t = temperature
            .series(HISTORY_NODE)
            .or_else(|| temperature.first_series())
            .ok_or_else(|| FehmError::Other("temperature history has no node columns".into()))?;
        if p.is_empty() {
            return Err(FehmError::Other("pressure history is empty".into()));
        }
        Ok(BlockHistory {
            times: pressure.times.clone(),
            pressure: p.to_vec(),
            temperature: t.to_vec(),
        })
    }

    pub fn read(work_dir: &Path, root: &str) -> Result<Self> {
        let pressure = history::parse_history(&history::history_path(work_dir, root, "presWAT"))?;
        let temperature = history::parse_history(&history::history_path(work_dir, root, "temp"))?;
        Self::from_histories(&pressure, &temperature)
    }

    pub fn final_pressure_rise(&self) -> f64 {
        self.pressure.last().map_or(0.0, |p| p - P0)
    }

    pub fn final_temperature_rise(&self) -> f64 {
        self.temperature.last().map_or(0.0, |t| t - T0)
    }
}

/// 执行块体校验
pub fn execute(ctx: &Context, args: BlockArgs) -> Result<Vec<Metric>> {
    output::print_header("Single Block Verification");
    if args.tf <= 0.0 {
        return Err(FehmError::InvalidArgument(format!(
            "final time must be positive, got {}",
            args.tf
        )));
    }

    let pore_volume = VOLUME * POROSITY;
    let mut jobs = Vec::new();
    let mut mass_ref: Option<MassInjection> = None;
    let mut heat_ref: Option<HeatCapacity> = None;

    if matches!(args.mode, BlockMode::Mass | BlockMode::Both) {
        let mass_rate = balance::rate_for_target(args.target_rate, pore_volume, P0, T0);
        let reference = balance::mass_injection(mass_rate, pore_volume, P0, T0, args.tf, ODE_POINTS)?;
        let (dp_const, dp_var) = reference.final_rise();

        output::print_info("Mass injection");
        output::print_kv("Pore volume (m³)", &format!("{}", pore_volume));
        output::print_kv("Total mass rate (kg/s)", &output::sci(mass_rate));
        output::print_kv("Rate per node (kg/s)", &output::sci(mass_rate / N_NODES as f64));
        output::print_kv("Expected dP, constant β", &output::fixed(dp_const, 6, "MPa"));
        output::print_kv("Expected dP, variable β", &output::fixed(dp_var, 6, "MPa"));

        jobs.push(Job {
            name: Test::Mass.root().to_string(),
            work_dir: ctx.work_dir("block", Test::Mass.root()),
            deck: mass_deck(mass_rate, args.tf)?,
            spec: Test::Mass,
        });
        mass_ref = Some(reference);
    }

    if matches!(args.mode, BlockMode::Heat | BlockMode::Both) {
        let capacity = balance::heat_capacity(VOLUME, POROSITY, ROCK_DENSITY, ROCK_SPECIFIC_HEAT, P0, T0);
        let rise = capacity.rise_per_day(args.heat_rate);

        output::print_info("Heat injection");
        output::print_kv("Rock heat capacity (MJ/K)", &format!("{:.6}", capacity.rock / 1.0e6));
        output::print_kv("Water heat capacity (MJ/K)", &format!("{:.6}", capacity.water / 1.0e6));
        output::print_kv("Heating rate per node (MW)", &output::sci(args.heat_rate / N_NODES as f64));
        output::print_kv("Expected dT/dt", &output::fixed(rise, 6, "°C/day"));
        output::print_kv("Expected dT", &output::fixed(rise * args.tf, 4, "°C"));

        jobs.push(Job {
            name: Test::Heat.root().to_string(),
            work_dir: ctx.work_dir("block", Test::Heat.root()),
            deck: heat_deck(args.heat_rate, args.tf)?,
            spec: Test::Heat,
        });
        heat_ref = Some(capacity);
    }

    let results = ctx.run_jobs(&jobs, "Block", |job| BlockHistory::read(&job.work_dir, &job.deck.root))?;

    let mut metrics = Vec::new();
    let mut figure = Figure::new("Single block balance", 2);

    for (job, result) in jobs.iter().zip(&results) {
        let Some(hist) = result else { continue };
        match job.spec {
            Test::Mass => {
                let Some(reference) = &mass_ref else { continue };
                let (dp_const, dp_var) = reference.final_rise();
                let dp = hist.final_pressure_rise();
                output::print_info(&format!("Mass test: {} history points", hist.times.len()));
                output::print_kv("Final pressure", &output::fixed(P0 + dp, 6, "MPa"));
                output::print_kv("Ratio (actual / constant β)", &format!("{:.6}", dp / dp_const));
                output::print_kv("Ratio (actual / variable β)", &format!("{:.6}", dp / dp_var));

                metrics.push(Metric::new("block_mass", "dP vs constant beta", dp, "MPa").with_reference(dp_const));
                metrics.push(Metric::new("block_mass", "dP vs variable beta", dp, "MPa").with_reference(dp_var));
                let (a, b) = mass_panels(hist, reference);
                figure.push(a);
                figure.push(b);
            }
            Test::Heat => {
                let Some(capacity) = &heat_ref else { continue };
                let expected = capacity.rise_per_day(args.heat_rate) * args.tf;
                let dt = hist.final_temperature_rise();
                output::print_info(&format!("Heat test: {} history points", hist.times.len()));
                output::print_kv("Final temperature", &output::fixed(T0 + dt, 6, "°C"));
                output::print_kv("Ratio (actual / expected)", &format!("{:.4}", dt / expected));

                metrics.push(Metric::new("block_heat", "dT", dt, "°C").with_reference(expected));
                let (a, b) = heat_panels(hist, capacity.rise_per_day(args.heat_rate));
                figure.push(a);
                figure.push(b);
            }
        }
    }

    if !figure.panels.is_empty() {
        ctx.save_plot(&figure, "block_results")?;
    }
    Ok(metrics)
}

/// 相对误差 (%)，分母为参考增量
fn relative_error(actual: &[f64], expected: &[f64], base: f64) -> Vec<f64> {
    actual
        .iter()
        .zip(expected)
        .map(|(a, e)| (a - e) / (e - base + 1.0e-10) * 100.0)
        .collect()
}

fn mass_panels(hist: &BlockHistory, reference: &MassInjection) -> (Panel, Panel) {
    let constant: Vec<f64> = hist.times.iter().map(|&t| reference.pressure_constant(t)).collect();
    let variable: Vec<f64> = hist
        .times
        .iter()
        .map(|&t| interp(t, &reference.times, &reference.pressure_variable))
        .collect();

    let rise = Panel::new("Mass injection: pressure rise", "time (days)", "pressure (MPa)")
        .with(Series::new("FEHM", &hist.times, &hist.pressure, PALETTE[0], Style::Line))
        .with(Series::new("constant β", &hist.times, &constant, PALETTE[1], Style::Dashed))
        .with(Series::new(
            "variable β",
            &reference.times,
            &reference.pressure_variable,
            PALETTE[2],
            Style::Dashed,
        ));
    let error = Panel::new("Mass injection: error vs variable β", "time (days)", "relative error (%)")
        .with(Series::new(
            "",
            &hist.times,
            &relative_error(&hist.pressure, &variable, P0),
            PALETTE[0],
            Style::Line,
        ));
    (rise, error)
}

fn heat_panels(hist: &BlockHistory, rise_per_day: f64) -> (Panel, Panel) {
    let expected: Vec<f64> = hist.times.iter().map(|&t| T0 + rise_per_day * t).collect();
    let rise = Panel::new("Heat injection: temperature rise", "time (days)", "temperature (°C)")
        .with(Series::new("FEHM", &hist.times, &hist.temperature, PALETTE[0], Style::Line))
        .with(Series::new("expected (linear)", &hist.times, &expected, PALETTE[1], Style::Dashed));
    let error = Panel::new("Heat injection: temperature error", "time (days)", "relative error (%)")
        .with(Series::new(
            "",
            &hist.times,
            &relative_error(&hist.temperature, &expected, T0),
            PALETTE[0],
            Style::Line,
        ));
    (rise, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::history::parse_history_content;

    #[test]
    fn test_mass_deck_rate_per_node() {
        let deck = mass_deck(8.0e-6, 1.0).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("flow\n1 0 0 -1.00000000e-6 -2.50000000e1 0.\n"));
        assert!(text.contains("perm\n1 0 0 1.00000000e-25"));
        assert_eq!(deck.root, "mass_test");
        assert_eq!(deck.hist.nodes, vec![1]);
    }

    #[test]
    fn test_heat_deck_uses_heating_rate() {
        let deck = heat_deck(3.0e-5, 1.0).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("hflx\n1 0 0 -3.75000000e-6 0.\n"));
        assert!((deck.time.dtmax - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_block_history_final_rises() {
        let p = parse_history_content(
            "variables = \"Time (days)\" \"Node 1\"\n0 1.0\n0.5 1.5\n1.0 1.98\n",
            "presWAT",
        );
        let t = parse_history_content(
            "variables = \"Time (days)\" \"Node 1\"\n0 25.0\n0.5 25.5\n1.0 26.0\n",
            "temp",
        );
        let hist = BlockHistory::from_histories(&p, &t).unwrap();
        assert!((hist.final_pressure_rise() - 0.98).abs() < 1e-12);
        assert!((hist.final_temperature_rise() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_history_is_error() {
        let p = parse_history_content("variables = \"Time (days)\" \"Node 1\"\n", "presWAT");
        assert!(BlockHistory::from_histories(&p, &p).is_err());
    }

    #[test]
    fn test_relative_error() {
        let e = relative_error(&[2.0], &[2.0], 1.0);
        assert!(e[0].abs() < 1e-12);
        let e = relative_error(&[2.1], &[2.0], 1.0);
        assert!((e[0] - 10.0).abs() < 1e-6);
    }
}
