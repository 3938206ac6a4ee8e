//! # CO2 模块校验
//!
//! 单块体和小柱体上的 CO2 模块冒烟测试：
//! - `co2-injection`: 纯 CO2 块体，节点 1 处压力驱动注入
//! - `co2-column`: 2×2×4 竖直柱体，顶层 CO2、底部定压，重力开启
//! - `co2-static`: 无注入的静态 CO2 / 水+CO2 设置，逐项 PASS/FAIL
//!
//! 这些案例没有解析解，比较的是历史变量的初值与终值。
//!
//! ## 依赖关系
//! - 使用 `parsers/history.rs`
//! - 使用 `models/deck.rs` 的 carb 子宏

use super::{Context, Job, Metric};
use crate::cli::parse_list;
use crate::cli::verify::{Co2ColumnArgs, Co2InjectionArgs, Co2StaticArgs};
use crate::error::{FehmError, Result};
use crate::models::deck::{Macro, RelPerm};
use crate::models::grid::{Axis, Grid};
use crate::models::{Deck, ZoneRef};
use crate::parsers::history::{self, History};
use crate::utils::output;
use crate::utils::plot::{Figure, Panel, Series, Style, PALETTE};

use std::collections::BTreeMap;
use tabled::{Table, Tabled};

const P0: f64 = 10.0;
const T0: f64 = 50.0;
const POROSITY: f64 = 0.3;
const PERMEABILITY: f64 = 1.0e-14;
const CONDUCTIVITY: f64 = 2.0;
const ROCK_DENSITY: f64 = 2500.0;
const ROCK_SPECIFIC_HEAT: f64 = 1000.0;

/// 注入区域编号
const INJECTION_ZONE: usize = 100;
/// 静态测试的出口区域编号
const OUTLET_ZONE: usize = 200;
const COLUMN_WATER_ZONE: usize = 10;
const COLUMN_CO2_ZONE: usize = 20;
const COLUMN_TOP_Z: f64 = 2.5;
const COLUMN_TORTUOSITY: f64 = 0.5;

/// 水-CO2 相对渗透率模型 17 的参数
const RLP_17: [f64; 14] = [
    0.05, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0,
];

/// co2pres 相态：1 液相，4 超临界
const PHASE_LIQUID: u8 = 1;
const PHASE_SUPERCRITICAL: u8 = 4;

// ─────────────────────────────────────────────────────────────
// 卡片构造
// ─────────────────────────────────────────────────────────────

fn co2_pres(phase: u8) -> Macro {
    Macro::Co2Pres {
        pressure: P0,
        temperature: T0,
        phase,
    }
}

fn co2_frac(water_rich_sat: f64, co2_rich_sat: f64) -> Macro {
    Macro::Co2Frac {
        water_rich_sat,
        co2_rich_sat,
        co2_mass_frac: 0.0,
        init_salt_conc: 0.0,
        override_flag: 1,
    }
}

/// 压力驱动的 CO2 边界（bc_flag = 1）
fn co2_pressure_flow(pressure: f64, impedance: f64) -> Macro {
    Macro::Co2Flow {
        rate: pressure,
        energy: -T0,
        impedance,
        bc_flag: 1,
    }
}

/// 岩石、渗透率、热导和初始压力温度
fn base_deck(root: &str, grid: Grid, co2_table: String) -> Deck {
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
        Macro::Cond {
            x: CONDUCTIVITY,
            y: CONDUCTIVITY,
            z: CONDUCTIVITY,
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
    deck.nobr = true;
    deck.co2_table = Some(co2_table);
    deck
}

fn unit_block() -> Result<Grid> {
    Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false)
}

/// 纯 CO2 块体，节点 1 处以 `P0 + overpressure` 注入
pub fn injection_deck(args: &Co2InjectionArgs, co2_table: String) -> Result<Deck> {
    let mut deck = base_deck("co2_test", unit_block()?, co2_table);
    deck.carb_on(2);
    deck.add(co2_pres(PHASE_SUPERCRITICAL), ZoneRef::All);
    deck.add(co2_frac(0.0, 1.0), ZoneRef::All);

    deck.new_zone(INJECTION_ZONE, Some("injection"), vec![1]);
    deck.add(co2_pressure_flow(P0 + args.overpressure, args.impedance), INJECTION_ZONE);

    deck.time.tf = args.tf;
    deck.time.dti = 0.001;
    deck.time.dtmax = 0.1;
    deck.ctrl.max_newton_iterations = 100;

    deck.hist.nodes = vec![1];
    deck.hist.variables = vec!["pressure".into(), "temperature".into(), "saturation".into()];
    deck.hist.time_interval = 0.1;
    deck.cont.variables = vec!["pressure".into(), "temperature".into(), "co2s".into()];
    deck.cont.time_interval = 1.0;
    Ok(deck)
}

/// 各深度的第一个节点（自底向上）
pub fn column_monitor_nodes(grid: &Grid) -> Vec<usize> {
    grid.unique_coords(Axis::Z)
        .iter()
        .filter_map(|&z| {
            grid.nodes_where(Axis::Z, |v| (v - z).abs() < 1.0e-6)
                .first()
                .copied()
        })
        .collect()
}

/// 竖直柱体：下部为水，顶层为 CO2，底面定压
pub fn column_deck(args: &Co2ColumnArgs, co2_table: String) -> Result<Deck> {
    let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0, 2.0, 3.0], false)?;
    let water = grid.nodes_where(Axis::Z, |z| z < COLUMN_TOP_Z);
    let co2 = grid.nodes_where(Axis::Z, |z| z > COLUMN_TOP_Z);
    let bottom = grid.nodes_where(Axis::Z, |z| z.abs() < 1.0e-6);
    let monitor = column_monitor_nodes(&grid);

    let mut deck = base_deck("co2_column", grid, co2_table);
    deck.ctrl.gravity_direction = 3;
    deck.rlp.push(RelPerm {
        index: 17,
        params: RLP_17.to_vec(),
    });
    deck.carb_on(4);
    deck.add(
        Macro::Co2Diff {
            diffusivity: args.diffusivity,
            tortuosity: COLUMN_TORTUOSITY,
        },
        ZoneRef::All,
    );

    deck.new_zone(COLUMN_WATER_ZONE, Some("water"), water);
    deck.new_zone(COLUMN_CO2_ZONE, Some("co2"), co2);
    deck.new_zone(INJECTION_ZONE, Some("bottom"), bottom);

    deck.add(co2_pres(PHASE_LIQUID), COLUMN_WATER_ZONE);
    deck.add(co2_frac(1.0, 0.0), COLUMN_WATER_ZONE);
    deck.add(co2_pres(PHASE_SUPERCRITICAL), COLUMN_CO2_ZONE);
    deck.add(co2_frac(0.2, 0.8), COLUMN_CO2_ZONE);
    deck.fix_pressure(INJECTION_ZONE, P0, T0);

    deck.time.tf = args.tf;
    deck.time.dti = 1.0e-4;
    deck.time.dtmax = 10.0;
    deck.time.dtmin = 1.0e-10;

    deck.ctrl.max_newton_iterations = 100;
    deck.ctrl.max_multiply_iterations = 100;
    deck.ctrl.orthogonalizations = 200;
    deck.ctrl.max_solver_iterations = 200;
    deck.ctrl.timestep_multiplier = 1.3;
    deck.iter.g3 = 1.0e-3;
    deck.iter.machine_tolerance = -1.0e-3;

    deck.hist.nodes = monitor;
    deck.hist.variables = vec![
        "pressure".into(),
        "temperature".into(),
        "saturation".into(),
        "co2m".into(),
    ];
    deck.hist.time_interval = 10.0;
    deck.cont.variables = vec![
        "pressure".into(),
        "temperature".into(),
        "co2s".into(),
        "co2m".into(),
    ];
    deck.cont.time_interval = 100.0;
    Ok(deck)
}

/// 静态测试子项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticTest {
    /// 纯 CO2，无边界
    CO2Only,
    /// 水 + CO2，出口定压
    WaterCo2,
    /// 水 + CO2，出口定压 + 入口注入
    WaterCo2Injection,
    /// 纯 CO2，封闭块体注入
    ClosedInjection,
}

impl StaticTest {
    pub fn parse(letter: char) -> Result<Self> {
        match letter.to_ascii_lowercase() {
            'a' => Ok(StaticTest::CO2Only),
            'b' => Ok(StaticTest::WaterCo2),
            'c' => Ok(StaticTest::WaterCo2Injection),
            'd' => Ok(StaticTest::ClosedInjection),
            other => Err(FehmError::InvalidArgument(format!(
                "unknown static sub-test '{}', expected a, b, c or d",
                other
            ))),
        }
    }

    pub fn root(self) -> &'static str {
        match self {
            StaticTest::CO2Only => "test2a",
            StaticTest::WaterCo2 => "test2b",
            StaticTest::WaterCo2Injection => "test2c",
            StaticTest::ClosedInjection => "test2d",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StaticTest::CO2Only => "CO2 only, no boundaries",
            StaticTest::WaterCo2 => "water + CO2, pressure outlet",
            StaticTest::WaterCo2Injection => "water + CO2, outlet and injection",
            StaticTest::ClosedInjection => "CO2 only, closed injection",
        }
    }

    /// 需要报告初值→终值的历史变量
    pub fn reported_variable(self) -> Option<&'static str> {
        match self {
            StaticTest::WaterCo2Injection => Some("satr"),
            StaticTest::ClosedInjection => Some("presCO2"),
            _ => None,
        }
    }
}

/// 静态测试卡片
pub fn static_deck(test: StaticTest, co2_table: String) -> Result<Deck> {
    let mut deck = base_deck(test.root(), unit_block()?, co2_table);
    deck.time.tf = 1.0;
    deck.time.dti = 0.01;
    deck.time.dtmax = 0.1;
    deck.ctrl.max_newton_iterations = 100;

    match test {
        StaticTest::CO2Only | StaticTest::ClosedInjection => {
            deck.carb_on(2);
            deck.add(co2_pres(PHASE_SUPERCRITICAL), ZoneRef::All);
            deck.add(co2_frac(0.0, 1.0), ZoneRef::All);
        }
        StaticTest::WaterCo2 | StaticTest::WaterCo2Injection => {
            deck.rlp.push(RelPerm {
                index: 17,
                params: RLP_17.to_vec(),
            });
            deck.carb_on(3);
            deck.add(co2_pres(PHASE_LIQUID), ZoneRef::All);
            deck.add(co2_frac(0.8, 0.2), ZoneRef::All);
            deck.new_zone(OUTLET_ZONE, Some("outlet"), vec![8]);
            deck.fix_pressure(OUTLET_ZONE, P0, T0);
            deck.add(co2_pressure_flow(P0, 1.0e-2), OUTLET_ZONE);
        }
    }

    match test {
        StaticTest::WaterCo2Injection => {
            deck.new_zone(INJECTION_ZONE, Some("injection"), vec![1]);
            deck.add(co2_pressure_flow(P0 + 2.0, 1.0e-2), INJECTION_ZONE);
            deck.add(co2_frac(0.2, 0.8), INJECTION_ZONE);
            deck.time.tf = 10.0;
        }
        StaticTest::ClosedInjection => {
            deck.new_zone(INJECTION_ZONE, Some("injection"), vec![1]);
            deck.add(co2_pressure_flow(P0 + 5.0, 1.0e-3), INJECTION_ZONE);
            deck.time.tf = 10.0;
            deck.time.dti = 0.001;
        }
        _ => {}
    }

    deck.hist.nodes = vec![1];
    deck.hist.variables = vec!["pressure".into(), "temperature".into(), "saturation".into()];
    deck.hist.time_interval = 0.1;
    Ok(deck)
}

// ─────────────────────────────────────────────────────────────
// 结果整理
// ─────────────────────────────────────────────────────────────

/// 某节点某变量的初值与终值
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryChange {
    pub variable: String,
    pub node: usize,
    pub initial: f64,
    pub last: f64,
}

impl HistoryChange {
    pub fn change(&self) -> f64 {
        self.last - self.initial
    }
}

/// 所有历史变量、所有节点的初值→终值
pub fn history_changes(histories: &BTreeMap<String, History>) -> Vec<HistoryChange> {
    let mut changes = Vec::new();
    for (variable, hist) in histories {
        for (node, values) in hist.nodes.iter().zip(&hist.values) {
            let (Some(&initial), Some(&last)) = (values.first(), values.last()) else {
                continue;
            };
            changes.push(HistoryChange {
                variable: variable.clone(),
                node: *node,
                initial,
                last,
            });
        }
    }
    changes
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Variable")]
    variable: String,
    #[tabled(rename = "Node")]
    node: usize,
    #[tabled(rename = "Initial")]
    initial: String,
    #[tabled(rename = "Final")]
    last: String,
    #[tabled(rename = "Change")]
    change: String,
}

impl From<&HistoryChange> for ChangeRow {
    fn from(c: &HistoryChange) -> Self {
        ChangeRow {
            variable: c.variable.clone(),
            node: c.node,
            initial: format!("{:.6}", c.initial),
            last: format!("{:.6}", c.last),
            change: format!("{:+.6}", c.change()),
        }
    }
}

fn print_changes(changes: &[HistoryChange]) {
    if changes.is_empty() {
        output::print_warning("No history output found");
        return;
    }
    let rows: Vec<ChangeRow> = changes.iter().map(ChangeRow::from).collect();
    println!("{}", Table::new(&rows));
}

/// 每个历史变量一张子图，每个节点一条曲线
fn history_figure(title: &str, histories: &BTreeMap<String, History>) -> Figure {
    let mut figure = Figure::new(title, 2);
    for (variable, hist) in histories {
        let mut panel = Panel::new(variable, "time (days)", variable);
        for (i, (node, values)) in hist.nodes.iter().zip(&hist.values).enumerate() {
            panel = panel.with(Series::new(
                &format!("node {}", node),
                &hist.times,
                values,
                PALETTE[i % PALETTE.len()],
                Style::Line,
            ));
        }
        figure.push(panel);
    }
    figure
}

fn read_job_histories<S>(job: &Job<S>) -> Result<BTreeMap<String, History>> {
    history::read_histories(&job.work_dir, &job.deck.root)
}

// ─────────────────────────────────────────────────────────────
// co2-injection
// ─────────────────────────────────────────────────────────────

pub fn execute_injection(ctx: &Context, args: Co2InjectionArgs) -> Result<Vec<Metric>> {
    output::print_header("CO2 Injection");
    output::print_kv("Initial state", &format!("{} MPa, {} °C", P0, T0));
    output::print_kv("Injection pressure", &output::fixed(P0 + args.overpressure, 2, "MPa"));
    output::print_kv("Impedance", &output::sci(args.impedance));

    let deck = injection_deck(&args, ctx.co2_table())?;
    let jobs = vec![Job {
        name: deck.root.clone(),
        work_dir: ctx.work_dir("co2_injection", &deck.root),
        deck,
        spec: (),
    }];
    let results = ctx.run_jobs(&jobs, "CO2 injection", read_job_histories)?;

    let mut metrics = Vec::new();
    let Some(Some(histories)) = results.into_iter().next() else {
        return Ok(metrics);
    };

    let changes = history_changes(&histories);
    print_changes(&changes);
    for c in changes.iter().filter(|c| c.node == 1) {
        let unit = match c.variable.as_str() {
            "presCO2" => "MPa",
            "temp" => "°C",
            _ => continue,
        };
        metrics.push(Metric::new(
            "co2_injection",
            &format!("{} change", c.variable),
            c.change(),
            unit,
        ));
    }

    ctx.save_plot(&history_figure("CO2 injection", &histories), "co2_injection_results")?;
    Ok(metrics)
}

// ─────────────────────────────────────────────────────────────
// co2-column
// ─────────────────────────────────────────────────────────────

pub fn execute_column(ctx: &Context, args: Co2ColumnArgs) -> Result<Vec<Metric>> {
    output::print_header("CO2 Column");
    let deck = column_deck(&args, ctx.co2_table())?;
    output::print_kv("Grid", &format!("{} nodes", deck.grid.number_nodes()));
    output::print_kv("Monitor nodes", &format!("{:?}", deck.hist.nodes));
    output::print_kv("CO2 diffusivity", &format!("{} m²/s", output::sci(args.diffusivity)));

    let jobs = vec![Job {
        name: deck.root.clone(),
        work_dir: ctx.work_dir("co2_column", &deck.root),
        deck,
        spec: (),
    }];
    let results = ctx.run_jobs(&jobs, "CO2 column", read_job_histories)?;

    let mut metrics = Vec::new();
    let Some(Some(histories)) = results.into_iter().next() else {
        return Ok(metrics);
    };

    let changes = history_changes(&histories);
    print_changes(&changes);
    for c in &changes {
        metrics.push(Metric::new(
            "co2_column",
            &format!("{} change node {}", c.variable, c.node),
            c.change(),
            "",
        ));
    }

    ctx.save_plot(&history_figure("CO2 column", &histories), "co2_column_results")?;
    Ok(metrics)
}

// ─────────────────────────────────────────────────────────────
// co2-static
// ─────────────────────────────────────────────────────────────

pub fn execute_static(ctx: &Context, args: Co2StaticArgs) -> Result<Vec<Metric>> {
    output::print_header("CO2 Static Tests");
    let letters = parse_list::<char>(&args.tests).map_err(FehmError::InvalidList)?;
    let mut tests: Vec<StaticTest> = Vec::new();
    for letter in letters {
        let test = StaticTest::parse(letter)?;
        if !tests.contains(&test) {
            tests.push(test);
        }
    }

    let mut jobs = Vec::new();
    for test in &tests {
        output::print_kv(test.root(), test.description());
        jobs.push(Job {
            name: test.root().to_string(),
            work_dir: ctx.work_dir("co2_static", test.root()),
            deck: static_deck(*test, ctx.co2_table())?,
            spec: *test,
        });
    }

    let results = ctx.run_jobs(&jobs, "CO2 static", read_job_histories)?;
    if ctx.dry_run() {
        return Ok(vec![]);
    }

    let mut metrics = Vec::new();
    for (job, result) in jobs.iter().zip(&results) {
        metrics.push(Metric::pass_fail("co2_static", job.spec.root(), result.is_some()));

        let (Some(histories), Some(variable)) = (result, job.spec.reported_variable()) else {
            continue;
        };
        if let Some(c) = history_changes(histories)
            .into_iter()
            .find(|c| c.variable == variable && c.node == 1)
        {
            output::print_kv(
                &format!("{} {}", job.spec.root(), variable),
                &format!("{:.6} -> {:.6}", c.initial, c.last),
            );
            metrics.push(Metric::new(
                "co2_static",
                &format!("{} {} change", job.spec.root(), variable),
                c.change(),
                "",
            ));
        }
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::history::parse_history_content;

    fn injection_args() -> Co2InjectionArgs {
        Co2InjectionArgs {
            overpressure: 2.0,
            impedance: 1.0e-2,
            tf: 10.0,
        }
    }

    #[test]
    fn test_injection_deck_carb_block() {
        let deck = injection_deck(&injection_args(), "table.txt".into()).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("nobr\ncarb\n2\n"));
        assert!(text.contains("co2pres\n1 0 0 1.00000000e1 5.00000000e1 4\n"));
        assert!(text.contains("co2flow\n-100 0 0 1.20000000e1 -5.00000000e1 1.00000000e-2 1\n"));
        assert!(deck.control_file().contains("co2in: table.txt"));
    }

    #[test]
    fn test_column_zones_and_monitor_nodes() {
        let args = Co2ColumnArgs {
            diffusivity: 2.0e-9,
            tf: 1000.0,
        };
        let deck = column_deck(&args, "table.txt".into()).unwrap();
        assert_eq!(deck.grid.number_nodes(), 16);
        assert_eq!(deck.hist.nodes.len(), 4);

        let water = deck.zone_nodes(&ZoneRef::Index(COLUMN_WATER_ZONE)).unwrap();
        let co2 = deck.zone_nodes(&ZoneRef::Index(COLUMN_CO2_ZONE)).unwrap();
        let bottom = deck.zone_nodes(&ZoneRef::Named("bottom".into())).unwrap();
        assert_eq!(water.len(), 12);
        assert_eq!(co2.len(), 4);
        assert_eq!(bottom.len(), 4);

        let text = deck.render().unwrap();
        assert!(text.contains("co2diff\n1 0 0 2.00000000e-9 5.00000000e-1\n"));
        assert!(text.contains("rlp\n17 "));
        assert_eq!(deck.time.dtmax, 10.0);
    }

    #[test]
    fn test_static_parse() {
        assert_eq!(StaticTest::parse('C').unwrap(), StaticTest::WaterCo2Injection);
        assert!(StaticTest::parse('e').is_err());
    }

    #[test]
    fn test_static_decks() {
        let b = static_deck(StaticTest::WaterCo2, "t".into()).unwrap();
        assert_eq!(b.carb, Some(3));
        assert!(b.render().unwrap().contains("flow\n-200 0 0 1.00000000e1"));

        let d = static_deck(StaticTest::ClosedInjection, "t".into()).unwrap();
        assert_eq!(d.carb, Some(2));
        assert!((d.time.tf - 10.0).abs() < 1e-12);
        assert!(d.render().unwrap().contains("-100 0 0 1.50000000e1"));
    }

    #[test]
    fn test_history_changes() {
        let mut histories = BTreeMap::new();
        histories.insert(
            "presCO2".to_string(),
            parse_history_content(
                "variables = \"Time (days)\" \"Node 1\" \"Node 5\"\n0 10 10\n10 11.5 10.2\n",
                "presCO2",
            ),
        );
        let changes = history_changes(&histories);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].node, 1);
        assert!((changes[0].change() - 1.5).abs() < 1e-12);
        assert!((changes[1].change() - 0.2).abs() < 1e-12);
    }
}
