//! # 径向 CO2 与水注入对比
//!
//! 1° 楔形径向网格，井筒 (XMIN) 注入，比较水、等质量 CO2、等体积 CO2
//! 在封闭 / 开放外边界下的注入压力和压力扰动。
//!
//! ## 案例
//! - `water_closed`, `water_open`
//! - `co2_equal_mass_closed`, `co2_equal_mass_open`
//! - `co2_equal_vol_closed`, `co2_equal_vol_open`
//!
//! ## 依赖关系
//! - 使用 `reference/radial.rs`, `reference/eos.rs`
//! - 使用 `parsers/contour.rs`, `parsers/history.rs`, `parsers/grid_inp.rs`

use super::{Context, Job, Metric};
use crate::cli::parse_list;
use crate::cli::verify::Co2VsWaterArgs;
use crate::error::{FehmError, Result};
use crate::models::deck::{Macro, RelPerm, GRID_FILE};
use crate::models::grid::{logspace, Axis, Grid, WEDGE_DEGREES};
use crate::models::{Deck, ZoneRef};
use crate::parsers::contour::{self, Contour};
use crate::parsers::grid_inp::{self, NodeCoords};
use crate::parsers::history;
use crate::reference::{eos, radial};
use crate::utils::output;
use crate::utils::plot::{Figure, Panel, Series, Style, PALETTE};

use std::path::Path;
use tabled::{Table, Tabled};

const R_WELL: f64 = 0.5;
const R_OUTER: f64 = 1000.0;
const P0: f64 = 20.0;
const T0: f64 = 60.0;
const POROSITY: f64 = 0.1;
const PERMEABILITY: f64 = 1.0e-13;
const ROCK_DENSITY: f64 = 2500.0;
const ROCK_SPECIFIC_HEAT: f64 = 1000.0;
const CONDUCTIVITY: f64 = 2.5;

const OUTPUT_TIMES: [f64; 6] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0];
const HIST_INTERVAL: f64 = 0.01;
/// 剖面图的目标时刻与允许偏差 (days)
const PLOT_TIMES: [f64; 3] = [1.0, 5.0, 10.0];
const PLOT_TIME_TOL: f64 = 0.5;

const RLP_17: [f64; 14] = [
    0.05, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0,
];

/// 历史压力文件候选，按优先级
const PRESSURE_HISTORIES: [&str; 3] = ["presWAT", "presCAP", "presCO2"];

/// 注入流体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fluid {
    Water,
    Co2EqualMass,
    Co2EqualVolume,
}

impl Fluid {
    fn key(self) -> &'static str {
        match self {
            Fluid::Water => "water",
            Fluid::Co2EqualMass => "co2_equal_mass",
            Fluid::Co2EqualVolume => "co2_equal_vol",
        }
    }

    fn root(self) -> &'static str {
        match self {
            Fluid::Water => "water",
            Fluid::Co2EqualMass => "co2_em",
            Fluid::Co2EqualVolume => "co2_ev",
        }
    }

    fn is_co2(self) -> bool {
        self != Fluid::Water
    }
}

/// 径向案例
#[derive(Debug, Clone, PartialEq)]
pub struct RadialCase {
    pub fluid: Fluid,
    pub closed: bool,
    /// 整圆柱质量速率 (kg/s)
    pub full_rate: f64,
}

impl RadialCase {
    pub fn key(&self) -> String {
        format!("{}_{}", self.fluid.key(), self.outer())
    }

    pub fn root(&self) -> String {
        format!("{}_{}", self.fluid.root(), self.outer())
    }

    fn outer(&self) -> &'static str {
        if self.closed {
            "closed"
        } else {
            "open"
        }
    }
}

/// 六个案例；`filter` 为逗号分隔的案例名
pub fn cases(water_rate: f64, filter: Option<&str>) -> Result<Vec<RadialCase>> {
    let co2_rate = radial::equal_volume_rate(
        water_rate,
        eos::co2_density(P0, T0),
        eos::water_density(P0, T0),
    );
    let mut all = Vec::new();
    for (fluid, full_rate) in [
        (Fluid::Water, water_rate),
        (Fluid::Co2EqualMass, water_rate),
        (Fluid::Co2EqualVolume, co2_rate),
    ] {
        for closed in [true, false] {
            all.push(RadialCase {
                fluid,
                closed,
                full_rate,
            });
        }
    }

    let Some(filter) = filter else {
        return Ok(all);
    };
    let wanted = parse_list::<String>(filter).map_err(FehmError::InvalidList)?;
    for name in &wanted {
        if !all.iter().any(|c| &c.key() == name) {
            return Err(FehmError::InvalidArgument(format!(
                "unknown case '{}', expected one of: {}",
                name,
                all.iter().map(|c| c.key()).collect::<Vec<_>>().join(", ")
            )));
        }
    }
    Ok(all.into_iter().filter(|c| wanted.contains(&c.key())).collect())
}

/// 监测节点：井筒、几何中点、外边界
fn monitor_nodes(deck: &Deck) -> Result<Vec<usize>> {
    let inner = deck.zone_nodes(&ZoneRef::Named("XMIN".into()))?;
    let outer = deck.zone_nodes(&ZoneRef::Named("XMAX".into()))?;
    let mid = deck.grid.nearest_node(Axis::X, (R_WELL * R_OUTER).sqrt());

    let mut nodes = Vec::new();
    for n in [inner.first().copied(), mid, outer.first().copied()]
        .into_iter()
        .flatten()
    {
        if !nodes.contains(&n) {
            nodes.push(n);
        }
    }
    Ok(nodes)
}

/// 构造某一案例的输入卡片
pub fn case_deck(case: &RadialCase, n_nodes: usize, tf: f64, co2_table: String) -> Result<Deck> {
    let grid = Grid::make(&logspace(R_WELL, R_OUTER, n_nodes), &[0.0, 1.0], &[0.0, 1.0], true)?;
    let mut deck = Deck::new(&case.root(), grid);
    deck.add_boundary_zones();

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

    let n_inj = deck.zone_nodes(&ZoneRef::Named("XMIN".into()))?.len();
    let rate = radial::wedge_rate_per_node(case.full_rate, WEDGE_DEGREES, n_inj);

    if case.fluid.is_co2() {
        deck.rlp.push(RelPerm {
            index: 17,
            params: RLP_17.to_vec(),
        });
        deck.nobr = true;
        deck.carb_on(3);
        deck.co2_table = Some(co2_table);
        deck.add(
            Macro::Co2Pres {
                pressure: P0,
                temperature: T0,
                phase: 1,
            },
            ZoneRef::All,
        );
        deck.add(co2_frac(1.0, 0.0), ZoneRef::All);
        // 井筒处的少量 CO2 使注入得以启动
        deck.add(co2_frac(0.8, 0.2), "XMIN");
        deck.add(
            Macro::Co2Flow {
                rate: -rate,
                energy: -T0,
                impedance: 0.0,
                bc_flag: 6,
            },
            "XMIN",
        );
        if !case.closed {
            deck.fix_pressure("XMAX", P0, T0);
            deck.add(
                Macro::Co2Flow {
                    rate: P0,
                    energy: -T0,
                    impedance: 1.0e-2,
                    bc_flag: 1,
                },
                "XMAX",
            );
        }
        deck.ctrl.max_newton_iterations = 100;
        deck.ctrl.orthogonalizations = 200;
        deck.ctrl.max_solver_iterations = 200;
        deck.ctrl.timestep_multiplier = 1.3;
    } else {
        deck.add(
            Macro::Flow {
                rate: -rate,
                energy: -T0,
                impedance: 0.0,
            },
            "XMIN",
        );
        if !case.closed {
            deck.fix_pressure("XMAX", P0, T0);
        }
    }

    deck.time.tf = tf;
    deck.time.dti = 0.001;
    deck.time.dtmax = 0.1;
    deck.time.dtmin = 1.0e-10;
    deck.time.output_times = OUTPUT_TIMES.iter().copied().filter(|t| *t <= tf).collect();

    deck.hist.nodes = monitor_nodes(&deck)?;
    deck.hist.time_interval = HIST_INTERVAL;
    deck.hist.variables = vec!["pressure".into(), "temperature".into()];
    deck.cont.variables = vec!["pressure".into(), "temperature".into()];
    if case.fluid.is_co2() {
        deck.hist.variables.push("saturation".into());
        deck.cont.variables.push("co2s".into());
    }
    Ok(deck)
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

// ─────────────────────────────────────────────────────────────
// 结果读取
// ─────────────────────────────────────────────────────────────

/// 某时刻的径向剖面
#[derive(Debug, Clone)]
pub struct Profile {
    pub time: f64,
    pub r: Vec<f64>,
    pub values: Vec<f64>,
}

/// 单个案例的结果
#[derive(Debug, Clone, Default)]
pub struct RadialResult {
    pub pressure: Vec<Profile>,
    pub saturation: Vec<Profile>,
    /// 注入节点历史 (时间, 压力)
    pub injection: Option<(Vec<f64>, Vec<f64>)>,
}

impl RadialResult {
    pub fn final_injection_pressure(&self) -> Option<f64> {
        self.injection.as_ref().and_then(|(_, p)| p.last().copied())
    }

    /// 各快照的 `∫(P-P0)2πr dr`
    pub fn integrated_delta_p(&self) -> (Vec<f64>, Vec<f64>) {
        self.pressure
            .iter()
            .map(|p| (p.time, radial::integrated_delta_p(&p.r, &p.values, P0)))
            .unzip()
    }
}

/// 从 t > 0 的快照中提取径向剖面
pub fn profiles_from_contours(contours: &Contour, coords: &NodeCoords) -> RadialResult {
    let mut result = RadialResult::default();
    for snapshot in contours.snapshots.iter().filter(|s| s.time > 0.0) {
        let pressure = contour::profile(snapshot, coords, "liquid pressure", 0)
            .or_else(|| contour::profile(snapshot, coords, "pressure", 0));
        if let Some((r, values)) = pressure {
            result.pressure.push(Profile {
                time: snapshot.time,
                r,
                values,
            });
        }
        if let Some(saturation) = snapshot.co2_saturation() {
            let (r, values) = contour::profile_values(snapshot, coords, saturation, 0);
            result.saturation.push(Profile {
                time: snapshot.time,
                r,
                values,
            });
        }
    }
    result
}

fn read_result(work_dir: &Path, root: &str) -> Result<RadialResult> {
    let coords = grid_inp::parse_grid_coords(&work_dir.join(GRID_FILE))?;
    let contours = contour::read_contours(work_dir, root)?;
    let mut result = profiles_from_contours(&contours, &coords);

    let histories = history::read_histories(work_dir, root)?;
    result.injection = PRESSURE_HISTORIES
        .iter()
        .find_map(|var| histories.get(*var))
        .and_then(|h| {
            let node = h.nodes.iter().min()?;
            let values = h.series(*node)?;
            Some((h.times.clone(), values.to_vec()))
        });
    Ok(result)
}

// ─────────────────────────────────────────────────────────────
// 执行
// ─────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Case")]
    case: String,
    #[tabled(rename = "Rate (kg/s)")]
    rate: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "P_inj final (MPa)")]
    p_final: String,
    #[tabled(rename = "∫ΔP final (MPa·m²)")]
    integrated: String,
}

pub fn execute(ctx: &Context, args: Co2VsWaterArgs) -> Result<Vec<Metric>> {
    output::print_header("CO2 vs Water Radial Injection");
    if args.nodes < 2 {
        return Err(FehmError::InvalidArgument(format!(
            "need at least 2 radial nodes, got {}",
            args.nodes
        )));
    }

    let selected = cases(args.rate, args.cases.as_deref())?;
    output::print_kv("Water density (kg/m³)", &format!("{:.2}", eos::water_density(P0, T0)));
    output::print_kv("CO2 density (kg/m³)", &format!("{:.2}", eos::co2_density(P0, T0)));

    let mut jobs = Vec::new();
    for case in &selected {
        output::print_kv(
            &case.key(),
            &format!(
                "{} kg/s full cylinder, {} kg/s wedge",
                output::sci(case.full_rate),
                output::sci(case.full_rate * WEDGE_DEGREES / 360.0)
            ),
        );
        jobs.push(Job {
            name: case.key(),
            work_dir: ctx.work_dir("co2_vs_water", &case.key()),
            deck: case_deck(case, args.nodes, args.tf, ctx.co2_table())?,
            spec: case.clone(),
        });
    }

    let results = ctx.run_jobs(&jobs, "Radial", |job| read_result(&job.work_dir, &job.deck.root))?;
    if ctx.dry_run() {
        return Ok(vec![]);
    }

    let mut metrics = Vec::new();
    let mut rows = Vec::new();
    for (job, result) in jobs.iter().zip(&results) {
        let key = job.spec.key();
        let p_final = result.as_ref().and_then(|r| r.final_injection_pressure());
        let integrated = result
            .as_ref()
            .and_then(|r| r.integrated_delta_p().1.last().copied());

        if let Some(r) = result {
            output::print_info(&format!(
                "{}: {} pressure profiles, {} CO2 saturation profiles",
                key,
                r.pressure.len(),
                r.saturation.len()
            ));
        }
        if let Some(p) = p_final {
            metrics.push(Metric::new("co2_vs_water", &format!("{} P_inj final", key), p, "MPa"));
        }
        if let Some(v) = integrated {
            metrics.push(Metric::new("co2_vs_water", &format!("{} integrated dP", key), v, "MPa·m²"));
        }
        rows.push(SummaryRow {
            case: key,
            rate: output::sci(job.spec.full_rate),
            status: if result.is_some() { "OK" } else { "FAIL" }.to_string(),
            p_final: p_final.map_or("N/A".to_string(), |p| format!("{:.3}", p)),
            integrated: integrated.map_or("N/A".to_string(), output::sci),
        });
    }
    println!("{}", Table::new(&rows));

    let done: Vec<(&RadialCase, &RadialResult)> = jobs
        .iter()
        .zip(&results)
        .filter_map(|(job, r)| r.as_ref().map(|r| (&job.spec, r)))
        .collect();
    if !done.is_empty() {
        ctx.save_plot(&comparison_figure(&done), "co2_vs_water_results")?;
    }
    Ok(metrics)
}

fn case_style(case: &RadialCase) -> (plotters::style::RGBColor, Style) {
    let color = match case.fluid {
        Fluid::Water => PALETTE[0],
        Fluid::Co2EqualMass => PALETTE[1],
        Fluid::Co2EqualVolume => PALETTE[2],
    };
    (color, if case.closed { Style::Line } else { Style::Dashed })
}

/// 目标时刻附近的剖面
fn profiles_near(profiles: &[Profile]) -> Vec<&Profile> {
    PLOT_TIMES
        .iter()
        .filter_map(|&target| {
            profiles
                .iter()
                .min_by(|a, b| {
                    (a.time - target)
                        .abs()
                        .partial_cmp(&(b.time - target).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .filter(|p| (p.time - target).abs() <= PLOT_TIME_TOL)
        })
        .collect()
}

/// 4×2 图：压力剖面 / 注入压力历史 / 积分压力扰动 / CO2 饱和度剖面，左封闭右开放
fn comparison_figure(done: &[(&RadialCase, &RadialResult)]) -> Figure {
    let mut figure = Figure::new("CO2 vs water radial injection", 2);
    let outers = [(true, "closed"), (false, "open")];

    for (closed, outer) in outers {
        let mut panel = Panel::new(
            &format!("Pressure profiles ({})", outer),
            "r (m)",
            "pressure (MPa)",
        )
        .log_x();
        for (case, result) in done.iter().filter(|(c, _)| c.closed == closed) {
            let (color, style) = case_style(case);
            let near = profiles_near(&result.pressure);
            for (i, p) in near.iter().enumerate() {
                // 只给最后一个时刻加图例
                let label = if i + 1 == near.len() {
                    format!("{}, t={:.0}d", case.fluid.key(), p.time)
                } else {
                    String::new()
                };
                panel = panel.with(Series::new(&label, &p.r, &p.values, color, style));
            }
        }
        figure.push(panel);
    }

    for (closed, outer) in outers {
        let mut panel = Panel::new(
            &format!("Injection pressure ({})", outer),
            "time (days)",
            "pressure (MPa)",
        );
        for (case, result) in done.iter().filter(|(c, _)| c.closed == closed) {
            if let Some((t, p)) = &result.injection {
                let (color, style) = case_style(case);
                panel = panel.with(Series::new(case.fluid.key(), t, p, color, style));
            }
        }
        figure.push(panel);
    }

    for (closed, outer) in outers {
        let mut panel = Panel::new(
            &format!("Integrated pressure perturbation ({})", outer),
            "time (days)",
            "∫(P-P0) 2πr dr (MPa·m²)",
        );
        for (case, result) in done.iter().filter(|(c, _)| c.closed == closed) {
            let (t, v) = result.integrated_delta_p();
            let (color, style) = case_style(case);
            panel = panel.with(Series::new(case.fluid.key(), &t, &v, color, style));
        }
        figure.push(panel);
    }

    for (closed, outer) in outers {
        let mut panel = Panel::new(
            &format!("CO2 saturation ({})", outer),
            "r (m)",
            "CO2 saturation",
        )
        .log_x();
        for (case, result) in done
            .iter()
            .filter(|(c, _)| c.closed == closed && c.fluid.is_co2())
        {
            let (color, style) = case_style(case);
            let near = profiles_near(&result.saturation);
            for (i, p) in near.iter().enumerate() {
                let label = if i + 1 == near.len() {
                    format!("{}, t={:.0}d", case.fluid.key(), p.time)
                } else {
                    String::new()
                };
                panel = panel.with(Series::new(&label, &p.r, &p.values, color, style));
            }
        }
        figure.push(panel);
    }

    figure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::contour::parse_snapshot_content;

    #[test]
    fn test_case_names_and_filter() {
        let all = cases(1.0e-3, None).unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].key(), "water_closed");
        assert_eq!(all[5].root(), "co2_ev_open");
        assert!(all[4].full_rate < all[2].full_rate);

        let some = cases(1.0e-3, Some("water_open, co2_equal_mass_closed")).unwrap();
        assert_eq!(some.len(), 2);
        assert!(cases(1.0e-3, Some("steam_closed")).is_err());
    }

    #[test]
    fn test_water_deck_wedge_rate() {
        let case = RadialCase {
            fluid: Fluid::Water,
            closed: false,
            full_rate: 3.6e-3,
        };
        let deck = case_deck(&case, 11, 10.0, "t".into()).unwrap();
        // XMIN 面有 4 个节点，1° 楔形
        let text = deck.render().unwrap();
        assert!(text.contains("-999 0 0 -2.50000000e-6 -6.00000000e1 0.\n"));
        assert!(text.contains("-998 0 0 2.00000000e1 -6.00000000e1 1.00000000e6\n"));
        assert!(deck.carb.is_none());
        assert_eq!(deck.hist.nodes.len(), 3);
        assert_eq!(deck.hist.nodes[0], 1);
    }

    #[test]
    fn test_co2_deck_carb_block() {
        let case = RadialCase {
            fluid: Fluid::Co2EqualMass,
            closed: true,
            full_rate: 3.6e-3,
        };
        let deck = case_deck(&case, 11, 1.0, "t".into()).unwrap();
        let text = deck.render().unwrap();
        assert!(text.contains("carb\n3\n"));
        assert!(text.contains("-999 0 0 -2.50000000e-6 -6.00000000e1 0. 6\n"));
        assert!(!text.contains("-998 0 0"));
        assert_eq!(deck.time.output_times, vec![0.1, 0.5, 1.0]);
        assert!(deck.cont.variables.contains(&"co2s".to_string()));
    }

    #[test]
    fn test_profiles_and_integral() {
        let coords: NodeCoords = [
            (1, [1.0, 0.0, 0.0]),
            (2, [2.0, 0.0, 0.0]),
            (3, [1.0, 0.0, 1.0]),
            (4, [2.0, 0.0, 1.0]),
        ]
        .into_iter()
        .collect();
        let text = "node, Liquid Pressure (MPa), CO2 Liquid Saturation\n\
                    1, 21.0, 0.5\n2, 20.0, 0.0\n3, 21.0, 0.3\n4, 20.0, 0.0\n";
        let snapshot = parse_snapshot_content(text, 1.0).unwrap();
        let contours = Contour {
            snapshots: vec![snapshot],
        };
        let result = profiles_from_contours(&contours, &coords);
        assert_eq!(result.pressure[0].r, vec![1.0, 2.0]);
        assert_eq!(result.pressure[0].values, vec![21.0, 20.0]);
        assert!((result.saturation[0].values[0] - 0.4).abs() < 1e-12);

        // 0.5 * (2π·1·1 + 0) * 1 = π
        let (_, v) = result.integrated_delta_p();
        assert!((v[0] - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_profiles_use_liquid_co2_saturation_after_start() {
        let coords: NodeCoords = [(1, [1.0, 0.0, 0.0]), (2, [2.0, 0.0, 0.0])]
            .into_iter()
            .collect();
        let text = "node, Liquid Pressure (MPa), Dissolved CO2 Mass Fraction, \
                    Super-Critical/Liquid CO2 Saturation\n\
                    1, 21.0, 0.03, 0.9\n2, 20.0, 0.02, 0.1\n";
        let contours = Contour {
            snapshots: vec![
                parse_snapshot_content(text, 0.0).unwrap(),
                parse_snapshot_content(text, 1.0).unwrap(),
            ],
        };
        let result = profiles_from_contours(&contours, &coords);
        let times: Vec<f64> = result.pressure.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![1.0]);
        assert_eq!(result.saturation.len(), 1);
        assert_eq!(result.saturation[0].values, vec![0.9, 0.1]);
    }

    #[test]
    fn test_profiles_near_respects_tolerance() {
        let profiles: Vec<Profile> = [0.1, 1.0, 2.0]
            .iter()
            .map(|&t| Profile {
                time: t,
                r: vec![],
                values: vec![],
            })
            .collect();
        let near = profiles_near(&profiles);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].time, 1.0);
    }
}
