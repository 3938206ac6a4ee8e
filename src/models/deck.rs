//! # FEHM 输入卡片
//!
//! 以类型化的宏描述材料、初始/边界条件和求解器控制，并渲染为 FEHM 文本格式。
//!
//! ## 卡片结构
//! ```text
//! titl / zone / rock / perm / cond / pres / grad / flow / hflx
//! rlp / nobr / carb ... endcarb / time / ctrl / iter / sol
//! node / hist / cont / stop
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/verify/`, `utils/fehm.rs`, `vtk/` 使用
//! - 使用 `models/grid.rs`

use crate::error::{FehmError, Result};
use crate::models::grid::Grid;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 网格文件名（与控制文件中的 `grida:` 对应）
pub const GRID_FILE: &str = "grid.inp";

/// 运行控制文件名
pub const CONTROL_FILE: &str = "fehmn.files";

/// 固定压力边界的默认阻抗
pub const FIX_PRESSURE_IMPEDANCE: f64 = 1.0e6;

/// 宏作用的区域
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneRef {
    /// 全部节点（区域 0）
    All,
    Index(usize),
    Named(String),
}

impl From<&str> for ZoneRef {
    fn from(name: &str) -> Self {
        ZoneRef::Named(name.to_string())
    }
}

impl From<usize> for ZoneRef {
    fn from(index: usize) -> Self {
        if index == 0 {
            ZoneRef::All
        } else {
            ZoneRef::Index(index)
        }
    }
}

/// 节点区域
#[derive(Debug, Clone)]
pub struct Zone {
    pub index: usize,
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

/// 类型化的 FEHM 宏
#[derive(Debug, Clone, PartialEq)]
pub enum Macro {
    Rock {
        density: f64,
        specific_heat: f64,
        porosity: f64,
    },
    Perm {
        kx: f64,
        ky: f64,
        kz: f64,
    },
    Cond {
        x: f64,
        y: f64,
        z: f64,
    },
    Pres {
        pressure: f64,
        temperature: f64,
        saturation: u8,
    },
    /// rate < 0 为注入；energy < 0 表示温度 (°C)
    Flow {
        rate: f64,
        energy: f64,
        impedance: f64,
    },
    Hflx {
        heat_flow: f64,
        multiplier: f64,
    },
    Grad {
        reference_coord: f64,
        direction: u8,
        variable: u8,
        reference_value: f64,
        gradient: f64,
    },
    Co2Pres {
        pressure: f64,
        temperature: f64,
        phase: u8,
    },
    Co2Frac {
        water_rich_sat: f64,
        co2_rich_sat: f64,
        co2_mass_frac: f64,
        init_salt_conc: f64,
        override_flag: u8,
    },
    Co2Flow {
        rate: f64,
        energy: f64,
        impedance: f64,
        bc_flag: u8,
    },
    /// 溶解 CO2 的分子扩散
    Co2Diff {
        diffusivity: f64,
        tortuosity: f64,
    },
}

impl Macro {
    pub fn keyword(&self) -> &'static str {
        match self {
            Macro::Rock { .. } => "rock",
            Macro::Perm { .. } => "perm",
            Macro::Cond { .. } => "cond",
            Macro::Pres { .. } => "pres",
            Macro::Flow { .. } => "flow",
            Macro::Hflx { .. } => "hflx",
            Macro::Grad { .. } => "grad",
            Macro::Co2Pres { .. } => "co2pres",
            Macro::Co2Frac { .. } => "co2frac",
            Macro::Co2Flow { .. } => "co2flow",
            Macro::Co2Diff { .. } => "co2diff",
        }
    }

    /// 是否属于 carb 块内的子宏
    pub fn is_carb(&self) -> bool {
        matches!(
            self,
            Macro::Co2Pres { .. }
                | Macro::Co2Frac { .. }
                | Macro::Co2Flow { .. }
                | Macro::Co2Diff { .. }
        )
    }

    /// 区域描述之后的参数列
    fn values(&self) -> Vec<String> {
        match *self {
            Macro::Rock {
                density,
                specific_heat,
                porosity,
            } => vec![num(density), num(specific_heat), num(porosity)],
            Macro::Perm { kx, ky, kz } => vec![num(kx), num(ky), num(kz)],
            Macro::Cond { x, y, z } => vec![num(x), num(y), num(z)],
            Macro::Pres {
                pressure,
                temperature,
                saturation,
            } => vec![num(pressure), num(temperature), saturation.to_string()],
            Macro::Flow {
                rate,
                energy,
                impedance,
            } => vec![num(rate), num(energy), num(impedance)],
            Macro::Hflx {
                heat_flow,
                multiplier,
            } => vec![num(heat_flow), num(multiplier)],
            Macro::Grad {
                reference_coord,
                direction,
                variable,
                reference_value,
                gradient,
            } => vec![
                num(reference_coord),
                direction.to_string(),
                variable.to_string(),
                num(reference_value),
                num(gradient),
            ],
            Macro::Co2Pres {
                pressure,
                temperature,
                phase,
            } => vec![num(pressure), num(temperature), phase.to_string()],
            Macro::Co2Frac {
                water_rich_sat,
                co2_rich_sat,
                co2_mass_frac,
                init_salt_conc,
                override_flag,
            } => vec![
                num(water_rich_sat),
                num(co2_rich_sat),
                num(co2_mass_frac),
                num(init_salt_conc),
                override_flag.to_string(),
            ],
            Macro::Co2Flow {
                rate,
                energy,
                impedance,
                bc_flag,
            } => vec![num(rate), num(energy), num(impedance), bc_flag.to_string()],
            Macro::Co2Diff {
                diffusivity,
                tortuosity,
            } => vec![num(diffusivity), num(tortuosity)],
        }
    }
}

/// 已添加到卡片中的宏
#[derive(Debug, Clone)]
pub struct MacroEntry {
    pub zone: ZoneRef,
    pub mac: Macro,
}

/// 相对渗透率模型 (rlp)
#[derive(Debug, Clone)]
pub struct RelPerm {
    pub index: u32,
    pub params: Vec<f64>,
}

/// 时间控制，单位为天
#[derive(Debug, Clone)]
pub struct TimeControl {
    pub tf: f64,
    pub dti: f64,
    pub dtmax: f64,
    pub dtmin: f64,
    pub max_steps: u32,
    pub output_times: Vec<f64>,
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl {
            tf: 365.25,
            dti: 1.0,
            dtmax: 30.0,
            dtmin: 1.0e-5,
            max_steps: 10000,
            output_times: vec![],
        }
    }
}

/// ctrl 宏参数
#[derive(Debug, Clone)]
pub struct Ctrl {
    pub max_newton_iterations: u32,
    pub newton_tolerance: f64,
    pub orthogonalizations: u32,
    pub max_solver_iterations: u32,
    pub acceleration: String,
    pub gauss_elimination_order: u32,
    pub implicitness: f64,
    pub gravity_direction: u32,
    pub upstream_weighting: f64,
    pub max_multiply_iterations: u32,
    pub timestep_multiplier: f64,
    pub geometry: u32,
    pub stor_file: u32,
}

impl Default for Ctrl {
    fn default() -> Self {
        Ctrl {
            max_newton_iterations: 10,
            newton_tolerance: 1.0e-5,
            orthogonalizations: 8,
            max_solver_iterations: 24,
            acceleration: "gmre".to_string(),
            gauss_elimination_order: 2,
            implicitness: 1.0,
            gravity_direction: 3,
            upstream_weighting: 1.0,
            max_multiply_iterations: 7,
            timestep_multiplier: 1.5,
            geometry: 0,
            stor_file: 0,
        }
    }
}

/// iter 宏参数
#[derive(Debug, Clone)]
pub struct Iter {
    pub g1: f64,
    pub g2: f64,
    pub g3: f64,
    pub machine_tolerance: f64,
    pub overrelaxation: f64,
    pub reduced_dof: i32,
    pub reordering: i32,
    pub irdof_param: i32,
    pub sor_iterations: i32,
    pub max_machine_time: f64,
}

impl Default for Iter {
    fn default() -> Self {
        Iter {
            g1: 1.0e-5,
            g2: 1.0e-5,
            g3: 1.0e-3,
            machine_tolerance: -1.0e-5,
            overrelaxation: 1.1,
            reduced_dof: 0,
            reordering: 0,
            irdof_param: 0,
            sor_iterations: 0,
            max_machine_time: 1.0e11,
        }
    }
}

/// sol 宏参数
#[derive(Debug, Clone)]
pub struct Sol {
    pub coupling: i32,
    pub element_integration: i32,
}

impl Default for Sol {
    fn default() -> Self {
        Sol {
            coupling: 1,
            element_integration: -1,
        }
    }
}

/// 历史输出设置
#[derive(Debug, Clone)]
pub struct HistoryOutput {
    pub nodes: Vec<usize>,
    pub variables: Vec<String>,
    pub time_interval: f64,
    pub format: String,
}

impl Default for HistoryOutput {
    fn default() -> Self {
        HistoryOutput {
            nodes: vec![],
            variables: vec![],
            time_interval: 1.0e30,
            format: "tecplot".to_string(),
        }
    }
}

/// 等值线（快照）输出设置
#[derive(Debug, Clone)]
pub struct ContourOutput {
    pub variables: Vec<String>,
    pub format: String,
    pub time_interval: f64,
}

impl Default for ContourOutput {
    fn default() -> Self {
        ContourOutput {
            variables: vec![],
            format: "surf".to_string(),
            time_interval: 1.0e30,
        }
    }
}

/// 节点物性（供 VTK 导出）
#[derive(Debug, Clone)]
pub struct NodeProperties {
    pub permeability: Vec<[f64; 3]>,
    pub density: Vec<f64>,
}

impl NodeProperties {
    /// 全部未设置（NaN）
    pub fn unset(n: usize) -> Self {
        NodeProperties {
            permeability: vec![[f64::NAN; 3]; n],
            density: vec![f64::NAN; n],
        }
    }

    /// 均匀渗透率
    pub fn uniform_permeability(n: usize, perm: [f64; 3]) -> Self {
        NodeProperties {
            permeability: vec![perm; n],
            density: vec![f64::NAN; n],
        }
    }
}

/// FEHM 输入卡片
#[derive(Debug, Clone)]
pub struct Deck {
    pub title: String,
    pub root: String,
    pub grid: Grid,
    pub zones: Vec<Zone>,
    pub macros: Vec<MacroEntry>,
    pub rlp: Vec<RelPerm>,
    pub time: TimeControl,
    pub ctrl: Ctrl,
    pub iter: Iter,
    pub sol: Sol,
    pub hist: HistoryOutput,
    pub cont: ContourOutput,
    /// CO2 模块类型 (iprtype)，None 表示关闭
    pub carb: Option<u8>,
    pub nobr: bool,
    pub co2_table: Option<String>,
}

impl Deck {
    pub fn new(root: &str, grid: Grid) -> Self {
        Deck {
            title: format!("fehm-verify: {}", root),
            root: root.to_string(),
            grid,
            zones: vec![],
            macros: vec![],
            rlp: vec![],
            time: TimeControl::default(),
            ctrl: Ctrl::default(),
            iter: Iter::default(),
            sol: Sol::default(),
            hist: HistoryOutput::default(),
            cont: ContourOutput::default(),
            carb: None,
            nobr: false,
            co2_table: None,
        }
    }

    /// 添加宏
    pub fn add(&mut self, mac: Macro, zone: impl Into<ZoneRef>) {
        self.macros.push(MacroEntry {
            zone: zone.into(),
            mac,
        });
    }

    /// 新建（或替换）区域
    pub fn new_zone(&mut self, index: usize, name: Option<&str>, nodes: Vec<usize>) {
        self.zones.retain(|z| z.index != index);
        self.zones.push(Zone {
            index,
            name: name.map(|s| s.to_string()),
            nodes,
        });
    }

    /// 添加 XMIN..ZMAX 边界区域
    pub fn add_boundary_zones(&mut self) {
        for (name, index, nodes) in self.grid.boundary_zones() {
            self.new_zone(index, Some(&name), nodes);
        }
    }

    /// 查找区域
    pub fn zone(&self, zone: &ZoneRef) -> Result<Option<&Zone>> {
        match zone {
            ZoneRef::All => Ok(None),
            ZoneRef::Index(i) => self
                .zones
                .iter()
                .find(|z| z.index == *i)
                .map(Some)
                .ok_or_else(|| FehmError::UnknownZone(i.to_string())),
            ZoneRef::Named(name) => self
                .zones
                .iter()
                .find(|z| z.name.as_deref() == Some(name.as_str()))
                .map(Some)
                .ok_or_else(|| FehmError::UnknownZone(name.clone())),
        }
    }

    /// 区域内的节点列表
    pub fn zone_nodes(&self, zone: &ZoneRef) -> Result<Vec<usize>> {
        Ok(match self.zone(zone)? {
            Some(z) => z.nodes.clone(),
            None => self.grid.nodes.iter().map(|n| n.index).collect(),
        })
    }

    /// 固定压力边界：flow 宏，rate 为压力，energy 为 -T
    pub fn fix_pressure(&mut self, zone: impl Into<ZoneRef>, pressure: f64, temperature: f64) {
        self.add(
            Macro::Flow {
                rate: pressure,
                energy: -temperature,
                impedance: FIX_PRESSURE_IMPEDANCE,
            },
            zone,
        );
    }

    /// 固定温度边界：hflx 宏，multiplier > 0
    pub fn fix_temperature(&mut self, zone: impl Into<ZoneRef>, temperature: f64, multiplier: f64) {
        self.add(
            Macro::Hflx {
                heat_flow: temperature,
                multiplier,
            },
            zone,
        );
    }

    /// 固定加热速率 (MW)，正值表示热量进入储层
    pub fn fix_heating_rate(&mut self, zone: impl Into<ZoneRef>, rate_mw: f64) {
        self.add(
            Macro::Hflx {
                heat_flow: -rate_mw,
                multiplier: 0.0,
            },
            zone,
        );
    }

    /// 开启 CO2 模块
    pub fn carb_on(&mut self, iprtype: u8) {
        self.carb = Some(iprtype);
    }

    /// 按添加顺序解析节点物性
    pub fn node_properties(&self) -> Result<NodeProperties> {
        let mut props = NodeProperties::unset(self.grid.number_nodes());
        for entry in &self.macros {
            match entry.mac {
                Macro::Perm { kx, ky, kz } => {
                    for n in self.zone_nodes(&entry.zone)? {
                        if let Some(p) = props.permeability.get_mut(self.node_slot(n)?) {
                            *p = [kx, ky, kz];
                        }
                    }
                }
                Macro::Rock { density, .. } => {
                    for n in self.zone_nodes(&entry.zone)? {
                        if let Some(d) = props.density.get_mut(self.node_slot(n)?) {
                            *d = density;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(props)
    }

    /// 1 起编号转为数组下标
    fn node_slot(&self, node: usize) -> Result<usize> {
        node.checked_sub(1).ok_or_else(|| {
            FehmError::InvalidArgument(format!(
                "deck '{}' references node 0, node numbers start at 1",
                self.root
            ))
        })
    }

    /// 区域描述 `JA JB JC`
    fn zone_prefix(&self, zone: &ZoneRef) -> Result<String> {
        Ok(match self.zone(zone)? {
            None => "1 0 0".to_string(),
            Some(z) => format!("-{} 0 0", z.index),
        })
    }

    /// 渲染完整卡片
    pub fn render(&self) -> Result<String> {
        if self.carb.is_none() && self.macros.iter().any(|e| e.mac.is_carb()) {
            return Err(FehmError::InvalidArgument(format!(
                "deck '{}' has CO2 macros but carb is off",
                self.root
            )));
        }
        let mut s = String::new();
        let _ = writeln!(s, "# {}", self.title);
        let _ = writeln!(s, "titl\n{}", self.title);

        self.render_zones(&mut s);

        for keyword in ["rock", "perm", "cond", "pres", "flow", "hflx"] {
            self.render_block(&mut s, keyword)?;
        }
        self.render_grad(&mut s)?;
        self.render_rlp(&mut s);

        if self.nobr {
            s.push_str("nobr\n");
        }
        self.render_carb(&mut s)?;
        self.render_time(&mut s);
        self.render_ctrl(&mut s);
        self.render_history(&mut s);
        self.render_contour(&mut s);

        s.push_str("stop\n");
        Ok(s)
    }

    fn render_zones(&self, s: &mut String) {
        if self.zones.is_empty() {
            return;
        }
        s.push_str("zone\n");
        for zone in &self.zones {
            let _ = writeln!(s, "{}", zone.index);
            s.push_str("nnum\n");
            let _ = write!(s, "{}", zone.nodes.len());
            for (i, n) in zone.nodes.iter().enumerate() {
                if i > 0 && i % 10 == 0 {
                    s.push('\n');
                }
                let _ = write!(s, " {}", n);
            }
            s.push('\n');
        }
        s.push('\n');
    }

    /// 渲染普通宏块（参数行 + 空行结束）
    fn render_block(&self, s: &mut String, keyword: &str) -> Result<()> {
        let entries: Vec<&MacroEntry> = self
            .macros
            .iter()
            .filter(|e| e.mac.keyword() == keyword)
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        let _ = writeln!(s, "{}", keyword);
        for entry in entries {
            let _ = writeln!(
                s,
                "{} {}",
                self.zone_prefix(&entry.zone)?,
                entry.mac.values().join(" ")
            );
        }
        s.push('\n');
        Ok(())
    }

    fn render_grad(&self, s: &mut String) -> Result<()> {
        let entries: Vec<&MacroEntry> = self
            .macros
            .iter()
            .filter(|e| matches!(e.mac, Macro::Grad { .. }))
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        s.push_str("grad\n");
        let _ = writeln!(s, "{}", entries.len());
        for entry in entries {
            let zone_index = match self.zone(&entry.zone)? {
                Some(z) => z.index,
                None => 0,
            };
            let _ = writeln!(s, "{} {}", zone_index, entry.mac.values().join(" "));
        }
        s.push('\n');
        Ok(())
    }

    fn render_rlp(&self, s: &mut String) {
        for model in &self.rlp {
            s.push_str("rlp\n");
            let params: Vec<String> = model.params.iter().map(|p| num(*p)).collect();
            let _ = writeln!(s, "{} {}", model.index, params.join(" "));
            s.push('\n');
            s.push_str("1 0 0 1\n\n");
        }
    }

    fn render_carb(&self, s: &mut String) -> Result<()> {
        let Some(iprtype) = self.carb else {
            return Ok(());
        };
        s.push_str("carb\n");
        let _ = writeln!(s, "{}", iprtype);
        for keyword in ["co2pres", "co2frac", "co2flow", "co2diff"] {
            self.render_block(s, keyword)?;
        }
        s.push_str("endcarb\n");
        Ok(())
    }

    fn render_time(&self, s: &mut String) {
        let t = &self.time;
        s.push_str("time\n");
        let _ = writeln!(
            s,
            "{} {} {} 1 2025 1 0",
            num(t.dti),
            num(t.tf),
            t.max_steps
        );
        let mut times = t.output_times.clone();
        times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for time in times {
            let _ = writeln!(
                s,
                "{} {} 1.0 1",
                num(time),
                num(-self.ctrl.timestep_multiplier)
            );
        }
        s.push('\n');
    }

    fn render_ctrl(&self, s: &mut String) {
        let c = &self.ctrl;
        s.push_str("ctrl\n");
        let _ = writeln!(
            s,
            "{} {} {} {} {}",
            c.max_newton_iterations,
            num(c.newton_tolerance),
            c.orthogonalizations,
            c.max_solver_iterations,
            c.acceleration
        );
        let _ = writeln!(s, "1 0 0 {}", c.gauss_elimination_order);
        s.push('\n');
        let _ = writeln!(
            s,
            "{} {} {}",
            num(c.implicitness),
            c.gravity_direction,
            num(c.upstream_weighting)
        );
        let _ = writeln!(
            s,
            "{} {} {} {}",
            c.max_multiply_iterations,
            num(c.timestep_multiplier),
            num(self.time.dtmin),
            num(self.time.dtmax)
        );
        let _ = writeln!(s, "{} {}", c.geometry, c.stor_file);

        let it = &self.iter;
        s.push_str("iter\n");
        let _ = writeln!(
            s,
            "{} {} {} {} {}",
            num(it.g1),
            num(it.g2),
            num(it.g3),
            num(it.machine_tolerance),
            num(it.overrelaxation)
        );
        let _ = writeln!(
            s,
            "{} {} {} {} {}",
            it.reduced_dof,
            it.reordering,
            it.irdof_param,
            it.sor_iterations,
            num(it.max_machine_time)
        );

        let _ = writeln!(
            s,
            "sol\n{} {}",
            self.sol.coupling, self.sol.element_integration
        );
    }

    fn render_history(&self, s: &mut String) {
        if self.hist.nodes.is_empty() || self.hist.variables.is_empty() {
            return;
        }
        s.push_str("node\n");
        let _ = writeln!(s, "{}", self.hist.nodes.len());
        let nodes: Vec<String> = self.hist.nodes.iter().map(|n| n.to_string()).collect();
        let _ = writeln!(s, "{}", nodes.join(" "));

        s.push_str("hist\n");
        let _ = writeln!(
            s,
            "{} {} {}",
            self.hist.format,
            self.time.max_steps * 100,
            num(self.hist.time_interval)
        );
        for var in &self.hist.variables {
            let _ = writeln!(s, "{}", var);
        }
        s.push_str("end\n");
    }

    fn render_contour(&self, s: &mut String) {
        if self.cont.variables.is_empty() {
            return;
        }
        s.push_str("cont\n");
        let _ = writeln!(
            s,
            "{} {} {}",
            self.cont.format,
            self.time.max_steps * 100,
            num(self.cont.time_interval)
        );
        for var in &self.cont.variables {
            let _ = writeln!(s, "{}", var);
        }
        s.push_str("end\n");
    }
}

impl Deck {
    /// 输入卡片文件名
    pub fn input_file(&self) -> String {
        format!("{}.dat", self.root)
    }

    /// 运行控制文件 `fehmn.files` 的内容
    pub fn control_file(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "root: {}", self.root);
        let _ = writeln!(s, "input: {}", self.input_file());
        let _ = writeln!(s, "grida: {}", GRID_FILE);
        let _ = writeln!(s, "outp: {}.outp", self.root);
        let _ = writeln!(s, "check: {}.chk", self.root);
        let _ = writeln!(s, "hist: {}.his", self.root);
        if self.carb.is_some() {
            if let Some(table) = &self.co2_table {
                let _ = writeln!(s, "co2in: {}", table);
            }
        }
        s
    }

    /// 写出网格文件、输入卡片和控制文件
    pub fn write(&self, work_dir: &Path) -> Result<()> {
        fs::create_dir_all(work_dir).map_err(|e| FehmError::FileWriteError {
            path: work_dir.display().to_string(),
            source: e,
        })?;

        self.grid.write(&work_dir.join(GRID_FILE))?;

        let text = self.render()?;
        let deck_path = work_dir.join(self.input_file());
        fs::write(&deck_path, text).map_err(|e| FehmError::FileWriteError {
            path: deck_path.display().to_string(),
            source: e,
        })?;

        let control_path = work_dir.join(CONTROL_FILE);
        fs::write(&control_path, self.control_file()).map_err(|e| FehmError::FileWriteError {
            path: control_path.display().to_string(),
            source: e,
        })
    }
}

/// 卡片数值格式
fn num(v: f64) -> String {
    if v == 0.0 {
        "0.".to_string()
    } else {
        format!("{:.8e}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_deck() -> Deck {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        Deck::new("mass_test", grid)
    }

    #[test]
    fn test_zone_all_prefix() {
        let mut deck = block_deck();
        deck.add(
            Macro::Rock {
                density: 2500.0,
                specific_heat: 1000.0,
                porosity: 0.1,
            },
            ZoneRef::All,
        );
        let text = deck.render().unwrap();
        assert!(text.contains("rock\n1 0 0 2.50000000e3 1.00000000e3 1.00000000e-1\n\n"));
        assert!(text.trim_end().ends_with("stop"));
    }

    #[test]
    fn test_named_zone_prefix() {
        let mut deck = block_deck();
        deck.new_zone(100, None, vec![1]);
        deck.add_boundary_zones();
        deck.fix_pressure("XMAX", 20.0, 60.0);
        deck.add(
            Macro::Co2Flow {
                rate: 12.0,
                energy: -50.0,
                impedance: 1e-2,
                bc_flag: 1,
            },
            100,
        );
        deck.carb_on(2);
        let text = deck.render().unwrap();
        assert!(text.contains("flow\n-998 0 0 2.00000000e1 -6.00000000e1 1.00000000e6\n"));
        assert!(text.contains("carb\n2\nco2flow\n-100 0 0"));
        assert!(text.contains("endcarb\n"));
    }

    #[test]
    fn test_co2_macros_need_carb() {
        let mut deck = block_deck();
        deck.add(
            Macro::Co2Diff {
                diffusivity: 2e-9,
                tortuosity: 0.5,
            },
            ZoneRef::All,
        );
        assert!(matches!(deck.render(), Err(FehmError::InvalidArgument(_))));
        deck.carb_on(4);
        let text = deck.render().unwrap();
        assert!(text.contains("carb\n4\nco2diff\n1 0 0 2.00000000e-9 5.00000000e-1\n\nendcarb\n"));
    }

    #[test]
    fn test_unknown_zone_errors() {
        let mut deck = block_deck();
        deck.fix_pressure("XMIN", 1.0, 10.0);
        assert!(matches!(deck.render(), Err(FehmError::UnknownZone(_))));
    }

    #[test]
    fn test_heating_rate_sign() {
        let mut deck = block_deck();
        deck.fix_heating_rate(0usize, 3.75e-6);
        match &deck.macros[0].mac {
            Macro::Hflx {
                heat_flow,
                multiplier,
            } => {
                assert!(*heat_flow < 0.0);
                assert_eq!(*multiplier, 0.0);
            }
            other => panic!("unexpected macro {:?}", other),
        }
    }

    #[test]
    fn test_node_properties_order() {
        let mut deck = block_deck();
        deck.new_zone(1, Some("first"), vec![1, 2]);
        deck.add(
            Macro::Perm {
                kx: 1e-12,
                ky: 1e-12,
                kz: 1e-13,
            },
            ZoneRef::All,
        );
        deck.add(
            Macro::Perm {
                kx: 1e-15,
                ky: 1e-15,
                kz: 1e-15,
            },
            "first",
        );
        let props = deck.node_properties().unwrap();
        assert_eq!(props.permeability[0], [1e-15; 3]);
        assert_eq!(props.permeability[7], [1e-12, 1e-12, 1e-13]);
        assert!(props.density[0].is_nan());
    }

    #[test]
    fn test_node_properties_rejects_node_zero() {
        let mut deck = block_deck();
        deck.new_zone(3, Some("bad"), vec![0, 1]);
        deck.add(
            Macro::Rock {
                density: 2500.0,
                specific_heat: 1000.0,
                porosity: 0.1,
            },
            "bad",
        );
        assert!(matches!(
            deck.node_properties(),
            Err(FehmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_control_file_co2_line() {
        let mut deck = block_deck();
        deck.co2_table = Some("co2_interp_table.txt".to_string());
        assert!(!deck.control_file().contains("co2in:"));
        deck.carb_on(2);
        let text = deck.control_file();
        assert!(text.starts_with("root: mass_test\ninput: mass_test.dat\ngrida: grid.inp\n"));
        assert!(text.contains("co2in: co2_interp_table.txt"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let deck = block_deck();
        deck.write(dir.path()).unwrap();
        assert!(dir.path().join(GRID_FILE).exists());
        assert!(dir.path().join("mass_test.dat").exists());
        assert!(dir.path().join(CONTROL_FILE).exists());
    }

    #[test]
    fn test_time_and_output_blocks() {
        let mut deck = block_deck();
        deck.time.tf = 1.0;
        deck.time.dti = 0.001;
        deck.time.output_times = vec![0.5, 0.1];
        deck.hist.nodes = vec![1];
        deck.hist.variables = vec!["pressure".into(), "temperature".into()];
        deck.cont.variables = vec!["pressure".into()];
        let text = deck.render().unwrap();
        let time_pos = text.find("time\n").unwrap();
        let first = text[time_pos..].find("1.00000000e-1").unwrap();
        let second = text[time_pos..].find("5.00000000e-1").unwrap();
        assert!(first < second);
        assert!(text.contains("node\n1\n1\nhist\ntecplot"));
        assert!(text.contains("cont\nsurf"));
    }
}
