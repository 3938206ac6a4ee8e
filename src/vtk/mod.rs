//! # VTK 可视化导出
//!
//! 将网格几何、节点物性与等值线快照组装为 VTK 非结构网格，
//! 并生成 ParaView 启动脚本。
//!
//! ## 数据数组
//! - `kx`, `ky`, `kz`：渗透率（平均值为正时取 log10）
//! - `density`：岩石密度（未设置为 NaN）
//! - `n`, `x`, `y`, `z`：仅取自第一个快照时刻
//! - 其余快照变量命名为 `<变量>_<时间>`
//!
//! ## 依赖关系
//! - 被 `commands/export.rs`, `commands/verify/` 使用
//! - 使用 `models/`, `parsers/contour.rs`
//! - 子模块: legacy (文件写出), paraview (启动脚本)

pub mod legacy;
pub mod paraview;

use crate::error::{FehmError, Result};
use crate::models::deck::NodeProperties;
use crate::models::grid::Grid;
use crate::parsers::contour::{Contour, ContourSnapshot};

use std::path::Path;

/// ParaView 启动脚本文件名
pub const STARTUP_SCRIPT: &str = "pyfehm_paraview_startup.py";

/// 只在第一个时刻导出的几何列
const GEOMETRY_VARIABLES: [&str; 3] = ["x", "y", "z"];

/// 节点数据数组
#[derive(Debug, Clone, PartialEq)]
pub struct PointArray {
    pub name: String,
    pub values: Vec<f64>,
}

/// 渗透率取值范围，供启动脚本设置色标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermLimits {
    pub kx: (f64, f64),
    pub ky: (f64, f64),
    pub kz: (f64, f64),
}

/// VTK 导出器
pub struct VtkExport<'a> {
    grid: &'a Grid,
    properties: &'a NodeProperties,
    contour: Option<&'a Contour>,
    arrays: Vec<PointArray>,
    limits: Option<PermLimits>,
}

impl<'a> VtkExport<'a> {
    pub fn new(grid: &'a Grid, properties: &'a NodeProperties, contour: Option<&'a Contour>) -> Self {
        VtkExport {
            grid,
            properties,
            contour,
            arrays: vec![],
            limits: None,
        }
    }

    /// 组装全部节点数组
    pub fn assemble(&mut self) -> Result<()> {
        let n = self.grid.number_nodes();
        if self.properties.permeability.len() != n || self.properties.density.len() != n {
            return Err(FehmError::InvalidArgument(format!(
                "node properties cover {} nodes, grid has {}",
                self.properties.permeability.len(),
                n
            )));
        }

        self.arrays.clear();
        self.assemble_properties();
        if let Some(contour) = self.contour {
            self.assemble_contour(contour);
        }
        Ok(())
    }

    fn assemble_properties(&mut self) {
        let perms = &self.properties.permeability;
        let count = (perms.len() * 3).max(1) as f64;
        let mean = perms.iter().flat_map(|p| p.iter()).sum::<f64>() / count;
        let take_log = mean > 0.0;

        let column = |axis: usize| -> Vec<f64> {
            perms
                .iter()
                .map(|p| if take_log { p[axis].log10() } else { p[axis] })
                .collect()
        };
        let (kx, ky, kz) = (column(0), column(1), column(2));

        self.limits = Some(PermLimits {
            kx: min_max(&kx),
            ky: min_max(&ky),
            kz: min_max(&kz),
        });

        for (name, values) in [("kx", kx), ("ky", ky), ("kz", kz)] {
            self.arrays.push(PointArray {
                name: name.to_string(),
                values,
            });
        }
        self.arrays.push(PointArray {
            name: "density".to_string(),
            values: self.properties.density.clone(),
        });
    }

    fn assemble_contour(&mut self, contour: &Contour) {
        let n = self.grid.number_nodes();
        for (i, snapshot) in contour.snapshots.iter().enumerate() {
            if i == 0 {
                let mut numbers = vec![f64::NAN; n];
                for node in &snapshot.nodes {
                    if let Some(v) = numbers.get_mut(node.wrapping_sub(1)) {
                        *v = *node as f64;
                    }
                }
                self.arrays.push(PointArray {
                    name: "n".to_string(),
                    values: numbers,
                });
            }

            for (col, header) in snapshot.headers.iter().enumerate() {
                let var = short_name(header);
                let is_geometry = GEOMETRY_VARIABLES.contains(&var.as_str());
                if is_geometry && i > 0 {
                    continue;
                }
                let name = if is_geometry {
                    var
                } else {
                    format!("{}_{}", var, snapshot.time)
                };
                self.arrays.push(PointArray {
                    name,
                    values: node_values(snapshot, col, n),
                });
            }
        }
    }

    pub fn arrays(&self) -> &[PointArray] {
        &self.arrays
    }

    pub fn limits(&self) -> Option<PermLimits> {
        self.limits
    }

    /// 写出 VTK 文件
    pub fn write(&self, path: &Path) -> Result<()> {
        legacy::write(path, self.grid, &self.arrays)
    }

    /// 写出 ParaView 启动脚本
    pub fn startup_script(&self, path: &Path) -> Result<()> {
        let limits = self.limits.ok_or_else(|| {
            FehmError::InvalidArgument("VTK data must be assembled before writing the startup script".to_string())
        })?;
        paraview::write_startup_script(path, self.grid, &limits)
    }
}

/// 列名简写：去掉单位括号，空白替换为下划线
pub fn short_name(header: &str) -> String {
    let base = header.split('(').next().unwrap_or(header).trim();
    base.split_whitespace().collect::<Vec<_>>().join("_")
}

/// 按网格节点顺序排列的快照列，缺失节点为 NaN
fn node_values(snapshot: &ContourSnapshot, col: usize, n: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; n];
    for (node, v) in snapshot.nodes.iter().zip(&snapshot.columns[col]) {
        if let Some(slot) = values.get_mut(node.wrapping_sub(1)) {
            *slot = *v;
        }
    }
    values
}

/// 忽略 NaN 的最小/最大值，全部为 NaN 时为 (0, 0)
fn min_max(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::contour::parse_snapshot_content;

    const SNAP: &str = "node, x (m), y (m), z (m), Liquid Pressure (MPa)\n\
1, 0, 0, 0, 1.0\n2, 1, 0, 0, 2.0\n3, 0, 1, 0, 3.0\n4, 1, 1, 0, 4.0\n\
5, 0, 0, 1, 5.0\n6, 1, 0, 1, 6.0\n7, 0, 1, 1, 7.0\n8, 1, 1, 1, 8.0\n";

    fn grid() -> Grid {
        Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap()
    }

    #[test]
    fn test_log_permeability_and_limits() {
        let grid = grid();
        let mut props = NodeProperties::uniform_permeability(8, [1e-12, 1e-13, 1e-14]);
        props.permeability[0] = [1e-15, 1e-13, 1e-14];
        let mut vtk = VtkExport::new(&grid, &props, None);
        vtk.assemble().unwrap();

        let names: Vec<&str> = vtk.arrays().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["kx", "ky", "kz", "density"]);
        let limits = vtk.limits().unwrap();
        assert!((limits.kx.0 + 15.0).abs() < 1e-12);
        assert!((limits.kx.1 + 12.0).abs() < 1e-12);
        assert!(vtk.arrays()[3].values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_unset_permeability_not_logged() {
        let grid = grid();
        let props = NodeProperties::unset(8);
        let mut vtk = VtkExport::new(&grid, &props, None);
        vtk.assemble().unwrap();
        assert!(vtk.arrays()[0].values[0].is_nan());
        let limits = vtk.limits().unwrap();
        assert_eq!(limits.kx, (0.0, 0.0));
        assert_eq!(limits.kz, (0.0, 0.0));
    }

    #[test]
    fn test_contour_arrays_named_by_time() {
        let grid = grid();
        let props = NodeProperties::uniform_permeability(8, [1e-12; 3]);
        let contour = Contour {
            snapshots: vec![
                parse_snapshot_content(SNAP, 0.5).unwrap(),
                parse_snapshot_content(SNAP, 1.0).unwrap(),
            ],
        };
        let mut vtk = VtkExport::new(&grid, &props, Some(&contour));
        vtk.assemble().unwrap();

        let names: Vec<&str> = vtk.arrays().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            &names[4..],
            &["n", "x", "y", "z", "liquid_pressure_0.5", "liquid_pressure_1"]
        );
        let p = &vtk.arrays()[8].values;
        assert_eq!(p[7], 8.0);
    }

    #[test]
    fn test_property_length_mismatch() {
        let grid = grid();
        let props = NodeProperties::unset(3);
        let mut vtk = VtkExport::new(&grid, &props, None);
        assert!(vtk.assemble().is_err());
        assert!(vtk.startup_script(Path::new("unused.py")).is_err());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("liquid pressure (mpa)"), "liquid_pressure");
        assert_eq!(short_name("x (m)"), "x");
        assert_eq!(short_name("temperature"), "temperature");
    }
}
