//! # 结构化六面体网格
//!
//! 生成 FEHM 使用的张量积网格，并写出 `coor`/`elem` 格式的网格文件。
//!
//! ## 网格文件格式
//! ```text
//! coor
//!        8
//!        1   0.000000000000   0.000000000000   0.000000000000
//!        ...
//!
//! elem
//!    8       1
//!        1       1       2       4       3       5       6       8       7
//!
//! stop
//! ```
//!
//! ## 依赖关系
//! - 被 `models/deck.rs`, `vtk/`, `commands/verify/` 使用
//! - 无外部 crate 依赖

use crate::error::{FehmError, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// 坐标去重容差
const COORD_TOL: f64 = 1e-9;

/// 楔形网格的圆心角（度）
pub const WEDGE_DEGREES: f64 = 1.0;

/// 坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// 网格节点（编号从 1 开始）
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub index: usize,
    pub position: [f64; 3],
}

/// 六面体单元，节点顺序：底面逆时针，再顶面逆时针
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub index: usize,
    pub nodes: [usize; 8],
}

/// 结构化网格
#[derive(Debug, Clone)]
pub struct Grid {
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub radial: bool,
}

/// 边界区域：名称与约定编号
pub const BOUNDARY_ZONES: [(&str, usize, Axis, bool); 6] = [
    ("XMIN", 999, Axis::X, false),
    ("XMAX", 998, Axis::X, true),
    ("YMIN", 997, Axis::Y, false),
    ("YMAX", 996, Axis::Y, true),
    ("ZMIN", 995, Axis::Z, false),
    ("ZMAX", 994, Axis::Z, true),
];

impl Grid {
    /// 由三个坐标轴生成张量积网格（x 最快变化，其次 y，最后 z）
    ///
    /// `radial` 为真时 x 视为半径，y 坐标缩放为 1° 楔形在该半径处的弧长。
    pub fn make(x: &[f64], y: &[f64], z: &[f64], radial: bool) -> Result<Self> {
        for (name, coords) in [("x", x), ("y", y), ("z", z)] {
            if coords.len() < 2 {
                return Err(FehmError::InvalidGrid(format!(
                    "axis {} needs at least two coordinates, got {}",
                    name,
                    coords.len()
                )));
            }
            if coords.windows(2).any(|w| w[1] <= w[0]) {
                return Err(FehmError::InvalidGrid(format!(
                    "axis {} coordinates must be strictly increasing",
                    name
                )));
            }
        }
        if radial && x[0] <= 0.0 {
            return Err(FehmError::InvalidGrid(
                "radial grid needs a positive inner radius".to_string(),
            ));
        }

        let (nx, ny, nz) = (x.len(), y.len(), z.len());
        let y0 = y[0];
        let y_span = y[ny - 1] - y0;
        let arc = WEDGE_DEGREES.to_radians();

        let mut nodes = Vec::with_capacity(nx * ny * nz);
        for zk in z {
            for yj in y {
                for xi in x {
                    let yy = if radial {
                        y0 + (yj - y0) / y_span * xi * arc
                    } else {
                        *yj
                    };
                    nodes.push(Node {
                        index: nodes.len() + 1,
                        position: [*xi, yy, *zk],
                    });
                }
            }
        }

        let id = |i: usize, j: usize, k: usize| k * nx * ny + j * nx + i + 1;
        let mut elements = Vec::with_capacity((nx - 1) * (ny - 1) * (nz - 1));
        for k in 0..nz - 1 {
            for j in 0..ny - 1 {
                for i in 0..nx - 1 {
                    elements.push(Element {
                        index: elements.len() + 1,
                        nodes: [
                            id(i, j, k),
                            id(i + 1, j, k),
                            id(i + 1, j + 1, k),
                            id(i, j + 1, k),
                            id(i, j, k + 1),
                            id(i + 1, j, k + 1),
                            id(i + 1, j + 1, k + 1),
                            id(i, j + 1, k + 1),
                        ],
                    });
                }
            }
        }

        Ok(Grid {
            nodes,
            elements,
            nx,
            ny,
            nz,
            radial,
        })
    }

    pub fn number_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_elems(&self) -> usize {
        self.elements.len()
    }

    /// 按编号取节点
    pub fn node(&self, index: usize) -> Option<&Node> {
        index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    /// 各轴 (min, max)
    pub fn bounds(&self) -> [(f64, f64); 3] {
        let mut b = [(f64::INFINITY, f64::NEG_INFINITY); 3];
        for node in &self.nodes {
            for (axis, range) in b.iter_mut().enumerate() {
                range.0 = range.0.min(node.position[axis]);
                range.1 = range.1.max(node.position[axis]);
            }
        }
        b
    }

    /// 满足条件的节点编号
    pub fn nodes_where<F>(&self, axis: Axis, predicate: F) -> Vec<usize>
    where
        F: Fn(f64) -> bool,
    {
        self.nodes
            .iter()
            .filter(|n| predicate(n.position[axis.index()]))
            .map(|n| n.index)
            .collect()
    }

    /// 某轴坐标最接近给定值的节点
    pub fn nearest_node(&self, axis: Axis, value: f64) -> Option<usize> {
        self.nodes
            .iter()
            .min_by(|a, b| {
                let da = (a.position[axis.index()] - value).abs();
                let db = (b.position[axis.index()] - value).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|n| n.index)
    }

    /// 某轴上互不相同的坐标（升序）
    pub fn unique_coords(&self, axis: Axis) -> Vec<f64> {
        let mut coords: Vec<f64> = self.nodes.iter().map(|n| n.position[axis.index()]).collect();
        coords.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        coords.dedup_by(|a, b| (*a - *b).abs() < COORD_TOL);
        coords
    }

    /// 边界区域 (名称, 编号, 节点列表)
    ///
    /// 按网格下标取面。径向网格的 YMIN / YMAX 是楔形的两个侧面。
    pub fn boundary_zones(&self) -> Vec<(String, usize, Vec<usize>)> {
        let dims = [self.nx, self.ny, self.nz];
        BOUNDARY_ZONES
            .iter()
            .map(|(name, index, axis, is_max)| {
                let a = axis.index();
                let target = if *is_max { dims[a] - 1 } else { 0 };
                let nodes = self
                    .nodes
                    .iter()
                    .filter(|n| self.lattice(n.index)[a] == target)
                    .map(|n| n.index)
                    .collect();
                (name.to_string(), *index, nodes)
            })
            .collect()
    }

    /// 节点编号对应的 (i, j, k)
    fn lattice(&self, index: usize) -> [usize; 3] {
        let i = index.saturating_sub(1);
        [i % self.nx, (i / self.nx) % self.ny, i / (self.nx * self.ny)]
    }

    /// 生成网格文件文本
    pub fn to_grid_string(&self) -> String {
        let mut s = String::new();
        s.push_str("coor\n");
        let _ = writeln!(s, "{:>8}", self.nodes.len());
        for node in &self.nodes {
            let _ = writeln!(
                s,
                "{:>8} {:>20.12} {:>20.12} {:>20.12}",
                node.index, node.position[0], node.position[1], node.position[2]
            );
        }
        s.push('\n');
        s.push_str("elem\n");
        let _ = writeln!(s, "{:>4} {:>8}", 8, self.elements.len());
        for el in &self.elements {
            let _ = write!(s, "{:>8}", el.index);
            for n in &el.nodes {
                let _ = write!(s, " {:>8}", n);
            }
            s.push('\n');
        }
        s.push('\n');
        s.push_str("stop\n");
        s
    }

    /// 写出网格文件
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_grid_string()).map_err(|e| FehmError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}

/// 等间距坐标
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { b } else { a + step * i as f64 })
                .collect()
        }
    }
}

/// 对数等间距坐标（a、b 为实际端点，非指数）
pub fn logspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    linspace(a.log10(), b.log10(), n)
        .into_iter()
        .enumerate()
        .map(|(i, e)| match i {
            0 => a,
            _ if i == n - 1 => b,
            _ => 10f64.powf(e),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        assert_eq!(grid.number_nodes(), 8);
        assert_eq!(grid.number_elems(), 1);
        assert_eq!(grid.elements[0].nodes, [1, 2, 4, 3, 5, 6, 8, 7]);
        assert_eq!(grid.node(8).unwrap().position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_boundary_zones() {
        let x = linspace(0.0, 1.0, 11);
        let grid = Grid::make(&x, &[0.0, 0.1], &[0.0, 0.1], false).unwrap();
        let zones = grid.boundary_zones();
        let xmin = zones.iter().find(|z| z.0 == "XMIN").unwrap();
        let xmax = zones.iter().find(|z| z.0 == "XMAX").unwrap();
        assert_eq!(xmin.1, 999);
        assert_eq!(xmin.2, vec![1, 12, 23, 34]);
        assert_eq!(xmax.2, vec![11, 22, 33, 44]);
    }

    #[test]
    fn test_radial_wedge_width() {
        let grid = Grid::make(&[1.0, 10.0], &[0.0, 1.0], &[0.0, 1.0], true).unwrap();
        let arc = 1f64.to_radians();
        assert!((grid.node(3).unwrap().position[1] - arc).abs() < 1e-12);
        assert!((grid.node(4).unwrap().position[1] - 10.0 * arc).abs() < 1e-12);
    }

    #[test]
    fn test_radial_side_faces() {
        let grid = Grid::make(&[1.0, 10.0], &[0.0, 1.0], &[0.0, 1.0], true).unwrap();
        let zones = grid.boundary_zones();
        let face = |name: &str| zones.iter().find(|z| z.0 == name).unwrap().2.clone();
        assert_eq!(face("YMIN"), vec![1, 2, 5, 6]);
        assert_eq!(face("YMAX"), vec![3, 4, 7, 8]);
        assert_eq!(face("XMIN"), vec![1, 3, 5, 7]);
        assert_eq!(face("ZMAX"), vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_unique_coords() {
        let grid = Grid::make(&[0.0, 0.5, 1.0], &[0.0, 0.1], &[0.0, 0.1], false).unwrap();
        assert_eq!(grid.unique_coords(Axis::X), vec![0.0, 0.5, 1.0]);
        assert_eq!(grid.unique_coords(Axis::Z), vec![0.0, 0.1]);
    }

    #[test]
    fn test_invalid_axis() {
        assert!(Grid::make(&[0.0], &[0.0, 1.0], &[0.0, 1.0], false).is_err());
        assert!(Grid::make(&[0.0, 0.0], &[0.0, 1.0], &[0.0, 1.0], false).is_err());
    }

    #[test]
    fn test_logspace_endpoints() {
        let r = logspace(0.5, 1000.0, 101);
        assert_eq!(r.len(), 101);
        assert_eq!(r[0], 0.5);
        assert_eq!(r[100], 1000.0);
        let mid = r[50];
        assert!((mid - (0.5f64 * 1000.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_grid_string_layout() {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        let text = grid.to_grid_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "coor");
        assert_eq!(lines[1].trim(), "8");
        assert!(lines.contains(&"elem"));
        assert_eq!(*lines.last().unwrap(), "stop");
    }
}
