//! # 旧版 VTK ASCII 写出
//!
//! `UNSTRUCTURED_GRID` 数据集，六面体单元类型 12，连接关系从 0 开始编号。
//!
//! ## 依赖关系
//! - 被 `vtk/mod.rs` 使用

use super::PointArray;
use crate::error::{FehmError, Result};
use crate::models::grid::Grid;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// VTK 六面体单元类型
pub const VTK_HEXAHEDRON: u8 = 12;

/// 生成 VTK 文件文本
pub fn to_vtk_string(grid: &Grid, arrays: &[PointArray]) -> String {
    let mut buffer = String::new();
    let npoint = grid.number_nodes();
    let ncell = grid.number_elems();

    buffer.push_str("# vtk DataFile Version 2.0\n");
    buffer.push_str("fehm-verify export\n");
    buffer.push_str("ASCII\n");
    buffer.push_str("DATASET UNSTRUCTURED_GRID\n");

    // nodes: coordinates
    let _ = writeln!(buffer, "POINTS {} double", npoint);
    for node in &grid.nodes {
        let [x, y, z] = node.position;
        let _ = writeln!(buffer, "{:?} {:?} {:?}", x, y, z);
    }

    // elements: connectivity
    let _ = writeln!(buffer, "CELLS {} {}", ncell, ncell * 9);
    for el in &grid.elements {
        buffer.push('8');
        for n in &el.nodes {
            let _ = write!(buffer, " {}", n - 1);
        }
        buffer.push('\n');
    }

    // elements: types
    let _ = writeln!(buffer, "CELL_TYPES {}", ncell);
    for _ in 0..ncell {
        let _ = writeln!(buffer, "{}", VTK_HEXAHEDRON);
    }

    // data: points
    if !arrays.is_empty() {
        let _ = writeln!(buffer, "POINT_DATA {}", npoint);
        for array in arrays {
            let _ = writeln!(buffer, "SCALARS {} double 1", array.name);
            buffer.push_str("LOOKUP_TABLE default\n");
            for v in &array.values {
                if v.is_nan() {
                    buffer.push_str("nan\n");
                } else {
                    let _ = writeln!(buffer, "{:?}", v);
                }
            }
        }
    }

    buffer
}

/// 写出 VTK 文件
pub fn write(path: &Path, grid: &Grid, arrays: &[PointArray]) -> Result<()> {
    fs::write(path, to_vtk_string(grid, arrays)).map_err(|e| FehmError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_hexahedron() {
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        let arrays = vec![PointArray {
            name: "kx".to_string(),
            values: vec![-12.0, -12.0, -12.0, -12.0, -12.0, -12.0, -12.0, f64::NAN],
        }];
        let text = to_vtk_string(&grid, &arrays);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# vtk DataFile Version 2.0");
        assert_eq!(lines[4], "POINTS 8 double");
        assert_eq!(lines[5], "0.0 0.0 0.0");
        assert!(text.contains("CELLS 1 9\n8 0 1 3 2 4 5 7 6\n"));
        assert!(text.contains("CELL_TYPES 1\n12\n"));
        assert!(text.contains("POINT_DATA 8\nSCALARS kx double 1\nLOOKUP_TABLE default\n-12.0\n"));
        assert_eq!(*lines.last().unwrap(), "nan");
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 2.0], false).unwrap();
        let path = dir.path().join("out.vtk");
        write(&path, &grid, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("POINT_DATA"));
    }
}
