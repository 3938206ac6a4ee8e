//! # FEHM 网格文件解析器
//!
//! 从 `grid.inp` 的 `coor` 块读取节点坐标。
//!
//! ## 依赖关系
//! - 被 `commands/verify/`, `commands/export.rs` 使用
//! - 与 `models/grid.rs` 的写出格式对应

use crate::error::{FehmError, Result};
use crate::models::grid::Grid;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 节点编号 -> 坐标
pub type NodeCoords = BTreeMap<usize, [f64; 3]>;

/// 解析网格文件
pub fn parse_grid_coords(path: &Path) -> Result<NodeCoords> {
    let content = fs::read_to_string(path).map_err(|e| FehmError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_grid_content(&content).map_err(|reason| FehmError::ParseError {
        format: "grid".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

/// 从字符串解析 coor 块
pub fn parse_grid_content(content: &str) -> std::result::Result<NodeCoords, String> {
    let mut lines = content.lines().skip_while(|l| !l.trim().starts_with("coor"));

    if lines.next().is_none() {
        return Err("missing 'coor' block".to_string());
    }

    let count: usize = lines
        .next()
        .and_then(|l| l.split_whitespace().next())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "missing node count after 'coor'".to_string())?;

    let mut coords = NodeCoords::new();
    for line in lines.take(count) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let Ok(index) = parts[0].parse::<usize>() else {
            continue;
        };
        let xyz: Vec<f64> = parts[1..4].iter().filter_map(|s| s.parse().ok()).collect();
        if xyz.len() == 3 {
            coords.insert(index, [xyz[0], xyz[1], xyz[2]]);
        }
    }

    Ok(coords)
}

/// 从网格文件重建结构化网格（按唯一坐标还原张量积网格）
pub fn grid_from_coords(coords: &NodeCoords) -> Result<Grid> {
    let axis_values = |axis: usize| {
        let mut v: Vec<f64> = coords.values().map(|p| p[axis]).collect();
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        v.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        v
    };

    let x = axis_values(0);
    let z = axis_values(2);
    let ny = coords.len() / (x.len() * z.len()).max(1);

    // 楔形网格 y 随半径变化，按编号顺序取第一列的 y 值
    let y: Vec<f64> = coords
        .values()
        .step_by(x.len().max(1))
        .take(ny)
        .map(|p| p[1])
        .collect();

    let mut grid = Grid::make(&x, &y, &z, false)?;
    if grid.number_nodes() != coords.len() {
        return Err(FehmError::InvalidGrid(format!(
            "{} nodes do not form a structured grid",
            coords.len()
        )));
    }
    for node in &mut grid.nodes {
        if let Some(p) = coords.get(&node.index) {
            node.position = *p;
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::Grid;

    #[test]
    fn test_parse_written_grid() {
        let grid = Grid::make(&[0.0, 0.5, 1.0], &[0.0, 0.1], &[0.0, 0.1], false).unwrap();
        let coords = parse_grid_content(&grid.to_grid_string()).unwrap();
        assert_eq!(coords.len(), 12);
        assert_eq!(coords[&2], [0.5, 0.0, 0.0]);
        assert_eq!(coords[&12], [1.0, 0.1, 0.1]);
    }

    #[test]
    fn test_missing_coor_block() {
        assert!(parse_grid_content("elem\n8 1\n").is_err());
    }

    #[test]
    fn test_short_lines_skipped() {
        let content = "coor\n3\n1 0.0 0.0 0.0\n2 1.0\n3 2.0 0.0 0.0\n";
        let coords = parse_grid_content(content).unwrap();
        assert_eq!(coords.len(), 2);
        assert!(coords.contains_key(&3));
    }

    #[test]
    fn test_rebuild_radial_grid() {
        let grid = Grid::make(&[1.0, 2.0, 4.0], &[0.0, 1.0], &[0.0, 1.0], true).unwrap();
        let coords = parse_grid_content(&grid.to_grid_string()).unwrap();
        let rebuilt = grid_from_coords(&coords).unwrap();
        assert_eq!(rebuilt.number_elems(), 2);
        for (a, b) in rebuilt.nodes[5].position.iter().zip(grid.nodes[5].position) {
            assert!((a - b).abs() < 1e-10);
        }
    }
}
