//! # export 命令实现
//!
//! 将已完成的模拟工作目录导出为 VTK 非结构网格和 ParaView 启动脚本。
//!
//! ## 流程
//! 1. 读取 `grid.inp` 重建六面体网格
//! 2. 可选的均匀渗透率 (`--perm kx,ky,kz`)
//! 3. 读取 `<root>.*_days_sca_node.csv` 快照
//! 4. 写出 `<root>.vtk` 与 `pyfehm_paraview_startup.py`
//!
//! ## 依赖关系
//! - 使用 `cli/export.rs` 定义的参数
//! - 使用 `parsers/grid_inp.rs`, `parsers/contour.rs`, `vtk/`

use crate::cli::export::{ExportArgs, ExportCommands, VtkArgs};
use crate::cli::parse_list;
use crate::error::{FehmError, Result};
use crate::models::deck::{NodeProperties, GRID_FILE};
use crate::parsers::{contour, grid_inp};
use crate::utils::output;
use crate::vtk::{self, VtkExport};

use std::path::PathBuf;

/// 执行 export 命令
pub fn execute(args: ExportArgs) -> Result<()> {
    match args.command {
        ExportCommands::Vtk(a) => export_vtk(a).map(|_| ()),
    }
}

/// `--perm` 参数：恰好三个分量
pub fn parse_perm(input: &str) -> Result<[f64; 3]> {
    let values = parse_list::<f64>(input).map_err(FehmError::InvalidList)?;
    match values.as_slice() {
        [kx, ky, kz] => Ok([*kx, *ky, *kz]),
        _ => Err(FehmError::InvalidList(format!(
            "'{}' must have three values kx,ky,kz",
            input
        ))),
    }
}

fn export_vtk(args: VtkArgs) -> Result<PathBuf> {
    output::print_header("VTK Export");

    if !args.work_dir.is_dir() {
        return Err(FehmError::DirectoryNotFound {
            path: args.work_dir.display().to_string(),
        });
    }
    let grid_path = args.work_dir.join(GRID_FILE);
    if !grid_path.exists() {
        return Err(FehmError::FileNotFound {
            path: grid_path.display().to_string(),
        });
    }

    let coords = grid_inp::parse_grid_coords(&grid_path)?;
    let grid = grid_inp::grid_from_coords(&coords)?;
    output::print_kv(
        "Grid",
        &format!(
            "{} nodes, {} elements ({}×{}×{})",
            grid.number_nodes(),
            grid.number_elems(),
            grid.nx,
            grid.ny,
            grid.nz
        ),
    );

    let properties = match &args.perm {
        Some(perm) => NodeProperties::uniform_permeability(grid.number_nodes(), parse_perm(perm)?),
        None => NodeProperties::unset(grid.number_nodes()),
    };

    let contours = if args.no_contours {
        None
    } else {
        let c = contour::read_contours(&args.work_dir, &args.root)?;
        if c.is_empty() {
            output::print_warning(&format!(
                "No contour snapshots for root '{}' in '{}'",
                args.root,
                args.work_dir.display()
            ));
        } else {
            output::print_kv("Snapshots", &format!("{}", c.snapshots.len()));
        }
        Some(c)
    };

    let mut export = VtkExport::new(&grid, &properties, contours.as_ref());
    export.assemble()?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| args.work_dir.join(format!("{}.vtk", args.root)));
    export.write(&path)?;
    output::print_success(&format!(
        "Wrote '{}' ({} point arrays)",
        path.display(),
        export.arrays().len()
    ));

    let script = path
        .parent()
        .map(|p| p.join(vtk::STARTUP_SCRIPT))
        .unwrap_or_else(|| PathBuf::from(vtk::STARTUP_SCRIPT));
    export.startup_script(&script)?;
    output::print_success(&format!("Wrote '{}'", script.display()));

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::grid::Grid;
    use std::fs;

    #[test]
    fn test_parse_perm() {
        assert_eq!(parse_perm("1e-12,1e-12,1e-13").unwrap(), [1e-12, 1e-12, 1e-13]);
        assert!(parse_perm("1e-12,1e-12").is_err());
        assert!(parse_perm("a,b,c").is_err());
    }

    #[test]
    fn test_export_from_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let grid = Grid::make(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        grid.write(&dir.path().join(GRID_FILE)).unwrap();
        fs::write(
            dir.path().join("run.1.0_days_sca_node.csv"),
            "node, Liquid Pressure (MPa)\n1,1\n2,1\n3,1\n4,1\n5,2\n6,2\n7,2\n8,2\n",
        )
        .unwrap();

        let path = export_vtk(VtkArgs {
            work_dir: dir.path().to_path_buf(),
            root: "run".to_string(),
            perm: Some("1e-12,1e-12,1e-13".to_string()),
            output: None,
            no_contours: false,
        })
        .unwrap();

        assert_eq!(path, dir.path().join("run.vtk"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("CELL_TYPES 1"));
        assert!(text.contains("SCALARS kx"));
        assert!(dir.path().join(vtk::STARTUP_SCRIPT).exists());
    }

    #[test]
    fn test_missing_grid_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_vtk(VtkArgs {
            work_dir: dir.path().to_path_buf(),
            root: "run".to_string(),
            perm: None,
            output: None,
            no_contours: true,
        });
        assert!(matches!(result, Err(FehmError::FileNotFound { .. })));
    }
}
