//! # ParaView 启动脚本
//!
//! 生成在 ParaView Python shell 中执行的脚本：相机对准网格包围盒中心，
//! 按 `kx` 着色，色标范围取渗透率极值。
//!
//! ## 依赖关系
//! - 被 `vtk/mod.rs` 使用

use super::PermLimits;
use crate::error::{FehmError, Result};
use crate::models::grid::Grid;

use std::fs;
use std::path::Path;

/// 初始显示的数组
const INITIAL_DISPLAY: &str = "'kx'";

/// 生成脚本文本
pub fn startup_script_text(grid: &Grid, limits: &PermLimits) -> String {
    let [(x0, x1), (y0, y1), (z0, z1)] = grid.bounds();
    let (xm, ym, zm) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0, (z0 + z1) / 2.0);
    let (xr, yr, zr) = (x1 - x0, y1 - y0, z1 - z0);
    let (k0, k1) = limits.kx;
    let d = INITIAL_DISPLAY;

    let lines = [
        "try: paraview.simple".to_string(),
        "except: from paraview.simple import *".to_string(),
        "paraview.simple._DisableFirstRenderCameraReset()".to_string(),
        String::new(),
        "temp_vtk = GetActiveSource()".to_string(),
        "RenderView1 = GetRenderView()".to_string(),
        "DataRepresentation1 = Show()".to_string(),
        "DataRepresentation1.ScalarOpacityUnitDistance = 1.7320508075688779".to_string(),
        "DataRepresentation1.EdgeColor = [0.0, 0.0, 0.5]".to_string(),
        String::new(),
        "Render()".to_string(),
        format!("RenderView1.CenterOfRotation = [{:10.5}, {:10.5}, {:10.5}]", xm, ym, zm),
        String::new(),
        "RenderView1.CameraViewUp = [-0.4, -0.11, 0.92]".to_string(),
        format!(
            "RenderView1.CameraPosition = [{:10.5}, {:10.5}, {:10.5}]",
            xm + 2.5 * xr,
            ym + 1.5 * yr,
            zm + 1.5 * zr
        ),
        format!("RenderView1.CameraFocalPoint = [{:10.5}, {:10.5}, {:10.5}]", xm, ym, zm),
        String::new(),
        "my_representation0 = GetDisplayProperties(temp_vtk)".to_string(),
        "my_representation0.Representation = 'Surface With Edges'".to_string(),
        String::new(),
        format!(
            "a1_PVLookupTable = GetLookupTableForArray( {}, 1, RGBPoints=[{:.2}, 0.23, 0.299, 0.754, {:.2}, 0.706, 0.016, 0.15], VectorMode='Magnitude', NanColor=[0.25, 0.0, 0.0], ColorSpace='Diverging', ScalarRangeInitialized=1.0 )",
            d, k0, k1
        ),
        String::new(),
        format!(
            "a1_PiecewiseFunction = CreatePiecewiseFunction( Points=[{:.2}, 0.0, 0.5, 0.0, {:.2}, 1.0, 0.5, 0.0] )",
            k0, k1
        ),
        String::new(),
        "my_representation0.ScalarOpacityFunction = a1_PiecewiseFunction".to_string(),
        format!("my_representation0.ColorArrayName = ('POINT_DATA', {})", d),
        "my_representation0.LookupTable = a1_PVLookupTable".to_string(),
        String::new(),
        "a1_PVLookupTable.ScalarOpacityFunction = a1_PiecewiseFunction".to_string(),
        String::new(),
        format!(
            "ScalarBarWidgetRepresentation1 = CreateScalarBar( Title={}, LabelFontSize=12, Enabled=1, TitleFontSize=12 )",
            d
        ),
        "GetRenderView().Representations.append(ScalarBarWidgetRepresentation1)".to_string(),
        String::new(),
        format!("a1_PVLookupTable = GetLookupTableForArray({}, 1 )", d),
        String::new(),
        "ScalarBarWidgetRepresentation1.LookupTable = a1_PVLookupTable".to_string(),
        String::new(),
    ];
    lines.join("\n") + "\n"
}

/// 写出启动脚本
pub fn write_startup_script(path: &Path, grid: &Grid, limits: &PermLimits) -> Result<()> {
    fs::write(path, startup_script_text(grid, limits)).map_err(|e| FehmError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
