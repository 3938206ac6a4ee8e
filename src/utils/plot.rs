//! # 对比图生成
//!
//! 使用 `plotters` 绘制模拟结果与参考解的对比图。
//!
//! ## 功能
//! - 多子图网格布局（按列数自动换行）
//! - 实线 / 虚线 / 散点三种曲线样式
//! - 可选对数 x 轴
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/verify/` 调用
//! - 使用 `plotters` 渲染图表

use crate::error::{FehmError, Result};

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::Ranged;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 默认配色
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 102, 204),
    RGBColor(204, 51, 51),
    RGBColor(0, 153, 76),
    RGBColor(230, 138, 0),
    RGBColor(128, 0, 153),
    RGBColor(90, 90, 90),
];

/// 曲线样式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Line,
    Dashed,
    Markers,
}

/// 单条曲线
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
    pub style: Style,
}

impl Series {
    pub fn new(label: &str, xs: &[f64], ys: &[f64], color: RGBColor, style: Style) -> Self {
        Series {
            label: label.to_string(),
            points: xs.iter().copied().zip(ys.iter().copied()).collect(),
            color,
            style,
        }
    }
}

/// 子图
#[derive(Debug, Clone, Default)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_x: bool,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn new(title: &str, x_label: &str, y_label: &str) -> Self {
        Panel {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            ..Default::default()
        }
    }

    pub fn log_x(mut self) -> Self {
        self.log_x = true;
        self
    }

    pub fn with(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// 有效数据点（对数轴时剔除 x <= 0）
    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let log_x = self.log_x;
        self.series
            .iter()
            .flat_map(|s| s.points.iter().copied())
            .filter(move |(x, y)| x.is_finite() && y.is_finite() && (!log_x || *x > 0.0))
    }

    /// (x 范围, y 范围)
    fn ranges(&self) -> ((f64, f64), (f64, f64)) {
        let mut xr = (f64::INFINITY, f64::NEG_INFINITY);
        let mut yr = (f64::INFINITY, f64::NEG_INFINITY);
        for (x, y) in self.points() {
            xr = (xr.0.min(x), xr.1.max(x));
            yr = (yr.0.min(y), yr.1.max(y));
        }
        if !xr.0.is_finite() {
            xr = if self.log_x { (1.0, 10.0) } else { (0.0, 1.0) };
        }
        if !yr.0.is_finite() {
            yr = (0.0, 1.0);
        }
        if xr.1 <= xr.0 {
            xr = if self.log_x {
                (xr.0 / 2.0, xr.0 * 2.0)
            } else {
                (xr.0 - 0.5, xr.0 + 0.5)
            };
        }
        let pad = if yr.1 > yr.0 {
            0.05 * (yr.1 - yr.0)
        } else {
            0.5 * yr.0.abs().max(1.0)
        };
        (xr, (yr.0 - pad, yr.1 + pad))
    }
}

/// 整张图
#[derive(Debug, Clone)]
pub struct Figure {
    pub title: String,
    pub panels: Vec<Panel>,
    pub columns: usize,
    pub panel_size: (u32, u32),
}

impl Figure {
    pub fn new(title: &str, columns: usize) -> Self {
        Figure {
            title: title.to_string(),
            panels: vec![],
            columns: columns.max(1),
            panel_size: (640, 480),
        }
    }

    pub fn push(&mut self, panel: Panel) {
        self.panels.push(panel);
    }

    fn grid_shape(&self) -> (usize, usize) {
        let cols = self.columns.min(self.panels.len().max(1));
        let rows = self.panels.len().max(1).div_ceil(cols);
        (rows, cols)
    }

    fn size(&self) -> (u32, u32) {
        let (rows, cols) = self.grid_shape();
        (
            self.panel_size.0 * cols as u32,
            self.panel_size.1 * rows as u32 + 40,
        )
    }
}

/// 输出图像；`use_svg` 为假时写 PNG
pub fn render(figure: &Figure, output_path: &Path, use_svg: bool) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, figure.size()).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()
            .map_err(|e| FehmError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, figure.size()).into_drawing_area();
        draw_figure(&root, figure)?;
        root.present()
            .map_err(|e| FehmError::PlotError(e.to_string()))?;
    }
    Ok(())
}

fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;
    let body = root
        .titled(&figure.title, ("sans-serif", 26).into_font())
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;

    let (rows, cols) = figure.grid_shape();
    let areas = body.split_evenly((rows, cols));
    for (area, panel) in areas.iter().zip(&figure.panels) {
        if panel.log_x {
            draw_log_panel(area, panel)?;
        } else {
            draw_linear_panel(area, panel)?;
        }
    }
    Ok(())
}

fn draw_linear_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let ((x0, x1), (y0, y1)) = panel.ranges();
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .label_style(("sans-serif", 13))
        .axis_desc_style(("sans-serif", 14))
        .draw()
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;

    draw_series(&mut chart, panel)
}

fn draw_log_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let ((x0, x1), (y0, y1)) = panel.ranges();
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 18).into_font())
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x0..x1).log_scale(), y0..y1)
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .label_style(("sans-serif", 13))
        .axis_desc_style(("sans-serif", 14))
        .draw()
        .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;

    draw_series(&mut chart, panel)
}

/// 线性轴与对数轴共用的曲线绘制
fn draw_series<'a, DB, X>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, RangedCoordf64>>,
    panel: &Panel,
) -> Result<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64>,
{
    for series in &panel.series {
        let color = series.color;
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite() && (!panel.log_x || *x > 0.0))
            .collect();
        if points.is_empty() {
            continue;
        }

        let anno = match series.style {
            Style::Line => chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?,
            Style::Dashed => chart
                .draw_series(DashedLineSeries::new(points, 8, 5, color.stroke_width(2)))
                .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?,
            Style::Markers => chart
                .draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))
                .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?,
        };
        // 无标签的曲线不进图例
        if !series.label.is_empty() {
            anno.label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }
    }

    if panel.series.iter().any(|s| !s.label.is_empty()) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 12))
            .draw()
            .map_err(|e| FehmError::PlotError(format!("{:?}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_ranges_skip_nonpositive_on_log_axis() {
        let panel = Panel::new("p", "r (m)", "P (MPa)").log_x().with(Series::new(
            "s",
            &[0.0, 1.0, 100.0],
            &[50.0, 20.0, 21.0],
            PALETTE[0],
            Style::Line,
        ));
        let ((x0, x1), (y0, y1)) = panel.ranges();
        assert_eq!((x0, x1), (1.0, 100.0));
        assert!(y0 < 20.0 && y1 > 21.0 && y1 < 50.0);
    }

    #[test]
    fn test_empty_panel_has_default_range() {
        let panel = Panel::new("empty", "x", "y");
        assert_eq!(panel.ranges().0, (0.0, 1.0));
    }

    #[test]
    fn test_grid_shape() {
        let mut fig = Figure::new("f", 2);
        for _ in 0..3 {
            fig.push(Panel::new("p", "x", "y"));
        }
        assert_eq!(fig.grid_shape(), (2, 2));
        assert_eq!(fig.size(), (1280, 1000));
    }
}
