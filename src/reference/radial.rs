//! # 径向注入辅助计算
//!
//! 径向剖面积分、等体积注入速率换算、线性插值。
//!
//! ## 依赖关系
//! - 被 `commands/verify/radial.rs` 使用

use std::f64::consts::PI;

/// 压力扰动的面积积分 `∫(P - P0) 2πr dr`（梯形法），单位 MPa·m²
pub fn integrated_delta_p(r: &[f64], p: &[f64], p0: f64) -> f64 {
    r.windows(2)
        .zip(p.windows(2))
        .map(|(rw, pw)| {
            let f0 = (pw[0] - p0) * 2.0 * PI * rw[0];
            let f1 = (pw[1] - p0) * 2.0 * PI * rw[1];
            0.5 * (f0 + f1) * (rw[1] - rw[0])
        })
        .sum()
}

/// 与水注入等体积的 CO2 质量速率
pub fn equal_volume_rate(water_rate: f64, co2_density: f64, water_density: f64) -> f64 {
    water_rate * co2_density / water_density
}

/// 整圆柱速率换算为楔形并分配到每个注入节点
pub fn wedge_rate_per_node(full_rate: f64, wedge_degrees: f64, n_nodes: usize) -> f64 {
    if n_nodes == 0 {
        return 0.0;
    }
    full_rate * wedge_degrees / 360.0 / n_nodes as f64
}

/// 线性插值；超出范围取端点值
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let i = xs[..n].partition_point(|v| *v <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    if x1 == x0 {
        y0
    } else {
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrated_uniform_disc() {
        // 均匀 ΔP=1 的圆环面积 π(R² - r²)
        let r: Vec<f64> = (0..=1000).map(|i| 1.0 + i as f64 * 0.009).collect();
        let p = vec![11.0; r.len()];
        let got = integrated_delta_p(&r, &p, 10.0);
        let want = PI * (10.0f64.powi(2) - 1.0);
        assert!((got - want).abs() / want < 1e-9);
        assert_eq!(integrated_delta_p(&r, &vec![10.0; r.len()], 10.0), 0.0);
    }

    #[test]
    fn test_rates() {
        assert!((equal_volume_rate(10.0, 700.0, 1000.0) - 7.0).abs() < 1e-12);
        assert!((wedge_rate_per_node(360.0, 1.0, 4) - 0.25).abs() < 1e-12);
        assert_eq!(wedge_rate_per_node(1.0, 1.0, 0), 0.0);
    }

    #[test]
    fn test_interp() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 10.0, 30.0];
        assert_eq!(interp(0.5, &xs, &ys), 5.0);
        assert_eq!(interp(2.0, &xs, &ys), 20.0);
        assert_eq!(interp(-1.0, &xs, &ys), 0.0);
        assert_eq!(interp(5.0, &xs, &ys), 30.0);
        assert_eq!(interp(1.0, &xs, &ys), 10.0);
    }
}
