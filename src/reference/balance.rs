//! # 单块体质量/热量守恒参考解
//!
//! 封闭块体中注入质量或热量时的压力、温度响应。
//!
//! ## 模型
//! - 质量：`dP/dt = ṁ / (V_pore ρ(P) β(P))`，常 β 时为线性
//! - 热量：`dT/dt = Q / C`，`C = V(1-φ)ρ_r c_r + Vφ ρ_w c_w`
//!
//! ## 依赖关系
//! - 被 `commands/verify/block.rs` 使用
//! - 使用 `reference/eos.rs`, `reference/ode.rs`

use crate::error::Result;
use crate::reference::{eos, ode};

/// 每天秒数
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// 质量注入参考解
#[derive(Debug, Clone)]
pub struct MassInjection {
    /// 总注入速率 (kg/s)
    pub mass_rate: f64,
    /// 常 β 压升速率 (MPa/day)
    pub rate_constant: f64,
    /// 输出时刻 (days)
    pub times: Vec<f64>,
    /// 变 β 压力 (MPa)
    pub pressure_variable: Vec<f64>,
    pub p0: f64,
}

impl MassInjection {
    /// 常 β 下的压力
    pub fn pressure_constant(&self, time_days: f64) -> f64 {
        self.p0 + self.rate_constant * time_days
    }

    /// 终时刻的压升 (常 β, 变 β)
    pub fn final_rise(&self) -> (f64, f64) {
        let tf = self.times.last().copied().unwrap_or(0.0);
        let dp_var = self.pressure_variable.last().map_or(0.0, |p| p - self.p0);
        (self.rate_constant * tf, dp_var)
    }
}

/// 达到目标压升速率所需的总注入速率 (kg/s)
pub fn rate_for_target(target_mpa_per_day: f64, pore_volume: f64, p0: f64, t0: f64) -> f64 {
    let rho = eos::water_density(p0, t0);
    let beta = eos::water_compressibility(p0, t0);
    target_mpa_per_day / SECONDS_PER_DAY * pore_volume * rho * beta
}

/// 质量注入的常 β 与变 β 参考解
pub fn mass_injection(
    mass_rate: f64,
    pore_volume: f64,
    p0: f64,
    t0: f64,
    tf_days: f64,
    n_out: usize,
) -> Result<MassInjection> {
    let rho0 = eos::water_density(p0, t0);
    let beta0 = eos::water_compressibility(p0, t0);
    let rate_constant = mass_rate / (pore_volume * rho0 * beta0) * SECONDS_PER_DAY;

    let times = crate::models::grid::linspace(0.0, tf_days, n_out.max(2));
    let t_eval: Vec<f64> = times.iter().map(|t| t * SECONDS_PER_DAY).collect();

    let rhs = |_t: f64, p: f64| {
        mass_rate / (pore_volume * eos::water_density(p, t0) * eos::water_compressibility(p, t0))
    };
    let pressure_variable = ode::rk45(
        rhs,
        0.0,
        tf_days * SECONDS_PER_DAY,
        p0,
        &t_eval,
        ode::DEFAULT_RTOL,
        ode::DEFAULT_ATOL,
    )?;

    Ok(MassInjection {
        mass_rate,
        rate_constant,
        times,
        pressure_variable,
        p0,
    })
}

/// 块体热容组成
#[derive(Debug, Clone, Copy)]
pub struct HeatCapacity {
    /// 岩石部分 (J/K)
    pub rock: f64,
    /// 水部分 (J/K)
    pub water: f64,
}

impl HeatCapacity {
    pub fn total(&self) -> f64 {
        self.rock + self.water
    }

    /// 加热功率 Q (MW) 下的升温速率 (°C/day)
    pub fn rise_per_day(&self, q_mw: f64) -> f64 {
        q_mw * 1.0e6 / self.total() * SECONDS_PER_DAY
    }
}

/// 块体热容；岩石比热单位 J/kg/K
pub fn heat_capacity(
    volume: f64,
    porosity: f64,
    rock_density: f64,
    rock_specific_heat: f64,
    p0: f64,
    t0: f64,
) -> HeatCapacity {
    let rho_w = eos::water_density(p0, t0);
    let c_w = eos::water_heat_capacity(p0, t0) * 1.0e6;
    HeatCapacity {
        rock: volume * (1.0 - porosity) * rock_density * rock_specific_heat,
        water: volume * porosity * rho_w * c_w,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_for_target_roundtrip() {
        let rate = rate_for_target(1.0, 0.1, 1.0, 25.0);
        let sol = mass_injection(rate, 0.1, 1.0, 25.0, 1.0, 11).unwrap();
        assert!((sol.rate_constant - 1.0).abs() < 1e-12);
        assert!((sol.pressure_constant(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_variable_beta_rises_faster() {
        // β 随压力下降，同样的注入速率压升更快
        let rate = rate_for_target(5.0, 0.1, 1.0, 25.0);
        let sol = mass_injection(rate, 0.1, 1.0, 25.0, 1.0, 50).unwrap();
        let (dp_const, dp_var) = sol.final_rise();
        assert!((dp_const - 5.0).abs() < 1e-9);
        assert!(dp_var > dp_const);
        assert!(dp_var < 1.2 * dp_const);
        assert_eq!(sol.pressure_variable[0], 1.0);
        assert_eq!(sol.times.len(), 50);
    }

    #[test]
    fn test_heat_capacity_block() {
        let c = heat_capacity(1.0, 0.1, 2500.0, 1000.0, 1.0, 25.0);
        assert!((c.rock - 2.25e6).abs() < 1e-6);
        assert!((c.water - 4.17e5).abs() < 2.0e3);
        let dt = c.rise_per_day(3.0e-5);
        assert!(dt > 0.9 && dt < 1.0, "dt = {}", dt);
    }
}
