//! # 流体物性关联式
//!
//! 为解析参考解提供水与 CO2 的物性，模拟器自身的物性表不在此实现。
//!
//! ## 关联式
//! - 水密度：Kell (1975) 常压密度 + Murnaghan 压力修正
//! - 水压缩系数：Kell 等温压缩系数，β = (1/ρ) dρ/dP
//! - 水粘度：Vogel 方程
//! - 水比热 dh/dT：常压多项式拟合
//! - CO2 密度：Peng-Robinson 状态方程，按逸度最小选根
//!
//! ## 单位
//! 压力 MPa，温度 °C，密度 kg/m³，粘度 Pa·s，比热 MJ/kg/K（FEHM 焓单位）
//!
//! ## 依赖关系
//! - 被 `reference/balance.rs`, `commands/verify/` 使用
//! - 无外部 crate 依赖

/// 参考压力（常压），MPa
const P_REF: f64 = 0.101325;

/// Murnaghan 体积模量压力导数
const MURNAGHAN_K_PRIME: f64 = 6.0;

const KELVIN: f64 = 273.15;

/// 通用气体常数 J/mol/K
const R_GAS: f64 = 8.314462618;

// ─────────────────────────────────────────────────────────────
// 水
// ─────────────────────────────────────────────────────────────

/// 常压下的水密度 (kg/m³)
fn water_density_ref(t: f64) -> f64 {
    (999.83952 + 16.945176 * t - 7.9870401e-3 * t.powi(2) - 46.170461e-6 * t.powi(3)
        + 105.56302e-9 * t.powi(4)
        - 280.54253e-12 * t.powi(5))
        / (1.0 + 16.879850e-3 * t)
}

/// 常压下的等温压缩系数 (1/MPa)
fn water_compressibility_ref(t: f64) -> f64 {
    let per_bar = (50.88496 + 0.6163813 * t + 1.459187e-3 * t.powi(2) + 20.08438e-6 * t.powi(3)
        - 58.47727e-9 * t.powi(4)
        + 410.4110e-12 * t.powi(5))
        / (1.0 + 19.67348e-3 * t);
    // 1e-6/bar -> 1/MPa
    per_bar * 1.0e-5
}

/// 压力 P 下的体积模量 (MPa)
fn bulk_modulus(p: f64, t: f64) -> f64 {
    1.0 / water_compressibility_ref(t) + MURNAGHAN_K_PRIME * (p - P_REF)
}

/// 液态水密度 (kg/m³)
pub fn water_density(p: f64, t: f64) -> f64 {
    let k0 = 1.0 / water_compressibility_ref(t);
    let k = bulk_modulus(p, t);
    water_density_ref(t) * (k / k0).powf(1.0 / MURNAGHAN_K_PRIME)
}

/// dρ/dP (kg/m³/MPa)
pub fn water_density_dp(p: f64, t: f64) -> f64 {
    water_density(p, t) / bulk_modulus(p, t)
}

/// 等温压缩系数 β = (1/ρ) dρ/dP (1/MPa)
pub fn water_compressibility(p: f64, t: f64) -> f64 {
    water_density_dp(p, t) / water_density(p, t)
}

/// 液态水动力粘度 (Pa·s)，压力影响忽略
pub fn water_viscosity(_p: f64, t: f64) -> f64 {
    let tk = t + KELVIN;
    1.0e-3 * (-3.7188 + 578.919 / (tk - 137.546)).exp()
}

/// 比热 dh/dT (MJ/kg/K)
pub fn water_heat_capacity(_p: f64, t: f64) -> f64 {
    let kj = 4.2174 - 3.720283e-3 * t + 1.412855e-4 * t.powi(2) - 2.654387e-6 * t.powi(3)
        + 2.093236e-8 * t.powi(4);
    kj * 1.0e-3
}

// ─────────────────────────────────────────────────────────────
// CO2 (Peng-Robinson)
// ─────────────────────────────────────────────────────────────

const CO2_TC: f64 = 304.1282;
const CO2_PC: f64 = 7.3773e6;
const CO2_OMEGA: f64 = 0.22394;
const CO2_MOLAR_MASS: f64 = 0.0440095;

/// CO2 密度 (kg/m³)
pub fn co2_density(p: f64, t: f64) -> f64 {
    let tk = t + KELVIN;
    let pa = p * 1.0e6;

    let kappa = 0.37464 + 1.54226 * CO2_OMEGA - 0.26992 * CO2_OMEGA * CO2_OMEGA;
    let alpha = (1.0 + kappa * (1.0 - (tk / CO2_TC).sqrt())).powi(2);
    let a = 0.45724 * R_GAS * R_GAS * CO2_TC * CO2_TC / CO2_PC * alpha;
    let b = 0.07780 * R_GAS * CO2_TC / CO2_PC;

    let big_a = a * pa / (R_GAS * tk).powi(2);
    let big_b = b * pa / (R_GAS * tk);

    let roots = cubic_real_roots(
        -(1.0 - big_b),
        big_a - 3.0 * big_b * big_b - 2.0 * big_b,
        -(big_a * big_b - big_b * big_b - big_b.powi(3)),
    );

    let z = roots
        .into_iter()
        .filter(|z| *z > big_b)
        .map(|z| (z, ln_fugacity_coeff(z, big_a, big_b)))
        .min_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(z, _)| z)
        .unwrap_or(1.0);

    pa * CO2_MOLAR_MASS / (z * R_GAS * tk)
}

/// ln φ，用于在气/液根之间选择稳定相
fn ln_fugacity_coeff(z: f64, a: f64, b: f64) -> f64 {
    let sqrt2 = std::f64::consts::SQRT_2;
    z - 1.0
        - (z - b).ln()
        - a / (2.0 * sqrt2 * b) * ((z + (1.0 + sqrt2) * b) / (z + (1.0 - sqrt2) * b)).ln()
}

/// z³ + c2 z² + c1 z + c0 = 0 的实根
fn cubic_real_roots(c2: f64, c1: f64, c0: f64) -> Vec<f64> {
    let q = (3.0 * c1 - c2 * c2) / 9.0;
    let r = (9.0 * c2 * c1 - 27.0 * c0 - 2.0 * c2.powi(3)) / 54.0;
    let disc = q.powi(3) + r * r;
    let shift = c2 / 3.0;

    if disc > 0.0 {
        let s = (r + disc.sqrt()).cbrt();
        let t = (r - disc.sqrt()).cbrt();
        vec![s + t - shift]
    } else if q == 0.0 {
        vec![-shift]
    } else {
        let theta = (r / (-q.powi(3)).sqrt()).clamp(-1.0, 1.0).acos();
        let m = 2.0 * (-q).sqrt();
        (0..3)
            .map(|k| {
                m * ((theta + 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos() - shift
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_density_reference_points() {
        assert!((water_density(P_REF, 4.0) - 999.97).abs() < 0.05);
        assert!((water_density(P_REF, 25.0) - 997.05).abs() < 0.05);
        // 压力升高密度增大
        assert!(water_density(20.0, 25.0) > water_density(1.0, 25.0));
    }

    #[test]
    fn test_water_compressibility() {
        let beta = water_compressibility(1.0, 25.0);
        assert!((beta - 4.52e-4).abs() < 0.05e-4, "beta = {}", beta);
        // 压缩系数随压力降低
        assert!(water_compressibility(50.0, 25.0) < beta);
    }

    #[test]
    fn test_density_derivative_consistent() {
        let (p, t) = (10.0, 40.0);
        let h = 1e-3;
        let fd = (water_density(p + h, t) - water_density(p - h, t)) / (2.0 * h);
        assert!((fd - water_density_dp(p, t)).abs() / fd < 1e-6);
    }

    #[test]
    fn test_water_viscosity_and_heat_capacity() {
        assert!((water_viscosity(0.1, 20.0) - 1.002e-3).abs() < 0.01e-3);
        assert!((water_heat_capacity(1.0, 25.0) - 4.18e-3).abs() < 0.01e-3);
    }

    #[test]
    fn test_co2_density() {
        let gas = co2_density(0.101325, 25.0);
        assert!((gas - 1.8).abs() < 0.05, "gas = {}", gas);
        let dense = co2_density(20.0, 60.0);
        assert!(dense > 650.0 && dense < 800.0, "dense = {}", dense);
        let liquid = co2_density(10.0, 20.0);
        assert!(liquid > 800.0 && liquid < 950.0, "liquid = {}", liquid);
    }

    #[test]
    fn test_cubic_roots() {
        // (z-1)(z-2)(z-3)
        let mut r = cubic_real_roots(-6.0, 11.0, -6.0);
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(r.len(), 3);
        for (got, want) in r.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-9);
        }
        assert_eq!(cubic_real_roots(0.0, 0.0, -8.0).len(), 1);
    }
}
