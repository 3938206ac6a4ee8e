//! # 一维扩散解析解
//!
//! 线性初值、两端边界值互换的一维扩散问题（热传导 / 压力扩散形式相同）。
//!
//! ## 问题
//! ```text
//! dV/dt = D d²V/dx²,  0 < x < L
//! V(x,0) = V1 + (V2 - V1) x / L
//! V(0,t) = V2,  V(L,t) = V1
//! ```
//! 稳态为反向线性剖面，瞬态部分的 Fourier 正弦级数只含偶数阶：
//! `B_n = 4 (V1 - V2) / (n π)`，`n = 2, 4, 6, ...`
//!
//! ## 依赖关系
//! - 被 `commands/verify/diffusion.rs` 使用
//! - 无外部 crate 依赖

use std::f64::consts::PI;

/// 默认 Fourier 项数上限
pub const DEFAULT_TERMS: usize = 200;

/// 内部点判定（相对于 L）
const INTERIOR_LO: f64 = 0.01;
const INTERIOR_HI: f64 = 0.99;

/// 边界互换问题的参数
#[derive(Debug, Clone, Copy)]
pub struct SwappedSlab {
    pub length: f64,
    pub v1: f64,
    pub v2: f64,
    pub diffusivity: f64,
}

impl SwappedSlab {
    /// 特征时间 L²/D (s)
    pub fn characteristic_time(&self) -> f64 {
        self.length * self.length / self.diffusivity
    }

    /// 初始剖面
    pub fn initial(&self, x: f64) -> f64 {
        self.v1 + (self.v2 - self.v1) * x / self.length
    }

    /// 稳态剖面
    pub fn steady_state(&self, x: f64) -> f64 {
        self.v2 + (self.v1 - self.v2) * x / self.length
    }

    /// 解析解 V(x, t)，t 单位为秒
    pub fn value(&self, x: f64, t: f64, n_terms: usize) -> f64 {
        swapped_linear(x, t, self.length, self.v1, self.v2, self.diffusivity, n_terms)
    }
}

/// 边界互换线性剖面的解析解（t 单位为秒）
pub fn swapped_linear(x: f64, t: f64, length: f64, v1: f64, v2: f64, diffusivity: f64, n_terms: usize) -> f64 {
    let l = length;
    let transient: f64 = (2..=n_terms)
        .step_by(2)
        .map(|n| {
            let n = n as f64;
            let b_n = 4.0 * (v1 - v2) / (n * PI);
            let decay = (-n * n * PI * PI * diffusivity * t / (l * l)).exp();
            b_n * (n * PI * x / l).sin() * decay
        })
        .sum();
    v2 + (v1 - v2) * x / l + transient
}

/// 单时刻误差 (最大绝对误差, RMS)，只统计内部点
pub fn errors(x: &[f64], numerical: &[f64], analytical: &[f64], length: f64) -> Option<(f64, f64)> {
    let diffs: Vec<f64> = x
        .iter()
        .zip(numerical.iter().zip(analytical))
        .filter(|(xi, _)| **xi > INTERIOR_LO * length && **xi < INTERIOR_HI * length)
        .map(|(_, (n, a))| (n - a).abs())
        .collect();

    if diffs.is_empty() {
        return None;
    }
    let max_abs = diffs.iter().cloned().fold(0.0, f64::max);
    let rms = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
    Some((max_abs, rms))
}

/// 多个时刻误差的汇总：各自取最大值
pub fn aggregate(per_time: &[(f64, f64)]) -> (f64, f64) {
    per_time
        .iter()
        .fold((0.0, 0.0), |(m, r), (em, er)| (f64::max(m, *em), f64::max(r, *er)))
}

/// 网格收敛比：前一分辨率误差 / 当前误差
pub fn convergence_ratios(max_errors: &[f64]) -> Vec<Option<f64>> {
    max_errors
        .iter()
        .enumerate()
        .map(|(i, &e)| {
            if i == 0 {
                None
            } else if e > 0.0 {
                Some(max_errors[i - 1] / e)
            } else {
                Some(f64::INFINITY)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab() -> SwappedSlab {
        SwappedSlab {
            length: 1.0,
            v1: 10.0,
            v2: 20.0,
            diffusivity: 1.0e-6,
        }
    }

    #[test]
    fn test_boundaries_fixed_for_positive_time() {
        let s = slab();
        let t = 0.01 * s.characteristic_time();
        assert!((s.value(0.0, t, DEFAULT_TERMS) - 20.0).abs() < 1e-9);
        assert!((s.value(1.0, t, DEFAULT_TERMS) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_initial_profile_recovered() {
        let s = slab();
        for &x in &[0.2, 0.35, 0.5, 0.8] {
            let v = s.value(x, 0.0, 2000);
            assert!((v - s.initial(x)).abs() < 0.02, "x={} v={}", x, v);
        }
    }

    #[test]
    fn test_midpoint_is_fixed() {
        // 只有偶数阶时 sin(nπ/2) = 0，中点始终等于稳态值
        let s = slab();
        let t = 0.05 * s.characteristic_time();
        assert!((s.value(0.5, t, DEFAULT_TERMS) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_late_time_reaches_steady_state() {
        let s = slab();
        let t = 2.0 * s.characteristic_time();
        let v = s.value(0.25, t, DEFAULT_TERMS);
        assert!((v - s.steady_state(0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_errors_exclude_boundaries() {
        let x = [0.0, 0.5, 1.0];
        let (max_abs, rms) = errors(&x, &[100.0, 1.5, -100.0], &[0.0, 1.0, 0.0], 1.0).unwrap();
        assert_eq!(max_abs, 0.5);
        assert_eq!(rms, 0.5);
        assert!(errors(&[0.0, 1.0], &[1.0, 1.0], &[0.0, 0.0], 1.0).is_none());
    }

    #[test]
    fn test_free_function_matches_struct() {
        let s = slab();
        let t = 1.0e4;
        let a = swapped_linear(0.3, t, 1.0, 10.0, 20.0, 1.0e-6, DEFAULT_TERMS);
        assert_eq!(a, s.value(0.3, t, DEFAULT_TERMS));
        assert_eq!(aggregate(&[(0.1, 0.05), (0.3, 0.01)]), (0.3, 0.05));
    }

    #[test]
    fn test_convergence_ratios() {
        let r = convergence_ratios(&[0.4, 0.1, 0.0]);
        assert_eq!(r[0], None);
        assert_eq!(r[1], Some(4.0));
        assert_eq!(r[2], Some(f64::INFINITY));
    }
}
