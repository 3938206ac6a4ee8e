//! # 标量 ODE 积分
//!
//! 自适应步长 Dormand-Prince RK(4)5，输出时刻精确命中。
//!
//! ## 依赖关系
//! - 被 `reference/balance.rs` 使用

use crate::error::{FehmError, Result};

/// 默认相对容差
pub const DEFAULT_RTOL: f64 = 1.0e-6;
/// 默认绝对容差
pub const DEFAULT_ATOL: f64 = 1.0e-9;

const MAX_STEPS: usize = 100_000;
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

// Dormand-Prince 系数
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; 6]; 7] = [
    [0.0; 6],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
/// 5 阶解权重
const B5: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
/// 4 阶嵌入解权重
const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// 求解 dy/dt = f(t, y)，返回 t_eval 各时刻的 y
///
/// `t_eval` 须在 `[t0, t1]` 内且单调递增。
pub fn rk45<F>(f: F, t0: f64, t1: f64, y0: f64, t_eval: &[f64], rtol: f64, atol: f64) -> Result<Vec<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    if t1 < t0 {
        return Err(FehmError::InvalidArgument(format!(
            "integration interval is reversed: {} > {}",
            t0, t1
        )));
    }
    if t_eval.windows(2).any(|w| w[1] < w[0]) || t_eval.iter().any(|t| *t < t0 || *t > t1) {
        return Err(FehmError::InvalidArgument(
            "output times must be sorted and inside the integration interval".to_string(),
        ));
    }

    let mut t = t0;
    let mut y = y0;
    let mut h = initial_step(&f, t0, y0, t1 - t0, rtol, atol);
    let mut out = Vec::with_capacity(t_eval.len());
    let mut steps = 0;

    for &target in t_eval {
        while target - t > f64::EPSILON * target.abs().max(1.0) {
            steps += 1;
            if steps > MAX_STEPS {
                return Err(FehmError::Other(format!(
                    "rk45 exceeded {} steps before t = {}",
                    MAX_STEPS, target
                )));
            }

            let step = h.min(target - t);
            let (y_new, err) = dp_step(&f, t, y, step);
            if !y_new.is_finite() {
                return Err(FehmError::Other(format!("rk45 diverged at t = {}", t)));
            }

            let scale = atol + rtol * y.abs().max(y_new.abs());
            let ratio = err / scale;

            if ratio <= 1.0 {
                t += step;
                y = y_new;
            }

            let factor = if ratio == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * ratio.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            // 被输出时刻截短的步不缩小后续步长
            if ratio <= 1.0 && step < h {
                h = h.max(step * factor);
            } else {
                h = step * factor;
            }
        }
        t = target;
        out.push(y);
    }

    Ok(out)
}

/// 单步 Dormand-Prince，返回 (5 阶解, 误差估计)
fn dp_step<F>(f: &F, t: f64, y: f64, h: f64) -> (f64, f64)
where
    F: Fn(f64, f64) -> f64,
{
    let mut k = [0.0; 7];
    for stage in 0..7 {
        let incr: f64 = (0..stage).map(|j| A[stage][j] * k[j]).sum();
        k[stage] = f(t + C[stage] * h, y + h * incr);
    }
    let y5 = y + h * B5.iter().zip(&k).map(|(b, k)| b * k).sum::<f64>();
    let y4 = y + h * B4.iter().zip(&k).map(|(b, k)| b * k).sum::<f64>();
    (y5, (y5 - y4).abs())
}

/// 初始步长估计
fn initial_step<F>(f: &F, t0: f64, y0: f64, span: f64, rtol: f64, atol: f64) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    if span == 0.0 {
        return 0.0;
    }
    let scale = atol + rtol * y0.abs();
    let d0 = y0.abs() / scale;
    let d1 = f(t0, y0).abs() / scale;
    let h = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6 * span
    } else {
        0.01 * d0 / d1
    };
    h.min(span)
}
