//! # 参考解模块
//!
//! 解析解与 ODE 参考解，用于与模拟输出比较。
//!
//! ## 依赖关系
//! - 被 `commands/verify/` 使用
//! - 子模块: diffusion, eos, ode, balance, radial

pub mod balance;
pub mod diffusion;
pub mod eos;
pub mod ode;
pub mod radial;
