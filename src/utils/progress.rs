//! # 进度条工具
//!
//! 封装 `indicatif` 提供统一的进度条样式。
//! 标准输出不是终端时（重定向到文件或管道）返回隐藏的进度条。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `utils/fehm.rs` 使用
//! - 使用 `indicatif`, `console` crate

use indicatif::{ProgressBar, ProgressStyle};

/// 标准输出是否为终端
fn interactive() -> bool {
    console::Term::stdout().is_term()
}

/// 创建标准进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    if !interactive() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// 创建 spinner（模拟器运行期间使用）
pub fn create_spinner(message: &str) -> ProgressBar {
    if !interactive() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {msg}") {
        pb.set_style(style.tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
