//! # 美化输出工具
//!
//! 提供统一的终端输出样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印对齐的参数行
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<32} {}", format!("{}:", key).dimmed(), value);
}

/// 科学计数格式
pub fn sci(v: f64) -> String {
    format!("{:.4e}", v)
}

/// 带单位的定点格式
pub fn fixed(v: f64, digits: usize, unit: &str) -> String {
    if unit.is_empty() {
        format!("{:.*}", digits, v)
    } else {
        format!("{:.*} {}", digits, v, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formats() {
        assert_eq!(sci(1234.5), "1.2345e3");
        assert_eq!(fixed(0.123456, 3, "MPa"), "0.123 MPa");
        assert_eq!(fixed(2.0, 1, ""), "2.0");
    }
}
