//! # 批量执行器
//!
//! 并行执行相互独立的校验任务（不同网格分辨率、不同注入案例）。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，结果保持输入顺序
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/verify/` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{FehmError, Result};
use crate::utils::progress;

use rayon::prelude::*;

/// 单个任务处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如 dry-run 只写输入文件）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (任务名, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: &ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name.clone(), err.clone()));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器，`jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理任务列表
    ///
    /// `processor` 返回任务状态和可选的输出；输出按输入顺序返回。
    pub fn run<T, O, F>(&self, items: &[T], message: &str, processor: F) -> Result<(BatchResult, Vec<Option<O>>)>
    where
        T: Sync,
        O: Send,
        F: Fn(&T) -> (ProcessResult, Option<O>) + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, message);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| FehmError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<(ProcessResult, Option<O>)> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        // 汇总结果
        let mut batch_result = BatchResult::default();
        let mut outputs = Vec::with_capacity(results.len());
        for (status, output) in results {
            batch_result.merge(&status);
            outputs.push(output);
        }

        Ok((batch_result, outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_preserves_order_and_counts() {
        let runner = BatchRunner::new(3);
        let items: Vec<usize> = (1..=6).collect();
        let (summary, outputs) = runner
            .run(&items, "test", |n| match n % 3 {
                0 => (ProcessResult::Failed(n.to_string(), "boom".into()), None),
                1 => (ProcessResult::Skipped(n.to_string()), None),
                _ => (ProcessResult::Success(n.to_string()), Some(n * 10)),
            })
            .unwrap();
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failures[0].0, "3");
        assert_eq!(outputs, vec![None, Some(20), None, None, Some(50), None]);
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}
