//! 提交批次协调器 - 编排层
//!
//! ## 职责
//!
//! 本模块是核心入口：接收一个提交批次，为每个文件启动一条独立流程，
//! 等待全部完成后汇总结果并推导提交状态。
//!
//! ## 核心功能
//!
//! 1. **前置校验**：过滤空文件名，没有可处理文件时直接拒绝
//! 2. **并发控制**：使用 Semaphore 限制同时运行的流程数量
//! 3. **失败隔离**：单个文件失败只影响自己的结果
//! 4. **汇总**：等待全部流程结束（不是谁先完成就返回）
//! 5. **状态更新**：开始时写 `grading`，结束时写最终状态；失败只记日志
//!
//! ## 设计特点
//!
//! - **能力注入**：OCR / 评分 / 存储都由调用方构造后传入，测试时可替换
//! - **向下委托**：单个文件的细节交给 `workflow::FileFlow`

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, SubmissionError};
use crate::infrastructure::{ScratchStore, TempResourceManager};
use crate::models::{
    BatchParams, FileGradingOutcome, FileInput, GradingResult, SubmissionBatch, SubmissionOutcome,
    SubmissionStatus,
};
use crate::services::{
    ContentExtractor, DeepSeekGrader, GradingClient, MistralOcr, MistralUnderstanding, PdfTextLayer,
    ResultStore, SupabaseStore,
};
use crate::utils::logging::{log_batch_complete, log_batch_start};
use crate::workflow::{FileCtx, FileFlow};

/// 协调器依赖的全部外部能力
#[derive(Clone)]
pub struct Capabilities {
    pub scratch: Arc<dyn ScratchStore>,
    pub extractor: ContentExtractor,
    pub grader: GradingClient,
    pub store: ResultStore,
}

impl Capabilities {
    /// 按配置构造真实的能力实现
    pub fn from_config(config: &Config) -> Self {
        let extractor = ContentExtractor::new(
            Arc::new(MistralOcr::new(config)),
            Arc::new(PdfTextLayer),
            Arc::new(MistralUnderstanding::new(config)),
        )
        .with_document_enrichment(config.enrich_document_text);

        Self {
            scratch: Arc::new(TempResourceManager::new(&config.temp_dir)),
            extractor,
            grader: GradingClient::new(Arc::new(DeepSeekGrader::new(config))),
            store: ResultStore::new(Arc::new(SupabaseStore::new(config))),
        }
    }
}

/// 协调器设置
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// 同时运行的文件流程上限
    pub max_concurrent_files: usize,
    /// 单个文件流程的时限
    pub file_timeout: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_concurrent_files: 16,
            file_timeout: None,
        }
    }
}

impl From<&Config> for CoordinatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent_files: config.max_concurrent_files,
            file_timeout: config.file_timeout(),
        }
    }
}

/// 提交批次协调器
pub struct SubmissionCoordinator {
    flow: Arc<FileFlow>,
    store: ResultStore,
    max_concurrent_files: usize,
}

impl SubmissionCoordinator {
    pub fn new(capabilities: Capabilities, settings: CoordinatorSettings) -> Self {
        let store = capabilities.store.clone();
        let flow = FileFlow::new(
            capabilities.scratch,
            capabilities.extractor,
            capabilities.grader,
            capabilities.store,
            settings.file_timeout,
        );
        Self {
            flow: Arc::new(flow),
            store,
            max_concurrent_files: settings.max_concurrent_files.max(1),
        }
    }

    /// 按配置构造
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Capabilities::from_config(config),
            CoordinatorSettings::from(config),
        )
    }

    /// 处理一组文件（路由层使用的入口）
    pub async fn process_files(
        &self,
        files: Vec<FileInput>,
        grading_criteria: &str,
        submission_id: &str,
        total_points_available: f64,
    ) -> AppResult<SubmissionOutcome> {
        let batch = SubmissionBatch::new(
            submission_id,
            grading_criteria,
            total_points_available,
            files,
        )?;
        self.process_submission(batch).await
    }

    /// 处理一个提交批次
    ///
    /// 所有文件流程都结束后才返回；单个文件的失败体现在结果里，
    /// 只有批次级的前置条件不满足时才返回错误。
    pub async fn process_submission(&self, batch: SubmissionBatch) -> AppResult<SubmissionOutcome> {
        let (params, files) = batch.into_files();
        let total_inputs = files.len();

        let files: Vec<FileInput> = files.into_iter().filter(FileInput::has_name).collect();
        if files.is_empty() {
            warn!("提交 {} 没有可处理的文件", params.submission_id);
            return Err(SubmissionError::NoValidFiles.into());
        }

        let skipped = total_inputs - files.len();
        log_batch_start(&params.submission_id, files.len(), skipped);

        self.update_status(&params.submission_id, SubmissionStatus::Grading)
            .await;

        let results = self.run_pipelines(Arc::new(params.clone()), files).await;
        let outcome = SubmissionOutcome::from_results(results);

        self.update_status(&params.submission_id, outcome.status)
            .await;

        log_batch_complete(
            &params.submission_id,
            outcome.success_count(),
            outcome.results.len(),
            outcome.status.as_str(),
        );

        Ok(outcome)
    }

    /// 为每个文件启动一条流程，等待全部结束，结果顺序与输入一致
    async fn run_pipelines(
        &self,
        params: Arc<BatchParams>,
        files: Vec<FileInput>,
    ) -> Vec<FileGradingOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_files));
        let mut handles = Vec::with_capacity(files.len());

        for (idx, input) in files.into_iter().enumerate() {
            let ctx = FileCtx::new(
                params.submission_id.clone(),
                idx + 1,
                input.file_name.clone(),
            );
            let file_name = input.file_name.clone();
            let flow = Arc::clone(&self.flow);
            let params = Arc::clone(&params);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(async move {
                // 信号量不会被关闭，acquire 只会成功
                let _permit = semaphore.acquire_owned().await.ok();
                flow.run(ctx, input, params).await
            });
            handles.push((file_name, handle));
        }

        let (names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, file_name)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("[{}] 流程任务执行失败: {}", file_name, e);
                    let detail = e.to_string();
                    let result = GradingResult::not_graded("processing", &detail);
                    FileGradingOutcome::failed(file_name, result, detail)
                }
            })
            .collect()
    }

    /// 更新提交状态；失败只记录日志
    async fn update_status(&self, submission_id: &str, status: SubmissionStatus) {
        match self.store.update_status(submission_id, status).await {
            Ok(()) => info!("提交 {} 状态更新为 {}", submission_id, status),
            Err(e) => error!("提交 {} 状态更新为 {} 失败: {}", submission_id, status, e),
        }
    }
}
