//! 文件处理流程 - 流程层
//!
//! 核心职责：定义"一个文件"的完整处理流程
//!
//! 流程顺序：
//! 1. 暂存 → 提取 → 评分（受单文件时限约束）
//! 2. 保存（在时限之外执行，失败或超时只记日志）
//! 3. 无论哪一步失败，暂存文件都会在流程结束前释放
//!
//! 任何一步失败都转换成带 `error` 的降级结果，不向上抛出。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::infrastructure::{ScratchStore, StagedFile};
use crate::models::{BatchParams, FileGradingOutcome, FileInput, GradingOutcomeKind, GradingResult};
use crate::services::{ContentExtractor, GradingClient, ResultStore};
use crate::utils::logging::truncate_text;
use crate::workflow::file_ctx::FileCtx;

/// 流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Staged,
    Extracted,
    Graded,
    Stored,
    Done,
    Failed(FailedAt),
}

/// 流程在哪一步失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAt {
    Staging,
    Extraction,
    Grading,
    /// 超过单文件时限
    Deadline,
    /// 处理任务异常终止
    Aborted,
}

impl FailedAt {
    fn label(self) -> &'static str {
        match self {
            FailedAt::Staging => "staging",
            FailedAt::Extraction => "extraction",
            FailedAt::Grading => "grading",
            FailedAt::Deadline => "grading (time limit exceeded)",
            FailedAt::Aborted => "processing",
        }
    }
}

/// 文件处理流程
///
/// - 编排单个文件的完整处理流程
/// - 独占自己暂存的文件，不接触其他文件的暂存和结果
/// - 只依赖业务能力（services）和暂存能力（infrastructure）
pub struct FileFlow {
    scratch: Arc<dyn ScratchStore>,
    extractor: ContentExtractor,
    grader: GradingClient,
    store: ResultStore,
    timeout: Option<Duration>,
}

impl FileFlow {
    /// 创建新的文件处理流程
    pub fn new(
        scratch: Arc<dyn ScratchStore>,
        extractor: ContentExtractor,
        grader: GradingClient,
        store: ResultStore,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            scratch,
            extractor,
            grader,
            store,
            timeout,
        }
    }

    /// 执行完整流程，总是返回一个结果
    pub async fn run(
        self: Arc<Self>,
        ctx: FileCtx,
        input: FileInput,
        params: Arc<BatchParams>,
    ) -> FileGradingOutcome {
        info!("{} 开始处理", ctx);

        let staged = match self.scratch.stage(&input).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!("{} ❌ 暂存失败: {}", ctx, e);
                return failed_outcome(&ctx, FailedAt::Staging, &e.to_string());
            }
        };
        log_state(&ctx, FlowState::Staged);

        // 提取和评分放在独立任务里：panic 或超时都不会跳过下面的 release
        let mut worker = {
            let flow = Arc::clone(&self);
            let ctx = ctx.clone();
            let staged = staged.clone();
            let params = Arc::clone(&params);
            tokio::spawn(async move {
                flow.grade_staged(&ctx, &staged, &params).await
            })
        };

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut worker).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    worker.abort();
                    let _ = (&mut worker).await;
                    None
                }
            },
            None => Some((&mut worker).await),
        };

        let outcome = match joined {
            Some(Ok(Ok(result))) => {
                self.persist(&ctx, &staged, &params, &result).await;
                log_state(&ctx, FlowState::Done);
                FileGradingOutcome::graded(&ctx.file_name, result)
            }
            Some(Ok(Err(failed))) => failed,
            Some(Err(join_error)) => {
                error!("{} ❌ 处理任务异常终止: {}", ctx, join_error);
                failed_outcome(&ctx, FailedAt::Aborted, &join_error.to_string())
            }
            None => {
                warn!("{} ⏱️ 超过时限，按失败处理", ctx);
                let detail = format!("超过单文件处理时限 {:?}", self.timeout.unwrap_or_default());
                failed_outcome(&ctx, FailedAt::Deadline, &detail)
            }
        };

        if let Err(e) = self.scratch.release(&staged).await {
            warn!("{} ⚠️ 释放暂存文件失败: {}", ctx, e);
        }

        outcome
    }

    /// 提取 → 评分；成功时返回待保存的评分结果，失败时返回降级结果
    async fn grade_staged(
        &self,
        ctx: &FileCtx,
        staged: &StagedFile,
        params: &BatchParams,
    ) -> Result<GradingResult, FileGradingOutcome> {
        let content = match self.extractor.extract(staged).await {
            Ok(content) => content,
            Err(e) => {
                warn!("{} ❌ 内容提取失败: {}", ctx, e);
                return Err(failed_outcome(ctx, FailedAt::Extraction, &e.to_string()));
            }
        };
        if content.source.is_fallback() {
            info!("{} 使用兜底提取结果 ({:?})", ctx, content.source);
        }
        debug!("{} 内容预览: {}", ctx, truncate_text(&content.text, 80));
        log_state(ctx, FlowState::Extracted);

        let report = self
            .grader
            .grade(
                &content.text,
                &params.grading_criteria,
                params.total_points_available,
            )
            .await;

        match report.kind {
            GradingOutcomeKind::CallFailed => {
                let detail = report.error.unwrap_or_else(|| "评分调用失败".to_string());
                log_state(ctx, FlowState::Failed(FailedAt::Grading));
                let failed = FileGradingOutcome::failed(&ctx.file_name, report.result, detail);
                return Err(failed);
            }
            GradingOutcomeKind::MalformedResponse => {
                warn!("{} ⚠️ 评分响应格式错误，已使用兜底分数", ctx);
            }
            GradingOutcomeKind::Parsed => {}
        }
        info!("{} ✓ 评分完成: {}", ctx, report.result.total_score);
        log_state(ctx, FlowState::Graded);

        Ok(report.result)
    }

    /// 保存评分结果；不受单文件时限约束，失败只记日志
    ///
    /// 在独立任务里执行，panic 不会影响调用方随后的 release。
    async fn persist(
        &self,
        ctx: &FileCtx,
        staged: &StagedFile,
        params: &BatchParams,
        result: &GradingResult,
    ) {
        let bytes = match staged.read().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("{} ⚠️ 读取暂存文件失败，跳过保存: {}", ctx, e);
                return;
            }
        };

        let store = self.store.clone();
        let submission_id = params.submission_id.clone();
        let file_name = ctx.file_name.clone();
        let result = result.clone();
        let task = tokio::spawn(async move {
            store
                .persist(&submission_id, &file_name, &bytes, &result)
                .await
        });

        match task.await {
            Ok(Ok(())) => log_state(ctx, FlowState::Stored),
            Ok(Err(e)) => error!("{} ⚠️ 评分结果保存失败: {}", ctx, e),
            Err(join_error) => error!("{} ⚠️ 保存任务异常终止: {}", ctx, join_error),
        }
    }
}

fn failed_outcome(ctx: &FileCtx, at: FailedAt, detail: &str) -> FileGradingOutcome {
    log_state(ctx, FlowState::Failed(at));
    FileGradingOutcome::failed(
        &ctx.file_name,
        GradingResult::not_graded(at.label(), detail),
        detail,
    )
}

fn log_state(ctx: &FileCtx, state: FlowState) {
    debug!("{} 状态 -> {:?}", ctx, state);
}
