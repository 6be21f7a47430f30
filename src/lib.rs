//! # Submission Grader
//!
//! 多文件作业提交的并发评分服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有暂存目录，只暴露暂存/释放能力
//! - `TempResourceManager` - 每个文件独占一个暂存路径，同名文件自动加后缀
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件
//! - `ContentExtractor` - OCR / 文本层兜底 / 内容理解
//! - `GradingClient` - 调用评分模型并规范化结果
//! - `ResultStore` - 保存评分记录、更新提交状态
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的完整处理流程
//! - `FileCtx` - 上下文封装（submission_id + file_index）
//! - `FileFlow` - 流程编排（stage → extract → grade → store → release）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/submission_coordinator` - 批次协调器，管理并发和汇总
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::TempResourceManager;
pub use models::{
    FileGradingOutcome, FileInput, GradingResult, SubmissionBatch, SubmissionOutcome,
    SubmissionStatus,
};
pub use orchestrator::{Capabilities, CoordinatorSettings, SubmissionCoordinator};
pub use workflow::{FileCtx, FileFlow};
