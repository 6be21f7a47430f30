//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! submission_coordinator (处理 Vec<FileInput>)
//!     ↓
//! workflow::FileFlow (处理单个文件)
//!     ↓
//! services (能力层：ocr / understanding / grading / store)
//!     ↓
//! infrastructure (基础设施：TempResourceManager)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：协调器管批次，FileFlow 管单个文件
//! 2. **失败隔离**：文件之间没有共享的可变状态
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和汇总，不做具体评分判断

pub mod submission_coordinator;

pub use submission_coordinator::{Capabilities, CoordinatorSettings, SubmissionCoordinator};
