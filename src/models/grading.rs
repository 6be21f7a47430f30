//! 评分结果相关的数据结构
//!
//! 序列化格式与前端/数据库约定一致（camelCase，评分项列表字段名为 `results`）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个评分项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub question: String,
    pub mistakes: Vec<String>,
    pub score: f64,
    pub feedback: String,
}

/// 规范化后的评分结果
///
/// 所有字段总是存在；评分失败时返回的是降级结果而不是空值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    #[serde(rename = "results")]
    pub criteria: Vec<CriterionResult>,
    pub total_score: f64,
    pub overall_feedback: String,
}

impl GradingResult {
    /// 评分响应无法解析时的兜底结果：给一半分，反馈为原始响应
    pub fn unparsable(raw_response: &str, points_available: f64) -> Self {
        let score = points_available * 0.5;
        Self {
            criteria: vec![CriterionResult {
                question: "Submission evaluation".to_string(),
                mistakes: vec!["Could not parse grading response".to_string()],
                score,
                feedback: raw_response.to_string(),
            }],
            total_score: score,
            overall_feedback: raw_response.to_string(),
        }
    }

    /// 评分调用失败时的结果：0 分，反馈包含错误信息
    pub fn call_failed(detail: &str) -> Self {
        Self {
            criteria: vec![CriterionResult {
                question: "Error in grading".to_string(),
                mistakes: vec!["Could not process submission".to_string()],
                score: 0.0,
                feedback: format!("Error during grading: {}", detail),
            }],
            total_score: 0.0,
            overall_feedback: format!("An error occurred during grading: {}", detail),
        }
    }

    /// 流程在评分之前失败时的结果
    pub fn not_graded(stage: &str, detail: &str) -> Self {
        Self {
            criteria: vec![CriterionResult {
                question: "Error in processing".to_string(),
                mistakes: vec![format!("Submission file failed during {}", stage)],
                score: 0.0,
                feedback: format!("Error during {}: {}", stage, detail),
            }],
            total_score: 0.0,
            overall_feedback: format!("The file could not be graded: {}", detail),
        }
    }
}

/// 评分结果来自哪条路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingOutcomeKind {
    /// 正常解析
    Parsed,
    /// 响应格式错误，使用 50% 兜底
    MalformedResponse,
    /// 评分调用失败，0 分
    CallFailed,
}

/// GradingClient 的返回值：结果 + 来源标记
#[derive(Debug, Clone, PartialEq)]
pub struct GradingReport {
    pub result: GradingResult,
    pub kind: GradingOutcomeKind,
    /// 调用失败时的错误信息
    pub error: Option<String>,
}

/// 单个文件的评分记录（对外可见）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileGradingOutcome {
    pub file_name: String,
    #[serde(flatten)]
    pub grading: GradingResult,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl FileGradingOutcome {
    pub fn graded(file_name: impl Into<String>, grading: GradingResult) -> Self {
        Self {
            file_name: file_name.into(),
            grading,
            error: None,
        }
    }

    pub fn failed(
        file_name: impl Into<String>,
        grading: GradingResult,
        error: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            grading,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// 提交状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// 批次开始时写入
    Grading,
    Completed,
    Partial,
    Failed,
}

impl SubmissionStatus {
    /// 根据所有文件的结果推导批次状态
    pub fn derive(outcomes: &[FileGradingOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded == 0 {
            SubmissionStatus::Failed
        } else if succeeded == outcomes.len() {
            SubmissionStatus::Completed
        } else {
            SubmissionStatus::Partial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Grading => "grading",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Partial => "partial",
            SubmissionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 整个批次的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub results: Vec<FileGradingOutcome>,
    pub status: SubmissionStatus,
}

impl SubmissionOutcome {
    pub fn from_results(results: Vec<FileGradingOutcome>) -> Self {
        let status = SubmissionStatus::derive(&results);
        Self { results, status }
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}
