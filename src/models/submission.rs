use crate::error::{AppResult, SubmissionError};
use crate::models::file_input::FileInput;

/// 一次提交批次
///
/// 由路由层构造一次，之后不可变，整个交给 SubmissionCoordinator 消费。
#[derive(Debug, Clone)]
pub struct SubmissionBatch {
    submission_id: String,
    grading_criteria: String,
    total_points_available: f64,
    files: Vec<FileInput>,
}

impl SubmissionBatch {
    /// 构造批次，校验评分标准与总分
    pub fn new(
        submission_id: impl Into<String>,
        grading_criteria: impl Into<String>,
        total_points_available: f64,
        files: Vec<FileInput>,
    ) -> AppResult<Self> {
        let grading_criteria = grading_criteria.into();
        if grading_criteria.trim().is_empty() {
            return Err(SubmissionError::MissingCriteria.into());
        }
        if !(total_points_available > 0.0) {
            return Err(SubmissionError::InvalidPoints {
                value: total_points_available,
            }
            .into());
        }
        Ok(Self {
            submission_id: submission_id.into(),
            grading_criteria,
            total_points_available,
            files,
        })
    }

    /// 拆出文件列表
    pub fn into_files(self) -> (BatchParams, Vec<FileInput>) {
        let params = BatchParams {
            submission_id: self.submission_id,
            grading_criteria: self.grading_criteria,
            total_points_available: self.total_points_available,
        };
        (params, self.files)
    }
}

/// 所有文件共享的评分参数
#[derive(Debug, Clone)]
pub struct BatchParams {
    pub submission_id: String,
    pub grading_criteria: String,
    pub total_points_available: f64,
}

/// 解析请求里的总分
///
/// 缺失或无法解析时使用默认值；明确给出但不大于 0 时拒绝。
pub fn parse_total_points(raw: Option<&str>, default: f64) -> AppResult<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        Ok(value) if value.is_finite() => Err(SubmissionError::InvalidPoints { value }.into()),
        _ => Ok(default),
    }
}
