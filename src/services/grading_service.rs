//! 评分服务 - 业务能力层
//!
//! `GradingBackend` 只负责"把内容发给评分模型并拿回原始响应"，
//! `GradingClient` 负责解析、规范化以及各种兜底结果。

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{CriterionResult, GradingOutcomeKind, GradingReport, GradingResult};
use crate::services::llm_service::LlmService;
use crate::utils::logging::truncate_text;

/// `<response>...</response>` 之间的内容
static RESPONSE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<response>(.*?)</response>").expect("valid regex")
});

const GRADER_SYSTEM_PROMPT: &str = r#"You are an expert grader. When grading submissions, first analyze the content and criteria carefully, then provide your response in two sections:

<reasoning>
1. Break down each aspect/question from the grading criteria
2. Evaluate how well the submission meets each criterion
3. Justify point allocations based on the defined rubric
4. Consider partial credit where appropriate
</reasoning>

<response>
{
    "results": [
        {
            "question": "Question/Aspect being graded [point value]",
            "mistakes": ["List of specific mistakes or areas for improvement"],
            "score": number (based on rubric point allocation),
            "feedback": "Detailed, constructive feedback explaining point allocation"
        }
    ],
    "totalScore": number (sum of all scores),
    "overallFeedback": "Comprehensive overall feedback with suggestions for improvement"
}
</response>

Your JSON response must be within the <response> tags and follow the exact format shown above.
Be thorough in your grading and provide specific, actionable feedback for each aspect."#;

/// 评分能力：返回模型的原始响应文本
#[async_trait]
pub trait GradingBackend: Send + Sync {
    async fn grade_text(
        &self,
        content: &str,
        criteria: &str,
        points_available: f64,
    ) -> AppResult<String>;
}

/// 基于 DeepSeek 的评分实现
pub struct DeepSeekGrader {
    llm: LlmService,
}

impl DeepSeekGrader {
    pub fn new(config: &Config) -> Self {
        Self {
            llm: LlmService::new(
                &config.grading_api_key,
                &config.grading_api_base_url,
                &config.grading_model_name,
                config.grading_temperature,
                config.grading_max_tokens,
            ),
        }
    }
}

#[async_trait]
impl GradingBackend for DeepSeekGrader {
    async fn grade_text(
        &self,
        content: &str,
        criteria: &str,
        points_available: f64,
    ) -> AppResult<String> {
        let user_message = build_grading_message(content, criteria, points_available);
        self.llm
            .send_to_llm(&user_message, Some(GRADER_SYSTEM_PROMPT))
            .await
    }
}

/// 构建评分请求的用户消息
fn build_grading_message(content: &str, criteria: &str, points_available: f64) -> String {
    format!(
        r#"Please grade this submission according to the following rubric:

Grading Criteria:
{criteria}

Total Points Available: {points_available}

Submission Content:
{content}

Remember to:
1. Grade each aspect according to its defined point values
2. Provide specific feedback for point deductions
3. Consider partial credit based on the rubric
4. Ensure total score doesn't exceed {points_available} points"#
    )
}

/// 评分客户端
///
/// 无论走哪条路径，返回的 `GradingResult` 都是字段完整的。
#[derive(Clone)]
pub struct GradingClient {
    backend: Arc<dyn GradingBackend>,
}

impl GradingClient {
    pub fn new(backend: Arc<dyn GradingBackend>) -> Self {
        Self { backend }
    }

    /// 对一段内容评分
    pub async fn grade(
        &self,
        content: &str,
        criteria: &str,
        points_available: f64,
    ) -> GradingReport {
        let response = self
            .backend
            .grade_text(content, criteria, points_available)
            .await;
        match response {
            Ok(raw) => {
                debug!("评分响应: {}", truncate_text(&raw, 200));
                match parse_grading_response(&raw) {
                    Some(result) => GradingReport {
                        result,
                        kind: GradingOutcomeKind::Parsed,
                        error: None,
                    },
                    None => {
                        let preview = truncate_text(&raw, 200);
                        warn!("无法解析评分响应，给出 50% 兜底分: {}", preview);
                        GradingReport {
                            result: GradingResult::unparsable(&raw, points_available),
                            kind: GradingOutcomeKind::MalformedResponse,
                            error: None,
                        }
                    }
                }
            }
            Err(e) => {
                warn!("评分调用失败: {}", e);
                let detail = e.to_string();
                GradingReport {
                    result: GradingResult::call_failed(&detail),
                    kind: GradingOutcomeKind::CallFailed,
                    error: Some(detail),
                }
            }
        }
    }
}

/// 解析评分响应
///
/// 先找 `<response>` 标签；没有标签时取最外层的花括号区间。
/// 有标签但内容不是合法 JSON 对象时不再退回花括号查找。
pub fn parse_grading_response(raw: &str) -> Option<GradingResult> {
    let payload = match RESPONSE_BLOCK.captures(raw) {
        Some(caps) => caps.get(1)?.as_str().trim(),
        None => {
            let start = raw.find('{')?;
            let end = raw.rfind('}')?;
            if end <= start {
                return None;
            }
            &raw[start..=end]
        }
    };

    let value: JsonValue = serde_json::from_str(payload).ok()?;
    value.is_object().then(|| normalize_result(&value))
}

/// 把模型返回的 JSON 规范化成固定结构
fn normalize_result(value: &JsonValue) -> GradingResult {
    let criteria = value
        .get("results")
        .and_then(JsonValue::as_array)
        .map(|items| items.iter().map(normalize_criterion).collect())
        .unwrap_or_default();

    GradingResult {
        criteria,
        total_score: coerce_number(value.get("totalScore")),
        overall_feedback: coerce_text(
            value.get("overallFeedback"),
            "No overall feedback provided",
        ),
    }
}

fn normalize_criterion(item: &JsonValue) -> CriterionResult {
    let mistakes = item
        .get("mistakes")
        .and_then(JsonValue::as_array)
        .map(|list| {
            list.iter()
                .map(|m| match m {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    CriterionResult {
        question: coerce_text(item.get("question"), "Unnamed aspect"),
        mistakes,
        score: coerce_number(item.get("score")),
        feedback: coerce_text(item.get("feedback"), "No feedback provided"),
    }
}

/// 数字或数字字符串转成 f64，其余情况为 0
fn coerce_number(value: Option<&JsonValue>) -> f64 {
    match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_text(value: Option<&JsonValue>, default: &str) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}
