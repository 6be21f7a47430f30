//! 评分结果存储 - 业务能力层
//!
//! 只负责"写一条评分记录"和"更新提交状态"，存储失败由上层记录日志后忽略

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::{ContentKind, GradingResult, SubmissionStatus};

/// 写入 `submission_results` 表的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedFileRecord {
    pub submission_id: String,
    pub file_name: String,
    pub file_content: String,
    pub grading_results: GradingResult,
    pub created_at: String,
}

/// 持久化能力
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    async fn insert_result(&self, record: &GradedFileRecord) -> AppResult<()>;

    async fn update_submission_status(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> AppResult<()>;
}

/// Supabase（PostgREST）实现
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    results_table: String,
    submissions_table: String,
}

impl SupabaseStore {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", config.supabase_url.trim_end_matches('/')),
            api_key: config.supabase_key.clone(),
            results_table: config.results_table.clone(),
            submissions_table: config.submissions_table.clone(),
        }
    }

    async fn check(endpoint: &str, response: reqwest::Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(PersistenceError::BadResponse {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        }
        .into())
    }
}

#[async_trait]
impl PersistenceBackend for SupabaseStore {
    async fn insert_result(&self, record: &GradedFileRecord) -> AppResult<()> {
        let endpoint = format!("{}/{}", self.base_url, self.results_table);
        let response = self
            .http
            .post(&endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await
            .map_err(|e| AppError::persistence_request_failed(&endpoint, e))?;
        Self::check(&endpoint, response).await
    }

    async fn update_submission_status(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> AppResult<()> {
        let endpoint = format!("{}/{}", self.base_url, self.submissions_table);
        let response = self
            .http
            .patch(&endpoint)
            .query(&[("id", format!("eq.{}", submission_id))])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|e| AppError::persistence_request_failed(&endpoint, e))?;
        Self::check(&endpoint, response).await
    }
}

/// 评分结果存储
#[derive(Clone)]
pub struct ResultStore {
    backend: Arc<dyn PersistenceBackend>,
}

impl ResultStore {
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self { backend }
    }

    /// 保存一个文件的评分结果
    pub async fn persist(
        &self,
        submission_id: &str,
        file_name: &str,
        file_content: &[u8],
        grading_result: &GradingResult,
    ) -> AppResult<()> {
        let record = GradedFileRecord {
            submission_id: submission_id.to_string(),
            file_name: file_name.to_string(),
            file_content: encode_file_content(file_name, file_content),
            grading_results: grading_result.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        debug!("保存评分记录: {} / {}", submission_id, file_name);
        self.backend.insert_result(&record).await
    }

    /// 更新提交状态
    pub async fn update_status(
        &self,
        submission_id: &str,
        status: SubmissionStatus,
    ) -> AppResult<()> {
        self.backend
            .update_submission_status(submission_id, status)
            .await
    }
}

/// 文档存 base64；纯文本直接存文本，不是合法 UTF-8 时同样退回 base64
fn encode_file_content(file_name: &str, bytes: &[u8]) -> String {
    let engine = &base64::engine::general_purpose::STANDARD;
    if ContentKind::from_file_name(file_name).is_document() {
        return engine.encode(bytes);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => engine.encode(bytes),
    }
}
