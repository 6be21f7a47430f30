//! 文档 OCR 服务 - 业务能力层
//!
//! 只负责"把文档变成逐页文本"能力

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// OCR 返回的一页
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPage {
    pub index: usize,
    pub text: String,
}

/// 文档 OCR 能力
#[async_trait]
pub trait DocumentOcr: Send + Sync {
    async fn ocr(&self, file_name: &str, document: &[u8]) -> AppResult<Vec<OcrPage>>;
}

/// Mistral OCR 客户端
pub struct MistralOcr {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: OcrDocument,
}

#[derive(Serialize)]
struct OcrDocument {
    #[serde(rename = "type")]
    kind: &'static str,
    document_url: String,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrResponsePage>,
}

#[derive(Deserialize)]
struct OcrResponsePage {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    markdown: String,
}

impl MistralOcr {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.mistral_api_key.clone(),
            endpoint: format!("{}/ocr", config.mistral_api_base_url.trim_end_matches('/')),
            model: config.mistral_ocr_model.clone(),
        }
    }
}

#[async_trait]
impl DocumentOcr for MistralOcr {
    async fn ocr(&self, file_name: &str, document: &[u8]) -> AppResult<Vec<OcrPage>> {
        debug!(
            "调用 OCR，文件: {}，大小: {} 字节",
            file_name,
            document.len()
        );

        // 文档以 base64 data URL 内联发送，不需要先上传
        let encoded = base64::engine::general_purpose::STANDARD.encode(document);
        let request = OcrRequest {
            model: &self.model,
            document: OcrDocument {
                kind: "document_url",
                document_url: format!("data:application/pdf;base64,{}", encoded),
            },
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ocr_failed(file_name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("OCR 返回错误状态 {}: {}", status, body);
            let detail = format!("HTTP {}: {}", status, body);
            return Err(AppError::ocr_failed(file_name, detail));
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| AppError::ocr_failed(file_name, e))?;

        let pages = pages_from_response(parsed);
        debug!("OCR 完成，共 {} 页", pages.len());
        Ok(pages)
    }
}

/// 把 OCR 响应转换成按页序排列的页面列表
fn pages_from_response(response: OcrResponse) -> Vec<OcrPage> {
    let mut pages: Vec<OcrPage> = response
        .pages
        .into_iter()
        .map(|page| OcrPage {
            index: page.index,
            text: page.markdown,
        })
        .collect();
    pages.sort_by_key(|page| page.index);
    pages
}
