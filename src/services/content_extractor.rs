//! 内容提取 - 业务能力层
//!
//! 文档：OCR → 文本层兜底；纯文本：内容理解 → 原文兜底。
//! 每条路径只走一次"主路径 → 兜底"，不做重试。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppResult, ExtractionError};
use crate::infrastructure::StagedFile;
use crate::services::ocr_service::{DocumentOcr, OcrPage};
use crate::services::pdf_text::TextLayerExtractor;
use crate::services::understanding_service::ContentUnderstanding;

/// 文本来自哪条提取路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// OCR（主路径）
    Ocr,
    /// OCR 文本 + 内容理解补充（主路径）
    OcrEnriched,
    /// PDF 文本层（兜底）
    TextLayer,
    /// 内容理解整理后的文本（主路径）
    Understanding,
    /// 未经处理的原文（兜底）
    RawText,
}

impl ExtractionSource {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::TextLayer | Self::RawText)
    }
}

/// 规范化后的文本内容
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub text: String,
    pub source: ExtractionSource,
}

/// 内容提取器
#[derive(Clone)]
pub struct ContentExtractor {
    ocr: Arc<dyn DocumentOcr>,
    text_layer: Arc<dyn TextLayerExtractor>,
    understanding: Arc<dyn ContentUnderstanding>,
    enrich_documents: bool,
}

impl ContentExtractor {
    pub fn new(
        ocr: Arc<dyn DocumentOcr>,
        text_layer: Arc<dyn TextLayerExtractor>,
        understanding: Arc<dyn ContentUnderstanding>,
    ) -> Self {
        Self {
            ocr,
            text_layer,
            understanding,
            enrich_documents: false,
        }
    }

    /// OCR 成功后再用内容理解补充一遍
    pub fn with_document_enrichment(mut self, enabled: bool) -> Self {
        self.enrich_documents = enabled;
        self
    }

    /// 从暂存文件提取文本
    pub async fn extract(&self, staged: &StagedFile) -> AppResult<ExtractedContent> {
        let bytes = staged.read().await?;
        if staged.content_kind.is_document() {
            self.extract_document(&staged.original_name, bytes).await
        } else {
            self.extract_plain_text(&staged.original_name, &bytes).await
        }
    }

    async fn extract_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> AppResult<ExtractedContent> {
        let ocr_error = match self.ocr.ocr(file_name, &bytes).await {
            Ok(pages) => match join_ocr_pages(&pages) {
                Some(text) => {
                    debug!("OCR 成功: {} ({} 页)", file_name, pages.len());
                    return Ok(self.maybe_enrich(file_name, text).await);
                }
                None => ExtractionError::OcrEmpty {
                    file_name: file_name.to_string(),
                }
                .to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(
            "OCR 失败，改用 PDF 文本层提取: {} ({})",
            file_name, ocr_error
        );

        let text_layer = Arc::clone(&self.text_layer);
        // pdf-extract 是同步的，且对损坏文件可能 panic
        let task = tokio::task::spawn_blocking(move || text_layer.extract_pages(&bytes));
        let fallback = task.await;

        let fallback_error = match fallback {
            Ok(Ok(pages)) => {
                let text = join_text_layer_pages(&pages);
                if !text.is_empty() {
                    info!("PDF 文本层提取成功: {} ({} 页)", file_name, pages.len());
                    return Ok(ExtractedContent {
                        text,
                        source: ExtractionSource::TextLayer,
                    });
                }
                "文本层为空".to_string()
            }
            Ok(Err(e)) => e.to_string(),
            Err(join_error) => format!("文本层提取中断: {}", join_error),
        };

        Err(ExtractionError::ExtractionFailed {
            file_name: file_name.to_string(),
            detail: format!("{}; {}", ocr_error, fallback_error),
        }
        .into())
    }

    async fn maybe_enrich(&self, file_name: &str, ocr_text: String) -> ExtractedContent {
        if !self.enrich_documents {
            return ExtractedContent {
                text: ocr_text,
                source: ExtractionSource::Ocr,
            };
        }
        match self.understanding.understand(&ocr_text).await {
            Ok(extra) => ExtractedContent {
                text: format!("{}\n\n{}", ocr_text, extra),
                source: ExtractionSource::OcrEnriched,
            },
            Err(e) => {
                warn!("文档内容理解失败，只使用 OCR 文本: {} ({})", file_name, e);
                ExtractedContent {
                    text: ocr_text,
                    source: ExtractionSource::Ocr,
                }
            }
        }
    }

    async fn extract_plain_text(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> AppResult<ExtractedContent> {
        let raw = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => {
                warn!("文件不是合法的 UTF-8，按有损方式解码: {}", file_name);
                String::from_utf8_lossy(bytes).into_owned()
            }
        };

        if raw.trim().is_empty() {
            return Err(ExtractionError::ExtractionFailed {
                file_name: file_name.to_string(),
                detail: "文本内容为空".to_string(),
            }
            .into());
        }

        match self.understanding.understand(&raw).await {
            Ok(improved) if !improved.trim().is_empty() => Ok(ExtractedContent {
                text: improved,
                source: ExtractionSource::Understanding,
            }),
            Ok(_) => {
                warn!("内容理解返回空文本，使用原文: {}", file_name);
                Ok(raw_content(raw))
            }
            Err(e) => {
                warn!("内容理解失败，使用原文: {} ({})", file_name, e);
                Ok(raw_content(raw))
            }
        }
    }
}

fn raw_content(text: String) -> ExtractedContent {
    ExtractedContent {
        text,
        source: ExtractionSource::RawText,
    }
}

/// 按页序用空行拼接 OCR 文本；没有任何可用文本时返回 None
fn join_ocr_pages(pages: &[OcrPage]) -> Option<String> {
    let texts: Vec<&str> = pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect();
    (!texts.is_empty()).then(|| texts.join("\n\n"))
}

fn join_text_layer_pages(pages: &[String]) -> String {
    let joined = pages
        .iter()
        .map(|page| page.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.trim().is_empty() {
        String::new()
    } else {
        joined.trim().to_string()
    }
}
