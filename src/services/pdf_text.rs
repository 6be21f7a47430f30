//! PDF 文本层提取 - OCR 失败时的本地兜底

use crate::error::{AppResult, ExtractionError};

/// 逐页提取 PDF 文本层（同步，调用方负责放到阻塞线程池）
pub trait TextLayerExtractor: Send + Sync {
    fn extract_pages(&self, document: &[u8]) -> AppResult<Vec<String>>;
}

/// 基于 pdf-extract 的文本层提取
pub struct PdfTextLayer;

impl TextLayerExtractor for PdfTextLayer {
    fn extract_pages(&self, document: &[u8]) -> AppResult<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(document).map_err(|e| {
            ExtractionError::TextLayerFailed {
                detail: e.to_string(),
            }
            .into()
        })
    }
}
