use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 文件内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// 文档（走 OCR）
    Document,
    /// 纯文本（走内容理解）
    PlainText,
}

/// 扩展名到内容类型的映射，未列出的扩展名按纯文本处理
static EXTENSION_KINDS: phf::Map<&'static str, ContentKind> = phf_map! {
    "pdf" => ContentKind::Document,
    "txt" => ContentKind::PlainText,
    "md" => ContentKind::PlainText,
    "markdown" => ContentKind::PlainText,
    "text" => ContentKind::PlainText,
    "csv" => ContentKind::PlainText,
    "json" => ContentKind::PlainText,
};

impl ContentKind {
    /// 根据文件名推断内容类型
    pub fn from_file_name(file_name: &str) -> Self {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .and_then(|ext| EXTENSION_KINDS.get(ext.as_str()).copied())
            .unwrap_or(ContentKind::PlainText)
    }

    pub fn is_document(self) -> bool {
        self == ContentKind::Document
    }
}
