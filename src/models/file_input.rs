//! 上传文件的统一表示
//!
//! 路由层收到的内容可能是字节流、纯文本或结构化数据，
//! 在进入核心流程前统一转换成 `FileInput`。

use serde_json::{Map, Value as JsonValue};

use crate::error::{AppResult, StagingError};

/// 上传内容
#[derive(Debug, Clone, PartialEq)]
pub enum FilePayload {
    /// 原始字节（PDF 等）
    Bytes(Vec<u8>),
    /// 纯文本
    Text(String),
    /// 结构化数据，暂存前序列化为 JSON 文本
    Structured(Map<String, JsonValue>),
}

/// 一个待评分的文件
#[derive(Debug, Clone, PartialEq)]
pub struct FileInput {
    pub file_name: String,
    pub payload: FilePayload,
}

impl FileInput {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: FilePayload::Bytes(bytes.into()),
        }
    }

    pub fn from_text(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: FilePayload::Text(text.into()),
        }
    }

    pub fn from_structured(file_name: impl Into<String>, value: Map<String, JsonValue>) -> Self {
        Self {
            file_name: file_name.into(),
            payload: FilePayload::Structured(value),
        }
    }

    /// 文件名是否可用（空白文件名的条目会被过滤掉）
    pub fn has_name(&self) -> bool {
        !self.file_name.trim().is_empty()
    }

    /// 转换为要写入暂存区的字节
    pub fn to_bytes(&self) -> AppResult<Vec<u8>> {
        match &self.payload {
            FilePayload::Bytes(bytes) => Ok(bytes.clone()),
            FilePayload::Text(text) => Ok(text.as_bytes().to_vec()),
            FilePayload::Structured(map) => serde_json::to_vec_pretty(map).map_err(|source| {
                StagingError::SerializeFailed {
                    file_name: self.file_name.clone(),
                    source,
                }
                .into()
            }),
        }
    }
}
