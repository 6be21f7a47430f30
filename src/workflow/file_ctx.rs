//! 文件处理上下文
//!
//! 封装"我正在处理哪次提交的第几个文件"这一信息

use std::fmt::Display;

/// 文件处理上下文
#[derive(Debug, Clone)]
pub struct FileCtx {
    /// 提交ID
    pub submission_id: String,

    /// 文件在批次中的序号（从1开始，仅用于日志显示）
    pub file_index: usize,

    /// 原始文件名
    pub file_name: String,
}

impl FileCtx {
    /// 创建新的文件上下文
    pub fn new(
        submission_id: impl Into<String>,
        file_index: usize,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            submission_id: submission_id.into(),
            file_index,
            file_name: file_name.into(),
        }
    }
}

impl Display for FileCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[提交 {} 文件#{} {}]",
            self.submission_id, self.file_index, self.file_name
        )
    }
}
