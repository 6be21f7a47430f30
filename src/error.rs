use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 临时文件暂存错误
    #[error("暂存错误: {0}")]
    Staging(#[from] StagingError),
    /// 内容提取错误
    #[error("内容提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 持久化错误
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 提交批次错误
    #[error("提交错误: {0}")]
    Submission(#[from] SubmissionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 临时文件暂存错误
#[derive(Debug, Error)]
pub enum StagingError {
    /// 暂存内容为空
    #[error("文件内容为空: {file_name}")]
    EmptyFile { file_name: String },
    /// 写入临时文件失败
    #[error("写入临时文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取临时文件失败
    #[error("读取临时文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 结构化内容序列化失败
    #[error("结构化内容序列化失败 ({file_name}): {source}")]
    SerializeFailed {
        file_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 内容提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// OCR 调用失败
    #[error("OCR调用失败 ({file_name}): {detail}")]
    OcrFailed { file_name: String, detail: String },
    /// OCR 返回没有可用文本
    #[error("OCR未返回可用文本: {file_name}")]
    OcrEmpty { file_name: String },
    /// 文本层提取失败
    #[error("PDF文本层提取失败: {detail}")]
    TextLayerFailed { detail: String },
    /// 内容理解调用失败
    #[error("内容理解调用失败: {detail}")]
    UnderstandingFailed { detail: String },
    /// 主路径与兜底路径都没有产出文本
    #[error("无法从 {file_name} 提取文本: {detail}")]
    ExtractionFailed { file_name: String, detail: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {detail}")]
    ApiCallFailed { model: String, detail: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 构建请求失败
    #[error("构建LLM请求失败: {detail}")]
    RequestBuildFailed { detail: String },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 网络请求失败
    #[error("持久化请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回错误响应
    #[error("持久化返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 其他存储错误（测试替身等）
    #[error("存储失败: {0}")]
    Other(String),
}

/// 提交批次错误
#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
    /// 过滤掉空文件名后没有可处理的文件
    #[error("没有可处理的文件")]
    NoValidFiles,
    /// 评分标准为空
    #[error("评分标准不能为空")]
    MissingCriteria,
    /// 总分必须为正数
    #[error("总分必须大于 0: {value}")]
    InvalidPoints { value: f64 },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 LLM API 调用错误
    pub fn llm_api_failed(model: impl Into<String>, detail: impl ToString) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            detail: detail.to_string(),
        })
    }

    /// 创建 OCR 调用错误
    pub fn ocr_failed(file_name: impl Into<String>, detail: impl ToString) -> Self {
        AppError::Extraction(ExtractionError::OcrFailed {
            file_name: file_name.into(),
            detail: detail.to_string(),
        })
    }

    /// 创建持久化请求失败错误
    pub fn persistence_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Persistence(PersistenceError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 是否是批次级别的错误（需要直接返回给调用方）
    pub fn is_batch_rejection(&self) -> bool {
        matches!(self, AppError::Submission(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
