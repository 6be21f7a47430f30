use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的文件数量
    pub max_concurrent_files: usize,
    /// 单个文件流程的超时时间（秒），0 表示不限制
    pub file_timeout_secs: u64,
    /// 临时文件根目录
    pub temp_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 未提供总分时的默认值
    pub default_total_points: f64,
    // --- OCR / 内容理解 (Mistral) ---
    pub mistral_api_key: String,
    pub mistral_api_base_url: String,
    pub mistral_ocr_model: String,
    pub mistral_chat_model: String,
    /// OCR 成功后是否再用内容理解补充一遍
    pub enrich_document_text: bool,
    // --- 评分 (DeepSeek) ---
    pub grading_api_key: String,
    pub grading_api_base_url: String,
    pub grading_model_name: String,
    pub grading_temperature: f32,
    pub grading_max_tokens: u32,
    // --- 持久化 (Supabase) ---
    pub supabase_url: String,
    pub supabase_key: String,
    pub results_table: String,
    pub submissions_table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_files: 16,
            file_timeout_secs: 0,
            temp_dir: std::env::temp_dir().join("submission_grader"),
            verbose_logging: false,
            default_total_points: 100.0,
            mistral_api_key: String::new(),
            mistral_api_base_url: "https://api.mistral.ai/v1".to_string(),
            mistral_ocr_model: "mistral-ocr-latest".to_string(),
            mistral_chat_model: "mistral-large-latest".to_string(),
            enrich_document_text: false,
            grading_api_key: String::new(),
            grading_api_base_url: "https://api.deepseek.com".to_string(),
            grading_model_name: "deepseek-chat".to_string(),
            grading_temperature: 0.3,
            grading_max_tokens: 2000,
            supabase_url: String::new(),
            supabase_key: String::new(),
            results_table: "submission_results".to_string(),
            submissions_table: "submissions".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：先读 `GRADER_CONFIG` 指向的 TOML 文件（可选），再叠加环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("GRADER_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        base.overlay_env()
    }

    /// 只从环境变量加载
    pub fn from_env() -> AppResult<Self> {
        Self::default().overlay_env()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })?;
        Ok(config)
    }

    fn overlay_env(mut self) -> AppResult<Self> {
        env_override(&mut self.max_concurrent_files, "MAX_CONCURRENT_FILES")?;
        env_override(&mut self.file_timeout_secs, "FILE_TIMEOUT_SECS")?;
        env_override(&mut self.temp_dir, "GRADER_TEMP_DIR")?;
        env_override(&mut self.verbose_logging, "VERBOSE_LOGGING")?;
        env_override(&mut self.default_total_points, "DEFAULT_TOTAL_POINTS")?;
        env_override(&mut self.mistral_api_key, "MISTRAL_API_KEY")?;
        env_override(&mut self.mistral_api_base_url, "MISTRAL_API_BASE_URL")?;
        env_override(&mut self.mistral_ocr_model, "MISTRAL_OCR_MODEL")?;
        env_override(&mut self.mistral_chat_model, "MISTRAL_CHAT_MODEL")?;
        env_override(&mut self.enrich_document_text, "ENRICH_DOCUMENT_TEXT")?;
        env_override(&mut self.grading_api_key, "DEEPSEEK_API_KEY")?;
        env_override(&mut self.grading_api_base_url, "DEEPSEEK_API_BASE_URL")?;
        env_override(&mut self.grading_model_name, "GRADING_MODEL_NAME")?;
        env_override(&mut self.grading_temperature, "GRADING_TEMPERATURE")?;
        env_override(&mut self.grading_max_tokens, "GRADING_MAX_TOKENS")?;
        env_override(&mut self.supabase_url, "SUPABASE_URL")?;
        env_override(&mut self.supabase_key, "SUPABASE_KEY")?;
        env_override(&mut self.results_table, "RESULTS_TABLE")?;
        env_override(&mut self.submissions_table, "SUBMISSIONS_TABLE")?;
        Ok(self)
    }

    /// 单个文件流程的超时时间
    pub fn file_timeout(&self) -> Option<Duration> {
        match self.file_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// 用环境变量覆盖一个配置项；未设置时保持原值，设置了但无法解析返回错误
fn env_override<T: FromStr>(slot: &mut T, var_name: &str) -> AppResult<()> {
    let Ok(value) = std::env::var(var_name) else {
        return Ok(());
    };
    *slot = value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.clone(),
        expected_type: std::any::type_name::<T>().to_string(),
    })?;
    Ok(())
}
