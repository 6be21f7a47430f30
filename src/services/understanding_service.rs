//! 内容理解服务 - 业务能力层
//!
//! 只负责"整理一段文本"能力，失败时由调用方决定如何兜底

use async_trait::async_trait;

use crate::config::Config;
use crate::error::AppResult;
use crate::services::llm_service::LlmService;

const UNDERSTANDING_PROMPT: &str = "You are an expert at understanding and analyzing text content. \
Please process the following text to extract key information, maintain structure, and improve clarity.";

/// 内容理解能力
#[async_trait]
pub trait ContentUnderstanding: Send + Sync {
    async fn understand(&self, text: &str) -> AppResult<String>;
}

/// 基于 Mistral 聊天接口的内容理解
pub struct MistralUnderstanding {
    llm: LlmService,
}

impl MistralUnderstanding {
    pub fn new(config: &Config) -> Self {
        Self {
            llm: LlmService::new(
                &config.mistral_api_key,
                &config.mistral_api_base_url,
                &config.mistral_chat_model,
                config.grading_temperature,
                config.grading_max_tokens * 2,
            ),
        }
    }
}

#[async_trait]
impl ContentUnderstanding for MistralUnderstanding {
    async fn understand(&self, text: &str) -> AppResult<String> {
        self.llm.send_to_llm(text, Some(UNDERSTANDING_PROMPT)).await
    }
}
