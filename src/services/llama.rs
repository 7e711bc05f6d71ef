//! Llama.cpp 推理服务模块
//! 默认的结构化生成实现：调用本地 llama-server，把目标 schema 拼进提示词，
//! 从模型输出中提取 JSON 并校验，格式错误时做有限次修复重试

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Duration;

use crate::error::ProviderError;
use crate::models::SchemaDescriptor;
use crate::services::provider::StructuredGenerationProvider;

/// Llama 配置
#[derive(Debug, Clone)]
pub struct LlamaConfig {
    pub base_url: String,         // llama-server 地址
    pub temperature: f32,         // 温度参数
    pub max_tokens: u32,          // 单次生成上限
    pub repair_retries: u32,      // 格式错误修复重试次数
    pub request_timeout_secs: u64,
}

impl Default for LlamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            repair_retries: 2,
            request_timeout_secs: 120,
        }
    }
}

/// Completion 请求
#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    n_predict: u32,
    temperature: f32,
    stop: Vec<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_prompt: Option<bool>,
}

/// Completion 响应
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

/// llama-server 客户端
#[derive(Clone)]
pub struct LlamaClient {
    config: LlamaConfig,
    http_client: reqwest::Client,
}

impl LlamaClient {
    pub fn new(config: LlamaConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &LlamaConfig {
        &self.config
    }

    /// 健康检查
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.config.base_url);
        match self.http_client.get(&url).send().await {
            Ok(resp) => resp.status() == 200,
            Err(_) => false,
        }
    }

    /// 单次推理补全
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/completion", self.config.base_url);

        let completion_request = CompletionRequest {
            prompt: prompt.to_string(),
            n_predict: self.config.max_tokens,
            temperature: self.config.temperature,
            stop: vec![],
            stream: false,
            cache_prompt: Some(true),
        };

        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .json(&completion_request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .json::<CompletionResponse>()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(response.content)
    }
}

#[async_trait]
impl StructuredGenerationProvider for LlamaClient {
    async fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, ProviderError> {
        let full_prompt = format!("{}\n\n{}", prompt, schema.render_instructions());

        let mut last_failure = String::new();
        let attempts = self.config.repair_retries + 1;

        for attempt in 1..=attempts {
            // 传输错误不属于格式修复的范畴，立即上抛
            let raw = self.complete(&full_prompt).await?;

            let payload = match extract_json_payload(&raw) {
                Some(payload) => payload,
                None => {
                    last_failure = format!("no JSON object found in output: {}", truncate(&raw, 120));
                    log::warn!(
                        "llama output had no JSON payload (attempt {}/{})",
                        attempt,
                        attempts
                    );
                    continue;
                }
            };

            let value: Value = match serde_json::from_str(&payload) {
                Ok(value) => value,
                Err(e) => {
                    last_failure = format!("invalid JSON: {}", e);
                    log::warn!("llama output failed to parse (attempt {}/{}): {}", attempt, attempts, e);
                    continue;
                }
            };

            match schema.validate(&value) {
                Ok(()) => return Ok(value),
                Err(violations) => {
                    last_failure = format!("schema violations: {}", violations.join("; "));
                    log::warn!(
                        "llama output violated schema {} (attempt {}/{}): {:?}",
                        schema.name,
                        attempt,
                        attempts,
                        violations
                    );
                    if attempt == attempts {
                        return Err(ProviderError::SchemaMismatch {
                            schema: schema.name.clone(),
                            violations,
                        });
                    }
                }
            }
        }

        Err(ProviderError::MalformedOutput(last_failure))
    }
}

/// 从模型原始输出中提取 JSON 文档
///
/// 依次尝试：```json 围栏、``` 围栏、首个 `{` 到末个 `}` 的裸 JSON。
pub fn extract_json_payload(text: &str) -> Option<String> {
    let fenced = Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap();
    if let Some(cap) = fenced.captures(text) {
        return cap.get(1).map(|m| m.as_str().to_string());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(text[start..=end].to_string())
    } else {
        None
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(limit).collect();
        format!("{}…", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fenced_json() {
        let raw = "Here is the question:\n```json\n{\"question\": \"q\"}\n```\nDone.";
        assert_eq!(
            extract_json_payload(raw).unwrap(),
            "{\"question\": \"q\"}"
        );
    }

    #[test]
    fn test_extract_unlabelled_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_payload(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_bare_json_with_prose_prefix() {
        let raw = "Sure! {\"a\": 1, \"b\": {\"c\": 2}} hope this helps";
        assert_eq!(
            extract_json_payload(raw).unwrap(),
            "{\"a\": 1, \"b\": {\"c\": 2}}"
        );
    }

    #[test]
    fn test_extract_without_json_returns_none() {
        assert!(extract_json_payload("no structured output here").is_none());
    }

    #[test]
    fn test_default_config() {
        let config = LlamaConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.repair_retries, 2);
    }
}
