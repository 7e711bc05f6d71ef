//! 外部 AI 能力接口
//! 结构化生成服务与词汇服务的抽象边界，具体实现视为黑盒

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::models::{SchemaDescriptor, VocabularyItem};

/// 结构化生成服务
///
/// 给定自然语言提示词与目标 schema，返回 schema 合规的 JSON 对象或类型化失败。
/// 实现方负责对格式错误的输出做有限次修复重试，重试耗尽后以
/// `ProviderError::MalformedOutput` / `SchemaMismatch` 终止。
#[async_trait]
pub trait StructuredGenerationProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, ProviderError>;
}

/// 词汇服务
///
/// 返回空列表是合法结果，调用方必须优雅处理（词汇增强是增强而非硬性要求）。
#[async_trait]
pub trait VocabularyProvider: Send + Sync {
    async fn sample(
        &self,
        language: &str,
        limit: usize,
    ) -> Result<Vec<VocabularyItem>, ProviderError>;
}
