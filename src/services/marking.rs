//! 批改服务模块
//! 按题型批改 schema 评阅自由作答并归一到规范批改结果。
//! AI 侧任何失败都降级为确定性结果而不上抛：批改坏了只能降低反馈质量，
//! 不允许中断用户会话。

use std::sync::Arc;

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::models::{MarkingContext, MarkingResult};
use crate::services::provider::StructuredGenerationProvider;
use crate::services::registry::SchemaRegistry;

/// 批改请求
#[derive(Debug, Clone)]
pub struct MarkingRequest {
    pub exercise_type_id: String,
    pub question_data: Value,
    /// 形状由题型决定：选择题是下标，自由作答是字符串，
    /// 改错题是 {index, correction}，确认题可为 "no-error" 哨兵值
    pub user_answer: Value,
    pub context: Option<String>,
}

/// 批改服务
pub struct MarkingService {
    schemas: Arc<SchemaRegistry>,
    provider: Arc<dyn StructuredGenerationProvider>,
}

impl MarkingService {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        provider: Arc<dyn StructuredGenerationProvider>,
    ) -> Self {
        Self { schemas, provider }
    }

    /// 批改作答
    ///
    /// 只有配置错误（题型未注册）会返回 Err；AI 调用失败与输出结构不兼容
    /// 都映射为确定性降级结果。
    pub async fn mark(&self, request: &MarkingRequest) -> EngineResult<MarkingResult> {
        let definition = self
            .schemas
            .get(&request.exercise_type_id)
            .ok_or_else(|| EngineError::SchemaNotFound(request.exercise_type_id.clone()))?;

        let context = MarkingContext {
            question_data: request.question_data.clone(),
            user_answer: request.user_answer.clone(),
            context: request.context.clone(),
        };
        let prompt = definition.build_marking_prompt(&context);

        let raw = match self
            .provider
            .generate(&prompt, &definition.marking_schema)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "marking provider failed for {}, returning fallback: {}",
                    request.exercise_type_id,
                    e
                );
                return Ok(MarkingResult::marking_error_fallback());
            }
        };

        Ok(project_to_canonical(&raw))
    }
}

/// 把题型批改输出投影到规范形状
///
/// 题型 schema 允许是规范形状的结构化超集，多余字段直接丢弃；
/// 缺少规范字段或类型不符时返回确定性降级结果而不是报错。
fn project_to_canonical(value: &Value) -> MarkingResult {
    let object = match value.as_object() {
        Some(object) => object,
        None => return MarkingResult::schema_mismatch_fallback(),
    };

    let is_correct = match object.get("is_correct").and_then(Value::as_bool) {
        Some(is_correct) => is_correct,
        None => return MarkingResult::schema_mismatch_fallback(),
    };
    let score = match object.get("score").and_then(Value::as_f64) {
        Some(score) => score.clamp(0.0, 100.0),
        None => return MarkingResult::schema_mismatch_fallback(),
    };
    let feedback = match object.get("feedback").and_then(Value::as_str) {
        Some(feedback) => feedback.to_string(),
        None => return MarkingResult::schema_mismatch_fallback(),
    };
    // 不适用时允许缺省为空串
    let correct_answer = object
        .get("correct_answer")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    MarkingResult {
        is_correct,
        score,
        feedback,
        correct_answer,
    }
}
