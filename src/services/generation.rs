//! 出题服务模块
//! 两阶段生成流水线：阶段 1 强制生成 schema 合规题目（有限重试），
//! 阶段 2 尽力而为地把抽样词汇改写进题目，失败时静默回退阶段 1 结果

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    GenerationContext, GenerationResult, GenerationTrace, SchemaDescriptor,
};
use crate::services::provider::{StructuredGenerationProvider, VocabularyProvider};
use crate::services::registry::{ModuleRegistry, SchemaRegistry};

/// 阶段 1 失败后的额外重试次数
const STAGE1_EXTRA_RETRIES: u32 = 2;

/// 生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub module_id: String,
    pub submodule_id: String,
    pub exercise_type_id: String,
    pub target_language: String,
    pub source_language: String,
    /// 难度等级 1-5
    pub difficulty: u32,
    /// 是否携带诊断信息
    pub include_trace: bool,
}

impl GenerationRequest {
    pub fn new(module_id: &str, submodule_id: &str, exercise_type_id: &str) -> Self {
        Self {
            module_id: module_id.to_string(),
            submodule_id: submodule_id.to_string(),
            exercise_type_id: exercise_type_id.to_string(),
            target_language: "de".to_string(),
            source_language: "en".to_string(),
            difficulty: 2,
            include_trace: false,
        }
    }

    pub fn with_languages(mut self, target: &str, source: &str) -> Self {
        self.target_language = target.to_string();
        self.source_language = source.to_string();
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.include_trace = true;
        self
    }
}

/// 出题服务
pub struct QuestionGenerationService {
    schemas: Arc<SchemaRegistry>,
    modules: Arc<ModuleRegistry>,
    provider: Arc<dyn StructuredGenerationProvider>,
    vocabulary: Arc<dyn VocabularyProvider>,
}

impl QuestionGenerationService {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        modules: Arc<ModuleRegistry>,
        provider: Arc<dyn StructuredGenerationProvider>,
        vocabulary: Arc<dyn VocabularyProvider>,
    ) -> Self {
        Self {
            schemas,
            modules,
            provider,
            vocabulary,
        }
    }

    pub async fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationResult> {
        let module = self
            .modules
            .get(&request.module_id)
            .ok_or_else(|| EngineError::ModuleNotFound(request.module_id.clone()))?;
        let submodule = module
            .submodules
            .iter()
            .find(|s| s.id == request.submodule_id)
            .ok_or_else(|| EngineError::SubmoduleNotFound {
                module_id: request.module_id.clone(),
                submodule_id: request.submodule_id.clone(),
            })?;
        if !submodule.supports(&request.exercise_type_id) {
            return Err(EngineError::UnsupportedExerciseType {
                submodule_id: request.submodule_id.clone(),
                exercise_type_id: request.exercise_type_id.clone(),
            });
        }
        let definition = self
            .schemas
            .get(&request.exercise_type_id)
            .ok_or_else(|| EngineError::SchemaNotFound(request.exercise_type_id.clone()))?;

        let context = GenerationContext {
            module_id: request.module_id.clone(),
            submodule_id: request.submodule_id.clone(),
            submodule_context: submodule.context.clone(),
            overrides: submodule.overrides.get(&request.exercise_type_id).cloned(),
            target_language: request.target_language.clone(),
            source_language: request.source_language.clone(),
            difficulty: request.difficulty,
        };
        let generation_prompt = definition.build_generation_prompt(&context);

        let stage1 = self
            .generate_stage1(&generation_prompt, &definition.generation_schema)
            .await?;

        let (mut question_data, vocabulary_word, rewrite_prompt) = self
            .try_vocabulary_rewrite(
                &stage1,
                &definition.generation_schema,
                &request.target_language,
            )
            .await;

        // 生成内容里的 id 不可信，无条件用引擎生成的 uuid 覆盖
        question_data["id"] = json!(Uuid::new_v4().to_string());

        let trace = if request.include_trace {
            Some(GenerationTrace {
                generation_prompt,
                stage1_data: stage1,
                vocabulary_word,
                rewrite_prompt,
                generated_at: Utc::now(),
            })
        } else {
            None
        };

        Ok(GenerationResult {
            question_data,
            trace,
        })
    }

    /// 阶段 1：强制生成，重试预算耗尽后以 GenerationFailed 上抛
    async fn generate_stage1(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> EngineResult<Value> {
        let attempts = STAGE1_EXTRA_RETRIES + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.provider.generate(prompt, schema).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!(
                        "stage-1 generation attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(EngineError::GenerationFailed {
            attempts,
            reason: last_error,
        })
    }

    /// 阶段 2：词汇植入改写
    ///
    /// 任何失败（无词汇、调用失败、改写不合 schema）都回退到阶段 1 结果；
    /// 语义上不合理但结构合规的改写不做甄别，与来源行为保持一致。
    async fn try_vocabulary_rewrite(
        &self,
        stage1: &Value,
        schema: &SchemaDescriptor,
        target_language: &str,
    ) -> (Value, Option<String>, Option<String>) {
        let items = match self.vocabulary.sample(target_language, 1).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("vocabulary sampling failed, skipping rewrite stage: {}", e);
                return (stage1.clone(), None, None);
            }
        };
        let item = match items.into_iter().next() {
            Some(item) => item,
            None => {
                log::debug!("no vocabulary available for {}, skipping rewrite stage", target_language);
                return (stage1.clone(), None, None);
            }
        };

        let rewrite_prompt = build_rewrite_prompt(stage1, &item.word);

        match self.provider.generate(&rewrite_prompt, schema).await {
            Ok(rewritten) if schema.conforms(&rewritten) => {
                (rewritten, Some(item.word), Some(rewrite_prompt))
            }
            Ok(_) => {
                log::warn!("vocabulary rewrite returned non-conformant object, falling back to stage-1 result");
                (stage1.clone(), Some(item.word), Some(rewrite_prompt))
            }
            Err(e) => {
                log::warn!("vocabulary rewrite failed, falling back to stage-1 result: {}", e);
                (stage1.clone(), Some(item.word), Some(rewrite_prompt))
            }
        }
    }
}

/// 构造词汇植入改写提示词
fn build_rewrite_prompt(stage1: &Value, word: &str) -> String {
    format!(
        r#"You are an expert language-learning content editor. Rewrite the exercise below so that it naturally incorporates the vocabulary word "{}".

## Exercise JSON:
{}

## Requirements:
1. Modify exactly ONE content-bearing field so it naturally uses the word "{}"
2. Keep every other field byte-for-byte unchanged
3. Keep the same JSON structure, field names and field types
4. The exercise must stay grammatically correct and solvable"#,
        word,
        serde_json::to_string_pretty(stage1).unwrap_or_else(|_| stage1.to_string()),
        word
    )
}
