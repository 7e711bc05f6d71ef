//! 核心数据模型
//! 题型定义、模块目录、批改结果等贯穿各服务的数据结构

pub mod schema;
pub mod sentence;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use schema::{FieldKind, FieldSpec, SchemaDescriptor};
pub use sentence::{Clause, Constituent, SentenceStructure, Token, TokenFeatures};

/// 技能类型：题型锻炼的主要语言能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillType {
    Reading,
    Writing,
    Listening,
    Speaking,
}

impl SkillType {
    pub fn all() -> [SkillType; 4] {
        [
            SkillType::Reading,
            SkillType::Writing,
            SkillType::Listening,
            SkillType::Speaking,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillType::Reading => "reading",
            SkillType::Writing => "writing",
            SkillType::Listening => "listening",
            SkillType::Speaking => "speaking",
        }
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 生成提示词上下文
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub module_id: String,
    pub submodule_id: String,
    /// 子模块注入提示词的语法/主题说明
    pub submodule_context: Option<String>,
    /// 子模块针对该题型的覆盖配置
    pub overrides: Option<Value>,
    pub target_language: String,
    pub source_language: String,
    /// 难度等级 1-5
    pub difficulty: u32,
}

/// 批改提示词上下文
#[derive(Debug, Clone)]
pub struct MarkingContext {
    pub question_data: Value,
    pub user_answer: Value,
    pub context: Option<String>,
}

/// 生成提示词构造能力
///
/// 题型定义携带该能力对象，派发即注册表查表，调用方不做题型分支。
pub trait GenerationPromptBuilder: Send + Sync {
    fn build(&self, context: &GenerationContext) -> String;
}

impl<F> GenerationPromptBuilder for F
where
    F: Fn(&GenerationContext) -> String + Send + Sync,
{
    fn build(&self, context: &GenerationContext) -> String {
        self(context)
    }
}

/// 批改提示词构造能力
pub trait MarkingPromptBuilder: Send + Sync {
    fn build(&self, context: &MarkingContext) -> String;
}

impl<F> MarkingPromptBuilder for F
where
    F: Fn(&MarkingContext) -> String + Send + Sync,
{
    fn build(&self, context: &MarkingContext) -> String {
        self(context)
    }
}

/// 题型定义：注册后不可变
pub struct ExerciseTypeDefinition {
    pub id: String,
    /// 题型族：同一任务的界面/内容变体归并到一个族
    pub family: String,
    pub skill_type: SkillType,
    pub generation_schema: SchemaDescriptor,
    pub marking_schema: SchemaDescriptor,
    generation_prompt: Box<dyn GenerationPromptBuilder>,
    marking_prompt: Box<dyn MarkingPromptBuilder>,
}

impl ExerciseTypeDefinition {
    pub fn new(
        id: &str,
        family: &str,
        skill_type: SkillType,
        generation_schema: SchemaDescriptor,
        marking_schema: SchemaDescriptor,
        generation_prompt: impl GenerationPromptBuilder + 'static,
        marking_prompt: impl MarkingPromptBuilder + 'static,
    ) -> Self {
        Self {
            id: id.to_string(),
            family: family.to_string(),
            skill_type,
            generation_schema,
            marking_schema,
            generation_prompt: Box::new(generation_prompt),
            marking_prompt: Box::new(marking_prompt),
        }
    }

    pub fn build_generation_prompt(&self, context: &GenerationContext) -> String {
        self.generation_prompt.build(context)
    }

    pub fn build_marking_prompt(&self, context: &MarkingContext) -> String {
        self.marking_prompt.build(context)
    }
}

impl fmt::Debug for ExerciseTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExerciseTypeDefinition")
            .field("id", &self.id)
            .field("family", &self.family)
            .field("skill_type", &self.skill_type)
            .finish()
    }
}

/// 子模块定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmoduleDefinition {
    pub id: String,
    pub supported_exercise_type_ids: Vec<String>,
    /// 按题型 id 索引的覆盖配置
    #[serde(default)]
    pub overrides: HashMap<String, Value>,
    /// 注入提示词的语法/主题说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl SubmoduleDefinition {
    pub fn new(id: &str, supported_exercise_type_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            supported_exercise_type_ids: supported_exercise_type_ids
                .iter()
                .map(|s| s.to_string())
                .collect(),
            overrides: HashMap::new(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }

    pub fn with_override(mut self, exercise_type_id: &str, value: Value) -> Self {
        self.overrides.insert(exercise_type_id.to_string(), value);
        self
    }

    pub fn supports(&self, exercise_type_id: &str) -> bool {
        self.supported_exercise_type_ids
            .iter()
            .any(|id| id == exercise_type_id)
    }
}

/// 模块定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: String,
    pub title: String,
    pub submodules: Vec<SubmoduleDefinition>,
}

impl ModuleDefinition {
    pub fn new(id: &str, title: &str, submodules: Vec<SubmoduleDefinition>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            submodules,
        }
    }
}

/// 规范批改结果：所有题型最终归一到这个形状
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingResult {
    pub is_correct: bool,
    /// 0-100
    pub score: f64,
    pub feedback: String,
    /// 不适用时为空串
    pub correct_answer: String,
}

impl MarkingResult {
    /// AI 批改调用失败时的确定性降级结果
    pub fn marking_error_fallback() -> Self {
        Self {
            is_correct: false,
            score: 0.0,
            feedback: "Error during marking process.".to_string(),
            correct_answer: String::new(),
        }
    }

    /// 模型输出结构不兼容规范形状时的确定性降级结果
    pub fn schema_mismatch_fallback() -> Self {
        Self {
            is_correct: false,
            score: 0.0,
            feedback: "Marking schema validation mismatch.".to_string(),
            correct_answer: String::new(),
        }
    }
}

/// 生成结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// 符合题型生成 schema 的题目数据，`id` 字段由引擎生成
    pub question_data: Value,
    /// 诊断用途，正确性不依赖它
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<GenerationTrace>,
}

/// 生成过程诊断信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTrace {
    pub generation_prompt: String,
    pub stage1_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary_word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_prompt: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// 词汇条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl VocabularyItem {
    pub fn new(word: &str) -> Self {
        Self {
            word: word.to_string(),
            translation: None,
        }
    }

    pub fn with_translation(mut self, translation: &str) -> Self {
        self.translation = Some(translation.to_string());
        self
    }
}

/// 作答历史记录（选题策略输入，基线策略不使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub submodule_id: String,
    pub exercise_type_id: String,
    pub is_correct: bool,
    pub attempted_at: DateTime<Utc>,
}

/// 交给统计协作方的会话记录元组，引擎只产出不持久化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub submodule_id: String,
    pub exercise_type_id: String,
    pub question_data: Value,
    pub user_answer: Value,
    pub marking_result: MarkingResult,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}
