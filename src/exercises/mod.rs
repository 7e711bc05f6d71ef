//! 内置题型目录
//! 覆盖四种技能类型与多个题型族的题型定义；启动时一次性注册进题型注册表。
//! 每个定义携带生成 schema、批改 schema 与提示词构造能力。

pub mod modules;
pub mod prompts;

pub use modules::builtin_modules;

use crate::models::{
    ExerciseTypeDefinition, FieldKind, FieldSpec, SchemaDescriptor, SkillType,
};
use crate::services::registry::SchemaRegistry;

use prompts::ExercisePrompt;

/// 规范批改字段：各题型批改 schema 的公共前缀
fn canonical_marking_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::required("is_correct", FieldKind::Boolean, "whether the answer is correct"),
        FieldSpec::required("score", FieldKind::Number, "score from 0 to 100"),
        FieldSpec::required("feedback", FieldKind::String, "feedback for the learner"),
        FieldSpec::optional(
            "correct_answer",
            FieldKind::String,
            "the expected answer; empty when not applicable",
        ),
    ]
}

fn marking_schema(name: &str, extra: Vec<FieldSpec>) -> SchemaDescriptor {
    let mut fields = canonical_marking_fields();
    fields.extend(extra);
    SchemaDescriptor::new(name, fields)
}

fn choice_generation_schema(name: &str) -> SchemaDescriptor {
    SchemaDescriptor::new(
        name,
        vec![
            FieldSpec::required("question", FieldKind::String, "the sentence with the gap marked as _____"),
            FieldSpec::required("options", FieldKind::StringArray, "exactly 4 options"),
            FieldSpec::required("correct_index", FieldKind::Integer, "0-based index of the correct option"),
            FieldSpec::optional("explanation", FieldKind::String, "why the correct option is correct"),
        ],
    )
}

/// 全部内置题型定义
pub fn builtin_exercise_types() -> Vec<ExerciseTypeDefinition> {
    vec![
        ExerciseTypeDefinition::new(
            "multiple-choice",
            "multiple-choice",
            SkillType::Reading,
            choice_generation_schema("multiple-choice"),
            marking_schema(
                "multiple-choice-marking",
                vec![FieldSpec::optional(
                    "explanation",
                    FieldKind::String,
                    "grammar explanation of the correct option",
                )],
            ),
            ExercisePrompt::multiple_choice,
            ExercisePrompt::mark_choice,
        ),
        ExerciseTypeDefinition::new(
            "multiple-choice-full-word",
            "multiple-choice",
            SkillType::Reading,
            choice_generation_schema("multiple-choice-full-word"),
            marking_schema(
                "multiple-choice-full-word-marking",
                vec![FieldSpec::optional(
                    "explanation",
                    FieldKind::String,
                    "grammar explanation of the correct option",
                )],
            ),
            ExercisePrompt::multiple_choice_full_word,
            ExercisePrompt::mark_choice,
        ),
        ExerciseTypeDefinition::new(
            "fill-in-gap",
            "fill-in-gap",
            SkillType::Writing,
            SchemaDescriptor::new(
                "fill-in-gap",
                vec![
                    FieldSpec::required("sentence", FieldKind::String, "the sentence with one gap marked as ___"),
                    FieldSpec::required("answer", FieldKind::String, "the removed word"),
                    FieldSpec::optional("hint", FieldKind::String, "rule hint without revealing the answer"),
                ],
            ),
            marking_schema("fill-in-gap-marking", vec![]),
            ExercisePrompt::fill_in_gap,
            ExercisePrompt::mark_free_text,
        ),
        ExerciseTypeDefinition::new(
            "translate-to-target",
            "translation",
            SkillType::Writing,
            SchemaDescriptor::new(
                "translate-to-target",
                vec![
                    FieldSpec::required("source_sentence", FieldKind::String, "sentence in the source language"),
                    FieldSpec::required("reference_translation", FieldKind::String, "natural reference translation"),
                ],
            ),
            marking_schema(
                "translate-to-target-marking",
                vec![FieldSpec::optional(
                    "grammar_notes",
                    FieldKind::String,
                    "notes on grammar mistakes in the learner's translation",
                )],
            ),
            |context: &crate::models::GenerationContext| ExercisePrompt::translation(context, true),
            ExercisePrompt::mark_free_text,
        ),
        ExerciseTypeDefinition::new(
            "translate-from-target",
            "translation",
            SkillType::Writing,
            SchemaDescriptor::new(
                "translate-from-target",
                vec![
                    FieldSpec::required("target_sentence", FieldKind::String, "sentence in the target language"),
                    FieldSpec::required("reference_translation", FieldKind::String, "natural reference translation"),
                ],
            ),
            marking_schema("translate-from-target-marking", vec![]),
            |context: &crate::models::GenerationContext| ExercisePrompt::translation(context, false),
            ExercisePrompt::mark_free_text,
        ),
        ExerciseTypeDefinition::new(
            "listening-transcription",
            "listening-transcription",
            SkillType::Listening,
            SchemaDescriptor::new(
                "listening-transcription",
                vec![
                    FieldSpec::required("audio_text", FieldKind::String, "the text to synthesize and play"),
                    FieldSpec::optional("translation", FieldKind::String, "translation shown after answering"),
                ],
            ),
            marking_schema("listening-transcription-marking", vec![]),
            ExercisePrompt::listening_transcription,
            ExercisePrompt::mark_transcription,
        ),
        ExerciseTypeDefinition::new(
            "listening-multiple-choice",
            "listening-choice",
            SkillType::Listening,
            SchemaDescriptor::new(
                "listening-multiple-choice",
                vec![
                    FieldSpec::required("audio_text", FieldKind::String, "the audio text to synthesize and play"),
                    FieldSpec::required("question", FieldKind::String, "comprehension question about the audio"),
                    FieldSpec::required("options", FieldKind::StringArray, "exactly 4 options"),
                    FieldSpec::required("correct_index", FieldKind::Integer, "0-based index of the correct option"),
                ],
            ),
            marking_schema("listening-multiple-choice-marking", vec![]),
            ExercisePrompt::listening_multiple_choice,
            ExercisePrompt::mark_choice,
        ),
        ExerciseTypeDefinition::new(
            "speaking-prompt",
            "speaking-prompt",
            SkillType::Speaking,
            SchemaDescriptor::new(
                "speaking-prompt",
                vec![
                    FieldSpec::required("prompt_text", FieldKind::String, "what the learner should talk about"),
                    FieldSpec::required(
                        "expected_points",
                        FieldKind::StringArray,
                        "grammatical points a good response contains",
                    ),
                    FieldSpec::optional("sample_response", FieldKind::String, "one sample response"),
                ],
            ),
            marking_schema("speaking-prompt-marking", vec![]),
            ExercisePrompt::speaking_prompt,
            ExercisePrompt::mark_speaking,
        ),
        ExerciseTypeDefinition::new(
            "replace-error",
            "error-hunt",
            SkillType::Writing,
            error_hunt_generation_schema("replace-error"),
            marking_schema(
                "replace-error-marking",
                vec![FieldSpec::optional(
                    "located_index",
                    FieldKind::Integer,
                    "word index the learner pointed at",
                )],
            ),
            ExercisePrompt::error_hunt,
            ExercisePrompt::mark_error_hunt,
        ),
        ExerciseTypeDefinition::new(
            "confirm-error",
            "error-hunt",
            SkillType::Writing,
            error_hunt_generation_schema("confirm-error"),
            marking_schema("confirm-error-marking", vec![]),
            ExercisePrompt::error_hunt,
            ExercisePrompt::mark_error_hunt,
        ),
    ]
}

fn error_hunt_generation_schema(name: &str) -> SchemaDescriptor {
    SchemaDescriptor::new(
        name,
        vec![
            FieldSpec::required(
                "correct_sentence",
                FieldKind::String,
                "a grammatically correct sentence; errors are injected later by the engine",
            ),
            FieldSpec::optional(
                "focus",
                FieldKind::String,
                "which grammatical agreement the sentence showcases",
            ),
        ],
    )
}

/// 把内置题型注册进注册表
pub fn register_builtin(registry: &mut SchemaRegistry) {
    for definition in builtin_exercise_types() {
        registry.register(definition);
    }
}
