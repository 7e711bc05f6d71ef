//! 内置语法模块目录
//! 德语学习部署的静态模块/子模块定义，启动时装入模块注册表

use serde_json::json;

use crate::models::{ModuleDefinition, SubmoduleDefinition};

/// 全部内置模块定义
pub fn builtin_modules() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition::new(
            "adjectives",
            "形容词",
            vec![
                SubmoduleDefinition::new(
                    "declension",
                    &["multiple-choice", "multiple-choice-full-word", "fill-in-gap"],
                )
                .with_context(
                    "German adjective declension: weak endings after definite articles, \
                     mixed endings after indefinite articles, strong endings without an article.",
                ),
                SubmoduleDefinition::new(
                    "comparison",
                    &["fill-in-gap", "multiple-choice", "translate-to-target"],
                )
                .with_context(
                    "Comparative and superlative forms: regular -er/-sten, umlaut changes \
                     (alt/älter), suppletive forms (gut/besser/am besten).",
                ),
            ],
        ),
        ModuleDefinition::new(
            "cases",
            "格",
            vec![
                SubmoduleDefinition::new(
                    "nominative-accusative",
                    &["multiple-choice", "fill-in-gap", "replace-error", "confirm-error"],
                )
                .with_context(
                    "Nominative subjects versus accusative direct objects; article changes \
                     der/den, ein/einen in the masculine.",
                ),
                SubmoduleDefinition::new(
                    "dative",
                    &["multiple-choice", "fill-in-gap", "translate-to-target"],
                )
                .with_context(
                    "Dative indirect objects, dative-only verbs (helfen, danken) and \
                     dative prepositions (mit, nach, aus, zu, von, bei, seit).",
                ),
            ],
        ),
        ModuleDefinition::new(
            "verbs",
            "动词",
            vec![
                SubmoduleDefinition::new(
                    "present-tense",
                    &[
                        "fill-in-gap",
                        "multiple-choice",
                        "speaking-prompt",
                        "listening-transcription",
                    ],
                )
                .with_context(
                    "Present-tense conjugation: regular endings, stem-vowel changes \
                     (fahren/fährt, lesen/liest) and the irregular verb sein.",
                ),
                SubmoduleDefinition::new(
                    "perfect-tense",
                    &["fill-in-gap", "translate-to-target", "listening-multiple-choice"],
                )
                .with_context(
                    "Perfect tense: haben or sein as auxiliary, regular ge-...-t and \
                     irregular ge-...-en participles, participle in final position.",
                ),
            ],
        ),
        ModuleDefinition::new(
            "sentence-structure",
            "语序",
            vec![SubmoduleDefinition::new(
                "word-order",
                &[
                    "replace-error",
                    "confirm-error",
                    "translate-to-target",
                    "listening-transcription",
                ],
            )
            .with_context(
                "Verb-second order in main clauses, verb-final order in subordinate \
                 clauses, time-manner-place ordering of adverbials.",
            )
            .with_override(
                "replace-error",
                json!({
                    "max_errors": 2,
                    "allowed_error_types": ["ARTICLE_ENDING", "VERB_CONJUGATION"],
                }),
            )],
        ),
    ]
}
