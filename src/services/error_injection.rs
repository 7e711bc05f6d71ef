//! 语法错误注入服务模块
//! 在语法正确的句法树深拷贝上定位候选错误位置，无偏随机排列后逐个请求 AI
//! 生成貌似合理的错误形式，原位替换词元文本并重建表层句子。
//! 原结构始终不动，留给「查看正确版本」反馈使用。

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::models::{FieldKind, FieldSpec, SchemaDescriptor, SentenceStructure};
use crate::services::provider::StructuredGenerationProvider;

/// 语法错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrammarErrorType {
    AdjectiveEnding,
    ArticleEnding,
    NounCase,
    VerbConjugation,
}

impl GrammarErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrammarErrorType::AdjectiveEnding => "ADJECTIVE_ENDING",
            GrammarErrorType::ArticleEnding => "ARTICLE_ENDING",
            GrammarErrorType::NounCase => "NOUN_CASE",
            GrammarErrorType::VerbConjugation => "VERB_CONJUGATION",
        }
    }

    /// 词性标签到错误类别的映射（UD 标签）
    pub fn from_pos(pos: &str) -> Option<Self> {
        match pos {
            "ADJ" => Some(GrammarErrorType::AdjectiveEnding),
            "DET" => Some(GrammarErrorType::ArticleEnding),
            "NOUN" => Some(GrammarErrorType::NounCase),
            "VERB" | "AUX" => Some(GrammarErrorType::VerbConjugation),
            _ => None,
        }
    }

    /// 提示词里对该错误类别的说明
    fn prompt_instruction(&self) -> &'static str {
        match self {
            GrammarErrorType::AdjectiveEnding => {
                "Change ONLY the adjective ending so it no longer agrees with the noun it modifies (wrong case, gender or number ending). Keep the adjective stem."
            }
            GrammarErrorType::ArticleEnding => {
                "Replace the article/determiner with a form that does not agree with its noun (wrong gender, case or number). Keep it a real article form."
            }
            GrammarErrorType::NounCase => {
                "Replace the noun with a form in the wrong grammatical case or number (for example a dative form where an accusative is required)."
            }
            GrammarErrorType::VerbConjugation => {
                "Replace the verb with a conjugation that does not agree with its subject (wrong person or number) or an incorrect tense form."
            }
        }
    }
}

impl std::fmt::Display for GrammarErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注入请求
#[derive(Debug, Clone)]
pub struct InjectionRequest {
    pub sentence_structure: SentenceStructure,
    pub allowed_error_types: Vec<GrammarErrorType>,
    /// 成功变异次数上限；同形跳过不计数
    pub max_errors: usize,
    pub language: String,
}

/// 已注入的错误记录（界面解释错因、批改核对标准答案都靠它）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedError {
    pub error_type: GrammarErrorType,
    pub original_text: String,
    pub modified_text: String,
}

/// 注入结果
#[derive(Debug, Clone)]
pub struct InjectionResult {
    pub modified_structure: SentenceStructure,
    pub presented_sentence: String,
    pub errors_introduced: Vec<InjectedError>,
}

/// 候选位置的词元上下文
#[derive(Debug, Clone)]
struct TokenContext {
    preceding_text: Option<String>,
    /// 同一短语成分内可定位的支配名词
    governing_noun: Option<String>,
    constituent_type: String,
}

/// 候选错误位置：索引路径指向克隆树中的词元
#[derive(Debug, Clone)]
struct CandidateSite {
    error_type: GrammarErrorType,
    clause_idx: usize,
    constituent_idx: usize,
    token_idx: usize,
    context: TokenContext,
}

/// 错误注入服务
pub struct ErrorInjectionService {
    provider: Arc<dyn StructuredGenerationProvider>,
}

impl ErrorInjectionService {
    pub fn new(provider: Arc<dyn StructuredGenerationProvider>) -> Self {
        Self { provider }
    }

    pub async fn inject_errors(&self, request: &InjectionRequest) -> InjectionResult {
        // ThreadRng 不是 Send，跨 await 持有要用 StdRng
        let mut rng = StdRng::from_entropy();
        self.inject_with_rng(request, &mut rng).await
    }

    /// 注入随机源的实现，测试时用种子化 RNG
    pub async fn inject_with_rng<R: Rng + Send>(
        &self,
        request: &InjectionRequest,
        rng: &mut R,
    ) -> InjectionResult {
        // 深拷贝后只在拷贝上原位修改
        let mut cloned = request.sentence_structure.clone();

        let mut candidates = collect_candidates(&cloned, &request.allowed_error_types);
        // Fisher–Yates 无偏排列，打散错误类别与位置的聚集
        candidates.shuffle(rng);

        let mut errors_introduced = Vec::new();

        for candidate in candidates {
            if errors_introduced.len() >= request.max_errors {
                break;
            }

            let original_text = cloned.clauses[candidate.clause_idx].constituents
                [candidate.constituent_idx]
                .children[candidate.token_idx]
                .text
                .clone();

            // 后续候选的提示词要反映已注入的变异，避免互相冲突
            let current_sentence = cloned.reconstruct();

            let replacement = match self
                .request_error_form(&current_sentence, &original_text, &candidate, &request.language)
                .await
            {
                Ok(replacement) => replacement,
                Err(e) => {
                    // 单个候选不重试，跳到下一个
                    log::debug!(
                        "candidate {} at token \"{}\" skipped after provider error: {}",
                        candidate.error_type,
                        original_text,
                        e
                    );
                    continue;
                }
            };

            let replacement = replacement.trim().to_string();
            if replacement.is_empty() || replacement == original_text {
                // 模型判定该位置没有合适的错误形式，跳过且不计入 max_errors
                log::debug!(
                    "no applicable incorrect form for \"{}\" ({})",
                    original_text,
                    candidate.error_type
                );
                continue;
            }

            let token = &mut cloned.clauses[candidate.clause_idx].constituents
                [candidate.constituent_idx]
                .children[candidate.token_idx];
            token.text = replacement.clone();

            log::debug!(
                "injected {}: \"{}\" -> \"{}\"",
                candidate.error_type,
                original_text,
                replacement
            );
            errors_introduced.push(InjectedError {
                error_type: candidate.error_type,
                original_text,
                modified_text: replacement,
            });
        }

        let presented_sentence = cloned.reconstruct();
        InjectionResult {
            modified_structure: cloned,
            presented_sentence,
            errors_introduced,
        }
    }

    /// 请求一个貌似合理的错误形式
    async fn request_error_form(
        &self,
        sentence: &str,
        token_text: &str,
        candidate: &CandidateSite,
        language: &str,
    ) -> Result<String, ProviderError> {
        let prompt = build_error_prompt(sentence, token_text, candidate, language);
        let schema = error_word_schema();
        let value = self.provider.generate(&prompt, &schema).await?;
        value
            .get("incorrect_form")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ProviderError::MalformedOutput("missing incorrect_form field".to_string())
            })
    }
}

/// 错误词 schema：单个字符串字段
fn error_word_schema() -> SchemaDescriptor {
    SchemaDescriptor::new(
        "error-word",
        vec![FieldSpec::required(
            "incorrect_form",
            FieldKind::String,
            "the grammatically incorrect replacement; return the original word unchanged if no incorrect form applies",
        )],
    )
}

/// 遍历 从句 → 成分 → 词元 收集候选错误位置
fn collect_candidates(
    structure: &SentenceStructure,
    allowed: &[GrammarErrorType],
) -> Vec<CandidateSite> {
    let mut candidates = Vec::new();
    let mut preceding_text: Option<String> = None;

    for (clause_idx, clause) in structure.clauses.iter().enumerate() {
        for (constituent_idx, constituent) in clause.constituents.iter().enumerate() {
            let governing_noun = constituent
                .children
                .iter()
                .find(|t| t.pos == "NOUN")
                .map(|t| t.text.clone());

            for (token_idx, token) in constituent.children.iter().enumerate() {
                if let Some(error_type) = GrammarErrorType::from_pos(&token.pos) {
                    if allowed.contains(&error_type) {
                        candidates.push(CandidateSite {
                            error_type,
                            clause_idx,
                            constituent_idx,
                            token_idx,
                            context: TokenContext {
                                preceding_text: preceding_text.clone(),
                                governing_noun: governing_noun.clone(),
                                constituent_type: constituent.constituent_type.clone(),
                            },
                        });
                    }
                }
                preceding_text = Some(token.text.clone());
            }
        }
    }

    candidates
}

/// 构造错误词生成提示词
fn build_error_prompt(
    sentence: &str,
    token_text: &str,
    candidate: &CandidateSite,
    language: &str,
) -> String {
    let preceding = candidate
        .context
        .preceding_text
        .as_deref()
        .unwrap_or("(sentence start)");
    let governing = candidate
        .context
        .governing_noun
        .as_deref()
        .unwrap_or("(none located)");

    format!(
        r#"You are an expert {} teacher designing an error-spotting exercise. Introduce exactly one grammatical error into a sentence by replacing one word.

## Sentence:
{}

## Target word: "{}"

## Context:
- Preceding word: {}
- Governing noun in the same phrase: {}
- Phrase category: {}

## Error category: {}
{}

## Requirements:
1. The replacement must be grammatically INCORRECT in this sentence but look plausible to a learner
2. It must be a real word form of the same lexeme or word class, not gibberish
3. Replace only the target word; do not touch the rest of the sentence
4. If no incorrect form of this category applies to the target word, return the target word unchanged"#,
        language,
        sentence,
        token_text,
        preceding,
        governing,
        candidate.context.constituent_type,
        candidate.error_type.as_str(),
        candidate.error_type.prompt_instruction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Clause, Constituent, Token};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use regex::Regex;
    use serde_json::json;
    use std::collections::HashMap;

    /// 按映射表替换目标词的桩服务，映射外的词原样返回
    struct MapProvider {
        replacements: HashMap<String, String>,
    }

    impl MapProvider {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                replacements: pairs
                    .iter()
                    .map(|(from, to)| (from.to_string(), to.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl StructuredGenerationProvider for MapProvider {
        async fn generate(
            &self,
            prompt: &str,
            _schema: &SchemaDescriptor,
        ) -> Result<Value, ProviderError> {
            let target = Regex::new(r#"## Target word: "([^"]+)""#)
                .unwrap()
                .captures(prompt)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| ProviderError::MalformedOutput("no target word".to_string()))?;
            let replacement = self.replacements.get(&target).cloned().unwrap_or(target);
            Ok(json!({ "incorrect_form": replacement }))
        }
    }

    struct AlwaysFailProvider;

    #[async_trait]
    impl StructuredGenerationProvider for AlwaysFailProvider {
        async fn generate(
            &self,
            _prompt: &str,
            _schema: &SchemaDescriptor,
        ) -> Result<Value, ProviderError> {
            Err(ProviderError::Transport("connection refused".to_string()))
        }
    }

    fn cat_sentence() -> SentenceStructure {
        SentenceStructure::new(
            "Die Katze trinkt Milch.",
            vec![Clause::new(
                "main",
                vec![
                    Constituent::new(
                        "noun-phrase",
                        vec![Token::new("Die", "DET"), Token::new("Katze", "NOUN")],
                    ),
                    Constituent::new("verb-phrase", vec![Token::new("trinkt", "VERB")]),
                    Constituent::new("noun-phrase", vec![Token::new("Milch", "NOUN")]),
                    Constituent::new("punctuation", vec![Token::new(".", "PUNCT")]),
                ],
            )],
        )
    }

    fn request(
        structure: SentenceStructure,
        allowed: Vec<GrammarErrorType>,
        max_errors: usize,
    ) -> InjectionRequest {
        InjectionRequest {
            sentence_structure: structure,
            allowed_error_types: allowed,
            max_errors,
            language: "German".to_string(),
        }
    }

    #[tokio::test]
    async fn test_article_ending_scenario() {
        let service = ErrorInjectionService::new(Arc::new(MapProvider::new(&[("Die", "Der")])));
        let mut rng = StdRng::seed_from_u64(1);

        let result = service
            .inject_with_rng(
                &request(cat_sentence(), vec![GrammarErrorType::ArticleEnding], 1),
                &mut rng,
            )
            .await;

        assert_eq!(result.presented_sentence, "Der Katze trinkt Milch.");
        assert_eq!(
            result.errors_introduced,
            vec![InjectedError {
                error_type: GrammarErrorType::ArticleEnding,
                original_text: "Die".to_string(),
                modified_text: "Der".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_original_structure_is_untouched() {
        let service = ErrorInjectionService::new(Arc::new(MapProvider::new(&[("Die", "Der")])));
        let req = request(cat_sentence(), vec![GrammarErrorType::ArticleEnding], 1);
        let snapshot = req.sentence_structure.clone();

        let result = service.inject_errors(&req).await;

        assert_eq!(req.sentence_structure, snapshot);
        assert_ne!(result.modified_structure, snapshot);
    }

    #[tokio::test]
    async fn test_max_errors_zero_is_a_noop_clone() {
        let service = ErrorInjectionService::new(Arc::new(AlwaysFailProvider));
        let req = request(
            cat_sentence(),
            vec![
                GrammarErrorType::ArticleEnding,
                GrammarErrorType::NounCase,
                GrammarErrorType::VerbConjugation,
            ],
            0,
        );

        let result = service.inject_errors(&req).await;

        assert!(result.errors_introduced.is_empty());
        assert_eq!(result.modified_structure, req.sentence_structure);
        assert_eq!(result.presented_sentence, "Die Katze trinkt Milch.");
    }

    #[tokio::test]
    async fn test_no_candidates_is_a_degenerate_success() {
        let service = ErrorInjectionService::new(Arc::new(AlwaysFailProvider));
        // 句中没有形容词，请求的类别找不到任何候选
        let req = request(cat_sentence(), vec![GrammarErrorType::AdjectiveEnding], 2);

        let result = service.inject_errors(&req).await;

        assert!(result.errors_introduced.is_empty());
        assert_eq!(result.modified_structure, req.sentence_structure);
    }

    #[tokio::test]
    async fn test_same_text_reply_skips_without_consuming_budget() {
        // 模型对冠词返回原词（判定无错误可注入），对名词给出错误形式；
        // 预算 1 时应最终落在名词上而不是白白耗尽
        let service = ErrorInjectionService::new(Arc::new(MapProvider::new(&[
            ("Milch", "Milche"),
            ("Katze", "Katzen"),
        ])));
        let mut rng = StdRng::seed_from_u64(3);

        let result = service
            .inject_with_rng(
                &request(
                    cat_sentence(),
                    vec![GrammarErrorType::ArticleEnding, GrammarErrorType::NounCase],
                    1,
                ),
                &mut rng,
            )
            .await;

        assert_eq!(result.errors_introduced.len(), 1);
        assert_eq!(
            result.errors_introduced[0].error_type,
            GrammarErrorType::NounCase
        );
    }

    #[tokio::test]
    async fn test_provider_failure_skips_candidate() {
        let service = ErrorInjectionService::new(Arc::new(AlwaysFailProvider));
        let req = request(
            cat_sentence(),
            vec![GrammarErrorType::ArticleEnding, GrammarErrorType::VerbConjugation],
            2,
        );

        let result = service.inject_errors(&req).await;

        assert!(result.errors_introduced.is_empty());
        assert_eq!(result.presented_sentence, "Die Katze trinkt Milch.");
    }

    #[tokio::test]
    async fn test_mutation_cap_is_respected() {
        let service = ErrorInjectionService::new(Arc::new(MapProvider::new(&[
            ("Die", "Der"),
            ("Katze", "Katzen"),
            ("Milch", "Milche"),
            ("trinkt", "trinken"),
        ])));
        let mut rng = StdRng::seed_from_u64(9);

        let result = service
            .inject_with_rng(
                &request(
                    cat_sentence(),
                    vec![
                        GrammarErrorType::ArticleEnding,
                        GrammarErrorType::NounCase,
                        GrammarErrorType::VerbConjugation,
                    ],
                    2,
                ),
                &mut rng,
            )
            .await;

        assert_eq!(result.errors_introduced.len(), 2);
        // 每条记录的错误形式都出现在重建句子里
        for error in &result.errors_introduced {
            assert!(result.presented_sentence.contains(&error.modified_text));
        }
    }

    #[test]
    fn test_error_type_serde_and_pos_mapping() {
        assert_eq!(
            serde_json::to_string(&GrammarErrorType::ArticleEnding).unwrap(),
            "\"ARTICLE_ENDING\""
        );
        let parsed: GrammarErrorType = serde_json::from_str("\"VERB_CONJUGATION\"").unwrap();
        assert_eq!(parsed, GrammarErrorType::VerbConjugation);

        assert_eq!(
            GrammarErrorType::from_pos("ADJ"),
            Some(GrammarErrorType::AdjectiveEnding)
        );
        assert_eq!(
            GrammarErrorType::from_pos("AUX"),
            Some(GrammarErrorType::VerbConjugation)
        );
        assert_eq!(GrammarErrorType::from_pos("PUNCT"), None);
    }

    #[test]
    fn test_collect_candidates_context() {
        let structure = SentenceStructure::new(
            "Der kleine Hund schläft.",
            vec![Clause::new(
                "main",
                vec![
                    Constituent::new(
                        "noun-phrase",
                        vec![
                            Token::new("Der", "DET"),
                            Token::new("kleine", "ADJ"),
                            Token::new("Hund", "NOUN"),
                        ],
                    ),
                    Constituent::new("verb-phrase", vec![Token::new("schläft", "VERB")]),
                    Constituent::new("punctuation", vec![Token::new(".", "PUNCT")]),
                ],
            )],
        );

        let candidates = collect_candidates(
            &structure,
            &[
                GrammarErrorType::AdjectiveEnding,
                GrammarErrorType::ArticleEnding,
                GrammarErrorType::NounCase,
                GrammarErrorType::VerbConjugation,
            ],
        );

        assert_eq!(candidates.len(), 4);

        // 形容词候选：前词是冠词，支配名词在同一成分内
        let adjective = candidates
            .iter()
            .find(|c| c.error_type == GrammarErrorType::AdjectiveEnding)
            .unwrap();
        assert_eq!(adjective.context.preceding_text.as_deref(), Some("Der"));
        assert_eq!(adjective.context.governing_noun.as_deref(), Some("Hund"));
        assert_eq!(adjective.context.constituent_type, "noun-phrase");

        // 句首冠词没有前词
        let article = candidates
            .iter()
            .find(|c| c.error_type == GrammarErrorType::ArticleEnding)
            .unwrap();
        assert!(article.context.preceding_text.is_none());

        // 动词所在成分没有名词
        let verb = candidates
            .iter()
            .find(|c| c.error_type == GrammarErrorType::VerbConjugation)
            .unwrap();
        assert!(verb.context.governing_noun.is_none());
        assert_eq!(verb.context.preceding_text.as_deref(), Some("Hund"));
    }

    #[test]
    fn test_shuffle_is_an_unbiased_permutation() {
        // 3 个候选（Die、Katze、Milch）的 6 种排列在大量洗牌下应接近均匀
        let structure = cat_sentence();
        let allowed = [GrammarErrorType::ArticleEnding, GrammarErrorType::NounCase];
        let mut rng = StdRng::seed_from_u64(17);
        let mut permutation_counts: HashMap<Vec<(usize, usize)>, u32> = HashMap::new();
        let rounds = 6000;

        for _ in 0..rounds {
            let mut candidates = collect_candidates(&structure, &allowed);
            candidates.shuffle(&mut rng);
            let order: Vec<(usize, usize)> = candidates
                .iter()
                .map(|c| (c.constituent_idx, c.token_idx))
                .collect();
            *permutation_counts.entry(order).or_insert(0) += 1;
        }

        assert_eq!(permutation_counts.len(), 6);
        for (order, count) in &permutation_counts {
            let share = *count as f64 / rounds as f64;
            assert!(
                (0.12..=0.22).contains(&share),
                "permutation {:?} share {}",
                order,
                share
            );
        }
    }
}
