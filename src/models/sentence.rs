//! 句法结构数据模型
//! 外部句法分析器产出的 从句 → 短语成分 → 词元 三层树。
//! 错误注入服务总是在深拷贝上原位修改词元文本，原结构保留用于展示正确答案。

use serde::{Deserialize, Serialize};

/// 词元形态特征（语言相关，全部可选）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tense: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
}

/// 词元
///
/// `pos` 使用 Universal Dependencies 词性标签（DET/ADJ/NOUN/VERB/AUX/PUNCT 等）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    pub pos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<TokenFeatures>,
}

impl Token {
    pub fn new(text: &str, pos: &str) -> Self {
        Self {
            text: text.to_string(),
            lemma: None,
            pos: pos.to_string(),
            features: None,
        }
    }

    pub fn with_lemma(mut self, lemma: &str) -> Self {
        self.lemma = Some(lemma.to_string());
        self
    }

    pub fn with_features(mut self, features: TokenFeatures) -> Self {
        self.features = Some(features);
        self
    }
}

/// 短语成分：从句内一段连续、互不重叠的词元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    #[serde(rename = "type")]
    pub constituent_type: String,
    pub children: Vec<Token>,
}

impl Constituent {
    pub fn new(constituent_type: &str, children: Vec<Token>) -> Self {
        Self {
            constituent_type: constituent_type.to_string(),
            children,
        }
    }
}

/// 从句：有序短语成分序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    #[serde(rename = "type")]
    pub clause_type: String,
    pub constituents: Vec<Constituent>,
}

impl Clause {
    pub fn new(clause_type: &str, constituents: Vec<Constituent>) -> Self {
        Self {
            clause_type: clause_type.to_string(),
            constituents,
        }
    }
}

/// 句法结构
///
/// 不变式：每个词元恰属于一个短语成分，每个短语成分恰属于一个从句；
/// 按从句/成分顺序展平词元即得表层词序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceStructure {
    pub original_sentence: String,
    pub clauses: Vec<Clause>,
}

impl SentenceStructure {
    pub fn new(original_sentence: &str, clauses: Vec<Clause>) -> Self {
        Self {
            original_sentence: original_sentence.to_string(),
            clauses,
        }
    }

    /// 按表层词序展平所有词元
    pub fn flatten(&self) -> Vec<&Token> {
        self.clauses
            .iter()
            .flat_map(|clause| clause.constituents.iter())
            .flat_map(|constituent| constituent.children.iter())
            .collect()
    }

    pub fn token_count(&self) -> usize {
        self.flatten().len()
    }

    /// 重建表层句子：词元间以单个空格连接，前导标点前不加空格
    pub fn reconstruct(&self) -> String {
        let mut sentence = String::new();
        for token in self.flatten() {
            if !sentence.is_empty() && !is_leading_punctuation(&token.text) {
                sentence.push(' ');
            }
            sentence.push_str(&token.text);
        }
        sentence
    }
}

/// 附着在前一个词后面的标点
fn is_leading_punctuation(text: &str) -> bool {
    matches!(text, "." | "," | "!" | "?" | ";" | ":")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_sentence() -> SentenceStructure {
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

    #[test]
    fn test_flatten_preserves_surface_order() {
        let structure = simple_sentence();
        let words: Vec<&str> = structure.flatten().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["Die", "Katze", "trinkt", "Milch", "."]);
    }

    #[test]
    fn test_reconstruct_round_trip() {
        let structure = simple_sentence();
        assert_eq!(structure.reconstruct(), structure.original_sentence);
    }

    #[test]
    fn test_reconstruct_handles_inner_punctuation() {
        let structure = SentenceStructure::new(
            "Ja, das stimmt!",
            vec![Clause::new(
                "main",
                vec![
                    Constituent::new("interjection", vec![Token::new("Ja", "INTJ")]),
                    Constituent::new("punctuation", vec![Token::new(",", "PUNCT")]),
                    Constituent::new(
                        "clause-body",
                        vec![Token::new("das", "PRON"), Token::new("stimmt", "VERB")],
                    ),
                    Constituent::new("punctuation", vec![Token::new("!", "PUNCT")]),
                ],
            )],
        );
        assert_eq!(structure.reconstruct(), "Ja, das stimmt!");
    }

    #[test]
    fn test_multi_clause_flatten() {
        let structure = SentenceStructure::new(
            "Er sagt, dass sie kommt.",
            vec![
                Clause::new(
                    "main",
                    vec![Constituent::new(
                        "clause-body",
                        vec![Token::new("Er", "PRON"), Token::new("sagt", "VERB")],
                    )],
                ),
                Clause::new(
                    "subordinate",
                    vec![
                        Constituent::new("punctuation", vec![Token::new(",", "PUNCT")]),
                        Constituent::new(
                            "clause-body",
                            vec![
                                Token::new("dass", "SCONJ"),
                                Token::new("sie", "PRON"),
                                Token::new("kommt", "VERB"),
                            ],
                        ),
                        Constituent::new("punctuation", vec![Token::new(".", "PUNCT")]),
                    ],
                ),
            ],
        );
        assert_eq!(structure.token_count(), 8);
        assert_eq!(structure.reconstruct(), structure.original_sentence);
    }

    #[test]
    fn test_serde_round_trip_uses_type_keys() {
        let structure = simple_sentence();
        let json = serde_json::to_value(&structure).unwrap();
        assert_eq!(json["clauses"][0]["type"], "main");
        assert_eq!(json["clauses"][0]["constituents"][0]["type"], "noun-phrase");
        let back: SentenceStructure = serde_json::from_value(json).unwrap();
        assert_eq!(back, structure);
    }
}
