//! 词汇服务模块
//! 内置静态词表实现：按语言无放回抽样，未知语言返回空列表（退化情形而非错误）

use std::collections::HashMap;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::ProviderError;
use crate::models::VocabularyItem;
use crate::services::provider::VocabularyProvider;

/// 静态词表词汇服务
pub struct StaticVocabularyProvider {
    word_lists: HashMap<String, Vec<VocabularyItem>>,
}

impl StaticVocabularyProvider {
    pub fn new() -> Self {
        Self {
            word_lists: HashMap::new(),
        }
    }

    /// 带内置词表的实例（德语学习部署的默认词表）
    pub fn with_builtin_lists() -> Self {
        let mut provider = Self::new();
        provider.add_language("de", builtin_german_words());
        provider.add_language("en", builtin_english_words());
        provider
    }

    pub fn add_language(&mut self, language: &str, items: Vec<VocabularyItem>) {
        self.word_lists.insert(language.to_string(), items);
    }
}

impl Default for StaticVocabularyProvider {
    fn default() -> Self {
        Self::with_builtin_lists()
    }
}

#[async_trait]
impl VocabularyProvider for StaticVocabularyProvider {
    async fn sample(
        &self,
        language: &str,
        limit: usize,
    ) -> Result<Vec<VocabularyItem>, ProviderError> {
        let list = match self.word_lists.get(language) {
            Some(list) => list,
            None => return Ok(Vec::new()),
        };

        let mut shuffled = list.clone();
        shuffled.shuffle(&mut thread_rng());
        shuffled.truncate(limit);
        Ok(shuffled)
    }
}

fn builtin_german_words() -> Vec<VocabularyItem> {
    [
        ("der Apfel", "apple"),
        ("das Haus", "house"),
        ("der Hund", "dog"),
        ("die Katze", "cat"),
        ("die Milch", "milk"),
        ("das Wasser", "water"),
        ("das Brot", "bread"),
        ("die Stadt", "city"),
        ("der Garten", "garden"),
        ("die Schule", "school"),
        ("das Buch", "book"),
        ("der Freund", "friend"),
        ("trinken", "to drink"),
        ("laufen", "to run"),
        ("arbeiten", "to work"),
        ("spielen", "to play"),
        ("schnell", "fast"),
        ("schön", "beautiful"),
        ("müde", "tired"),
        ("glücklich", "happy"),
    ]
    .iter()
    .map(|(word, translation)| VocabularyItem::new(word).with_translation(translation))
    .collect()
}

fn builtin_english_words() -> Vec<VocabularyItem> {
    [
        "apple", "house", "dog", "cat", "milk", "water", "bread", "city", "garden", "school",
        "book", "friend", "drink", "run", "work", "play", "fast", "beautiful", "tired", "happy",
    ]
    .iter()
    .map(|word| VocabularyItem::new(word))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_language_yields_empty() {
        let provider = StaticVocabularyProvider::with_builtin_lists();
        let items = provider.sample("fi", 3).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_sample_respects_limit() {
        let provider = StaticVocabularyProvider::with_builtin_lists();
        let items = provider.sample("de", 5).await.unwrap();
        assert_eq!(items.len(), 5);
    }

    #[tokio::test]
    async fn test_sample_is_without_replacement() {
        let provider = StaticVocabularyProvider::with_builtin_lists();
        let items = provider.sample("de", 20).await.unwrap();
        let mut words: Vec<&str> = items.iter().map(|i| i.word.as_str()).collect();
        words.sort_unstable();
        words.dedup();
        assert_eq!(words.len(), 20);
    }

    #[tokio::test]
    async fn test_limit_larger_than_list() {
        let mut provider = StaticVocabularyProvider::new();
        provider.add_language("de", vec![VocabularyItem::new("das Haus")]);
        let items = provider.sample("de", 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
