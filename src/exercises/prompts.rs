//! 题型提示词工程
//! 按题型族构造生成与批改提示词：编号要求、明确的 JSON 输出契约，
//! schema 字段说明由调用链在末尾统一拼接

use crate::models::{GenerationContext, MarkingContext};

pub struct ExercisePrompt;

impl ExercisePrompt {
    /// 难度等级对应的出题指示
    fn difficulty_instruction(difficulty: u32) -> &'static str {
        match difficulty {
            1 => "Use only very common vocabulary (A1) and short main-clause sentences",
            2 => "Use common vocabulary (A2) and simple sentences, one clause preferred",
            3 => "Use intermediate vocabulary (B1) and allow one subordinate clause",
            4 => "Use upper-intermediate vocabulary (B2), subordinate clauses and less frequent word forms",
            5 => "Use advanced vocabulary (C1), complex clause structure and rare constructions",
            _ => "Use vocabulary and sentence complexity appropriate for an intermediate learner",
        }
    }

    /// 所有生成提示词共享的任务头
    fn generation_header(context: &GenerationContext) -> String {
        let topic = context
            .submodule_context
            .as_deref()
            .unwrap_or("general usage of the grammar topic");
        let overrides = context
            .overrides
            .as_ref()
            .map(|value| format!("\n## Extra constraints:\n{}", value))
            .unwrap_or_default();

        format!(
            r#"You are an expert language teacher creating exercises for learners of {target} (instructions shown to the learner are in {source}).

## Grammar topic ({module}/{submodule}):
{topic}

## Difficulty level: {difficulty}
{difficulty_instruction}{overrides}"#,
            target = context.target_language,
            source = context.source_language,
            module = context.module_id,
            submodule = context.submodule_id,
            topic = topic,
            difficulty = context.difficulty,
            difficulty_instruction = Self::difficulty_instruction(context.difficulty),
            overrides = overrides,
        )
    }

    pub fn multiple_choice(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one multiple-choice question that tests the grammar topic above.

## Requirements:
1. The question shows a sentence with one gap marked as _____
2. Provide exactly 4 options; only one is grammatically correct in the gap
3. Each distractor must be a real word form, plausible but wrong for this sentence
4. Distractors target typical learner mistakes for this topic
5. Vary the position of the correct option; do not always use index 0"#,
            Self::generation_header(context)
        )
    }

    pub fn multiple_choice_full_word(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one multiple-choice question where the learner picks the complete word (not just an ending).

## Requirements:
1. The question shows a sentence with one gap marked as _____
2. Provide exactly 4 options, each a complete word form of the same lexeme
3. Only one option fits the gap grammatically
4. Distractors differ from the answer in ending, case, gender or number
5. Vary the position of the correct option; do not always use index 0"#,
            Self::generation_header(context)
        )
    }

    pub fn fill_in_gap(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one fill-in-the-gap exercise for the grammar topic above.

## Requirements:
1. Write a natural sentence and replace exactly one word with ___
2. The removed word must be determined by the grammar topic, not by vocabulary knowledge
3. Provide the removed word as the answer
4. Provide a short hint that points to the rule without revealing the answer"#,
            Self::generation_header(context)
        )
    }

    pub fn translation(context: &GenerationContext, to_target: bool) -> String {
        let direction = if to_target {
            format!(
                "from {} into {}",
                context.source_language, context.target_language
            )
        } else {
            format!(
                "from {} into {}",
                context.target_language, context.source_language
            )
        };
        format!(
            r#"{}

## Task:
Create one translation exercise {}.

## Requirements:
1. The sentence must exercise the grammar topic above
2. Keep the sentence self-contained, no surrounding context needed
3. Provide one natural reference translation
4. Avoid idioms that cannot be translated literally"#,
            Self::generation_header(context),
            direction
        )
    }

    pub fn listening_transcription(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one listening transcription exercise. The audio text will be synthesized and played to the learner, who types what they hear.

## Requirements:
1. Write one sentence in {} exercising the grammar topic above
2. The sentence must be unambiguous when heard (no homophone-only distinctions)
3. Keep it short enough to hold in working memory at this difficulty
4. Provide a translation for feedback display"#,
            Self::generation_header(context),
            context.target_language
        )
    }

    pub fn listening_multiple_choice(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one listening comprehension question. The audio text is played, then the learner answers a multiple-choice question about it.

## Requirements:
1. Write a short audio text (1-2 sentences) in {}
2. Ask one comprehension question about the audio in {}
3. Provide exactly 4 options with one correct answer
4. Distractors must be wrong based on the audio content, not general knowledge"#,
            Self::generation_header(context),
            context.target_language,
            context.source_language
        )
    }

    pub fn speaking_prompt(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Create one speaking exercise. The learner sees a prompt and records a spoken response, which is transcribed for marking.

## Requirements:
1. The prompt asks the learner to say 1-2 sentences in {}
2. Responding naturally requires using the grammar topic above
3. List the grammatical points a good response must contain
4. Provide one sample response"#,
            Self::generation_header(context),
            context.target_language
        )
    }

    pub fn error_hunt(context: &GenerationContext) -> String {
        format!(
            r#"{}

## Task:
Write one grammatically CORRECT sentence that a grammar-error exercise will later be built from.

## Requirements:
1. The sentence is in {} and exercises the grammar topic above
2. It must contain at least one article, one noun and one conjugated verb
3. Every word must be in its correct form; the error is injected later by the system
4. Describe in one phrase which grammatical agreement the sentence showcases"#,
            Self::generation_header(context),
            context.target_language
        )
    }

    /// 所有批改提示词共享的任务头
    fn marking_header(context: &MarkingContext) -> String {
        let extra = context
            .context
            .as_deref()
            .map(|c| format!("\n## Additional context:\n{}", c))
            .unwrap_or_default();
        format!(
            r#"You are an expert language teacher marking a learner's answer.

## Exercise data:
{}

## Learner's answer:
{}{}"#,
            serde_json::to_string_pretty(&context.question_data)
                .unwrap_or_else(|_| context.question_data.to_string()),
            context.user_answer,
            extra,
        )
    }

    pub fn mark_choice(context: &MarkingContext) -> String {
        format!(
            r#"{}

## Marking rules:
1. The answer is the index of the chosen option; compare it with the correct option
2. A correct choice scores 100, an incorrect choice scores 0
3. Feedback explains why the correct option fits the gap grammatically
4. Put the correct option's text into correct_answer"#,
            Self::marking_header(context)
        )
    }

    pub fn mark_free_text(context: &MarkingContext) -> String {
        format!(
            r#"{}

## Marking rules:
1. Judge grammatical correctness first, word choice second; ignore capitalization of the first letter
2. Score 100 for a fully correct answer, partial credit (10-90) for minor slips, 0 for a wrong grammar form
3. is_correct is true only for scores of 70 and above
4. Feedback names the specific grammar rule involved, in one or two sentences
5. Put the expected answer into correct_answer"#,
            Self::marking_header(context)
        )
    }

    pub fn mark_transcription(context: &MarkingContext) -> String {
        format!(
            r#"{}

## Marking rules:
1. Compare the transcription with the audio text word by word
2. Ignore punctuation and capitalization differences
3. Score by the fraction of words transcribed correctly (0-100)
4. is_correct is true only when every word matches
5. Put the audio text into correct_answer"#,
            Self::marking_header(context)
        )
    }

    pub fn mark_speaking(context: &MarkingContext) -> String {
        format!(
            r#"{}

## Marking rules:
1. The answer is a transcript of the learner's speech; judge content and grammar, not pronunciation
2. Check that the expected grammatical points are present
3. Score 100 when all expected points are used correctly, partial credit otherwise
4. is_correct is true for scores of 70 and above
5. Put the sample response into correct_answer"#,
            Self::marking_header(context)
        )
    }

    pub fn mark_error_hunt(context: &MarkingContext) -> String {
        format!(
            r#"{}

## Marking rules:
1. The exercise data lists the errors that were injected into the sentence
2. An answer of "no-error" is correct only if the errors list is empty
3. An answer of {{index, correction}} is correct when it locates an injected error and supplies the right form
4. Score 100 for a full correction, 50 for locating without correcting, 0 otherwise
5. Put the corrected sentence into correct_answer"#,
            Self::marking_header(context)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generation_context() -> GenerationContext {
        GenerationContext {
            module_id: "adjectives".to_string(),
            submodule_id: "declension".to_string(),
            submodule_context: Some("Adjective endings after definite articles".to_string()),
            overrides: None,
            target_language: "German".to_string(),
            source_language: "English".to_string(),
            difficulty: 3,
        }
    }

    #[test]
    fn test_generation_header_carries_topic_and_difficulty() {
        let prompt = ExercisePrompt::multiple_choice(&generation_context());
        assert!(prompt.contains("Adjective endings after definite articles"));
        assert!(prompt.contains("Difficulty level: 3"));
        assert!(prompt.contains("learners of German"));
    }

    #[test]
    fn test_overrides_are_rendered_when_present() {
        let mut context = generation_context();
        context.overrides = Some(json!({"option_count": 3}));
        let prompt = ExercisePrompt::fill_in_gap(&context);
        assert!(prompt.contains("Extra constraints"));
        assert!(prompt.contains("option_count"));
    }

    #[test]
    fn test_translation_direction() {
        let context = generation_context();
        let to_target = ExercisePrompt::translation(&context, true);
        assert!(to_target.contains("from English into German"));
        let from_target = ExercisePrompt::translation(&context, false);
        assert!(from_target.contains("from German into English"));
    }

    #[test]
    fn test_marking_header_embeds_question_and_answer() {
        let context = MarkingContext {
            question_data: json!({"sentence": "Der ___ Hund", "answer": "kleine"}),
            user_answer: json!("kleines"),
            context: Some("declension drill".to_string()),
        };
        let prompt = ExercisePrompt::mark_free_text(&context);
        assert!(prompt.contains("Der ___ Hund"));
        assert!(prompt.contains("kleines"));
        assert!(prompt.contains("declension drill"));
    }

    #[test]
    fn test_error_hunt_requests_correct_sentence() {
        let prompt = ExercisePrompt::error_hunt(&generation_context());
        assert!(prompt.contains("grammatically CORRECT sentence"));
    }
}
