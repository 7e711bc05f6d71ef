//! lianxi-engine：自适应语言学习练习引擎
//! 选题 → AI 出题 → 作答 → AI 批改的核心子系统，外加语法错误注入。
//! UI 渲染、会话持久化、TTS/STT 均为外部协作方，只在接口边界出现。

pub mod engine;
pub mod error;
pub mod exercises;
pub mod models;
pub mod services;
pub mod utils;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult, ProviderError};
pub use models::{
    ExerciseTypeDefinition, GenerationResult, MarkingResult, ModuleDefinition, SentenceStructure,
    SessionRecord, SkillType, SubmoduleDefinition, VocabularyItem,
};
pub use services::{
    ErrorInjectionService, GenerationRequest, GrammarErrorType, InjectionRequest, InjectionResult,
    LlamaClient, LlamaConfig, MarkingRequest, MarkingService, PickRequest, PickedExercise,
    PickerStrategy, QuestionGenerationService, StaticVocabularyProvider,
    StratifiedRandomPicker, StructuredGenerationProvider, VocabularyProvider,
};
