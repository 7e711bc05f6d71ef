//! 引擎装配模块
//! 显式的进程级状态对象：启动时构建两张注册表并装配各服务，
//! 引用显式传入，不依赖导入期单例或惰性初始化守卫。

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::error::EngineResult;
use crate::exercises;
use crate::models::{
    ExerciseTypeDefinition, GenerationResult, MarkingResult, ModuleDefinition, SessionRecord,
};
use crate::services::error_injection::{ErrorInjectionService, InjectionRequest, InjectionResult};
use crate::services::generation::{GenerationRequest, QuestionGenerationService};
use crate::services::marking::{MarkingRequest, MarkingService};
use crate::services::picker::{PickRequest, PickedExercise, PickerStrategy, StratifiedRandomPicker};
use crate::services::provider::{StructuredGenerationProvider, VocabularyProvider};
use crate::services::registry::{ModuleRegistry, SchemaRegistry};

/// 引擎启动配置
pub struct EngineConfig {
    pub exercise_types: Vec<ExerciseTypeDefinition>,
    pub modules: Vec<ModuleDefinition>,
}

impl Default for EngineConfig {
    /// 内置题型与模块目录
    fn default() -> Self {
        Self {
            exercise_types: exercises::builtin_exercise_types(),
            modules: exercises::builtin_modules(),
        }
    }
}

/// 练习引擎
///
/// 注册表在 bootstrap 时填充完毕，此后只读，可被并发调用无锁共享；
/// 每次操作都是一个独立的同步事务，服务之间不共享可变状态。
pub struct Engine {
    schemas: Arc<SchemaRegistry>,
    modules: Arc<ModuleRegistry>,
    picker: Box<dyn PickerStrategy>,
    generation: QuestionGenerationService,
    marking: MarkingService,
    error_injection: ErrorInjectionService,
}

impl Engine {
    /// 装配引擎：注册题型、装载模块目录、接线各服务
    ///
    /// 模块目录为空时启动失败。
    pub fn bootstrap(
        config: EngineConfig,
        provider: Arc<dyn StructuredGenerationProvider>,
        vocabulary: Arc<dyn VocabularyProvider>,
    ) -> EngineResult<Self> {
        let mut schema_registry = SchemaRegistry::new();
        for definition in config.exercise_types {
            schema_registry.register(definition);
        }
        let schemas = Arc::new(schema_registry);
        let modules = Arc::new(ModuleRegistry::load(config.modules)?);

        log::info!(
            "engine bootstrapped: {} exercise types, {} modules",
            schemas.len(),
            modules.module_ids().len()
        );

        Ok(Self {
            schemas: schemas.clone(),
            modules: modules.clone(),
            picker: Box::new(StratifiedRandomPicker::new()),
            generation: QuestionGenerationService::new(
                schemas.clone(),
                modules.clone(),
                provider.clone(),
                vocabulary,
            ),
            marking: MarkingService::new(schemas, provider.clone()),
            error_injection: ErrorInjectionService::new(provider),
        })
    }

    /// 替换选题策略（默认：无记忆分层随机）
    pub fn with_picker(mut self, picker: Box<dyn PickerStrategy>) -> Self {
        self.picker = picker;
        self
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn pick_next(&self, request: &PickRequest) -> EngineResult<PickedExercise> {
        self.picker.pick_next(request, &self.modules, &self.schemas)
    }

    pub async fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationResult> {
        self.generation.generate(request).await
    }

    pub async fn mark(&self, request: &MarkingRequest) -> EngineResult<MarkingResult> {
        self.marking.mark(request).await
    }

    pub async fn inject_errors(&self, request: &InjectionRequest) -> InjectionResult {
        self.error_injection.inject_errors(request).await
    }

    /// 组装交给统计协作方的会话记录元组
    pub fn session_record(
        &self,
        picked: &PickedExercise,
        question_data: Value,
        user_answer: Value,
        marking_result: MarkingResult,
    ) -> SessionRecord {
        let is_correct = marking_result.is_correct;
        SessionRecord {
            submodule_id: picked.submodule_id.clone(),
            exercise_type_id: picked.exercise_type_id.clone(),
            question_data,
            user_answer,
            marking_result,
            is_correct,
            timestamp: Utc::now(),
        }
    }
}
