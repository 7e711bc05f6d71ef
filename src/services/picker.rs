//! 选题模块
//! 三段分层随机抽取：均匀选子模块 → 均匀选技能类型 → 均匀选题型族 → 均匀选具体题型。
//! 分层保证每个技能类型和题型族的先验选中概率相等，不被变体多的族挤占。

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::thread_rng;
use rand::Rng;

use crate::error::{EngineError, EngineResult};
use crate::models::{AttemptRecord, ExerciseTypeDefinition, SkillType};
use crate::services::registry::{ModuleRegistry, SchemaRegistry};

/// 选题请求
#[derive(Debug, Clone)]
pub struct PickRequest {
    pub module_id: String,
    /// 基线策略不使用历史，保留给间隔重复类策略
    pub history: Vec<AttemptRecord>,
}

impl PickRequest {
    pub fn new(module_id: &str) -> Self {
        Self {
            module_id: module_id.to_string(),
            history: Vec::new(),
        }
    }
}

/// 选题结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedExercise {
    pub submodule_id: String,
    pub exercise_type_id: String,
}

/// 可插拔选题策略
///
/// 换一个策略（如按近期正确率加权）只需换实现，调用方不变。
pub trait PickerStrategy: Send + Sync {
    fn pick_next(
        &self,
        request: &PickRequest,
        modules: &ModuleRegistry,
        schemas: &SchemaRegistry,
    ) -> EngineResult<PickedExercise>;
}

/// 基线无记忆分层随机策略
#[derive(Debug, Default)]
pub struct StratifiedRandomPicker;

impl StratifiedRandomPicker {
    pub fn new() -> Self {
        Self
    }

    /// 注入随机源的抽取实现，测试时用种子化 RNG
    pub fn pick_with_rng<R: Rng>(
        &self,
        request: &PickRequest,
        modules: &ModuleRegistry,
        schemas: &SchemaRegistry,
        rng: &mut R,
    ) -> EngineResult<PickedExercise> {
        let module = modules
            .get(&request.module_id)
            .ok_or_else(|| EngineError::ModuleNotFound(request.module_id.clone()))?;

        // 没有子模块的模块视同不存在
        let submodule = module
            .submodules
            .choose(rng)
            .ok_or_else(|| EngineError::ModuleNotFound(request.module_id.clone()))?;

        // 子模块声明支持 ∩ 注册表实际注册
        let available: Vec<Arc<ExerciseTypeDefinition>> = submodule
            .supported_exercise_type_ids
            .iter()
            .filter_map(|id| schemas.get(id))
            .collect();
        if available.is_empty() {
            return Err(EngineError::NoAvailableExerciseTypes(submodule.id.clone()));
        }

        let skill_type = choose_distinct(&available, rng, |d| d.skill_type);
        let within_skill: Vec<Arc<ExerciseTypeDefinition>> = available
            .iter()
            .filter(|d| d.skill_type == skill_type)
            .cloned()
            .collect();

        let family = choose_distinct(&within_skill, rng, |d| d.family.clone());
        let candidates: Vec<Arc<ExerciseTypeDefinition>> = within_skill
            .iter()
            .filter(|d| d.family == family)
            .cloned()
            .collect();

        // 分层过滤后必然非空
        let picked = candidates
            .choose(rng)
            .ok_or_else(|| EngineError::NoAvailableExerciseTypes(submodule.id.clone()))?;

        log::debug!(
            "picked submodule={} skill={} family={} exercise={}",
            submodule.id,
            skill_type,
            family,
            picked.id
        );

        Ok(PickedExercise {
            submodule_id: submodule.id.clone(),
            exercise_type_id: picked.id.clone(),
        })
    }
}

impl PickerStrategy for StratifiedRandomPicker {
    fn pick_next(
        &self,
        request: &PickRequest,
        modules: &ModuleRegistry,
        schemas: &SchemaRegistry,
    ) -> EngineResult<PickedExercise> {
        self.pick_with_rng(request, modules, schemas, &mut thread_rng())
    }
}

/// 在去重后的维度值上做均匀抽取（保持首次出现顺序，使抽取可用种子复现）
fn choose_distinct<T, K, R, F>(definitions: &[T], rng: &mut R, key: F) -> K
where
    K: Clone + Eq + std::hash::Hash,
    R: Rng,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    let mut distinct = Vec::new();
    for definition in definitions {
        let value = key(definition);
        if seen.insert(value.clone()) {
            distinct.push(value);
        }
    }
    distinct
        .choose(rng)
        .cloned()
        .expect("choose_distinct called on non-empty slice")
}
