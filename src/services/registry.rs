//! 注册表模块
//! 题型注册表与模块注册表：启动时填充一次，之后只读，可无锁并发读。
//! 定义由调用方提供，注册表本身不做网络或磁盘 I/O。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::models::{ExerciseTypeDefinition, ModuleDefinition, SkillType, SubmoduleDefinition};

/// 题型注册表
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    definitions: HashMap<String, Arc<ExerciseTypeDefinition>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// 注册题型，同 id 重复注册时后写者胜
    pub fn register(&mut self, definition: ExerciseTypeDefinition) {
        self.definitions
            .insert(definition.id.clone(), Arc::new(definition));
    }

    pub fn get(&self, id: &str) -> Option<Arc<ExerciseTypeDefinition>> {
        self.definitions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn all(&self) -> Vec<Arc<ExerciseTypeDefinition>> {
        self.definitions.values().cloned().collect()
    }

    pub fn by_family(&self, family: &str) -> Vec<Arc<ExerciseTypeDefinition>> {
        self.definitions
            .values()
            .filter(|d| d.family == family)
            .cloned()
            .collect()
    }

    pub fn by_skill_type(&self, skill_type: SkillType) -> Vec<Arc<ExerciseTypeDefinition>> {
        self.definitions
            .values()
            .filter(|d| d.skill_type == skill_type)
            .cloned()
            .collect()
    }

    pub fn families_for_skill_type(&self, skill_type: SkillType) -> HashSet<String> {
        self.definitions
            .values()
            .filter(|d| d.skill_type == skill_type)
            .map(|d| d.family.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// 模块注册表
#[derive(Debug)]
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleDefinition>,
}

impl ModuleRegistry {
    /// 从静态定义装载，空目录视为启动期致命错误
    pub fn load(definitions: Vec<ModuleDefinition>) -> EngineResult<Self> {
        if definitions.is_empty() {
            return Err(EngineError::EmptyModuleCatalog);
        }

        let mut modules = HashMap::new();
        for definition in definitions {
            modules.insert(definition.id.clone(), definition);
        }
        Ok(Self { modules })
    }

    pub fn get(&self, module_id: &str) -> Option<&ModuleDefinition> {
        self.modules.get(module_id)
    }

    pub fn submodules_of(&self, module_id: &str) -> &[SubmoduleDefinition] {
        self.modules
            .get(module_id)
            .map(|m| m.submodules.as_slice())
            .unwrap_or(&[])
    }

    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.keys().map(|k| k.as_str()).collect()
    }
}
