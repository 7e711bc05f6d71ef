//! 引擎错误类型模块
//! 区分配置错误（不可重试，立即上抛）与外部 AI 服务错误（有限重试或降级）

use thiserror::Error;

/// 引擎层错误
///
/// 配置类错误（模块/子模块/题型不存在）对单次调用是致命的，调用方不应重试；
/// `GenerationFailed` 表示生成重试预算耗尽，调用方应换一道题而不是原题死循环。
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("submodule not found: {module_id}/{submodule_id}")]
    SubmoduleNotFound {
        module_id: String,
        submodule_id: String,
    },

    #[error("no available exercise types for submodule: {0}")]
    NoAvailableExerciseTypes(String),

    #[error("exercise type {exercise_type_id} is not supported by submodule {submodule_id}")]
    UnsupportedExerciseType {
        submodule_id: String,
        exercise_type_id: String,
    },

    #[error("schema not found for exercise type: {0}")]
    SchemaNotFound(String),

    #[error("generation failed after {attempts} attempts: {reason}")]
    GenerationFailed { attempts: u32, reason: String },

    #[error("module catalog is empty, engine cannot operate")]
    EmptyModuleCatalog,
}

/// 外部结构化生成服务错误
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 网络/进程级传输失败
    #[error("provider transport error: {0}")]
    Transport(String),

    /// 模型输出无法解析为 JSON（已含修复重试）
    #[error("malformed provider output: {0}")]
    MalformedOutput(String),

    /// 模型输出是合法 JSON 但不符合目标 schema
    #[error("provider output does not conform to schema {schema}: {violations:?}")]
    SchemaMismatch {
        schema: String,
        violations: Vec<String>,
    },

    /// 服务不可用（未启动或健康检查失败）
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
