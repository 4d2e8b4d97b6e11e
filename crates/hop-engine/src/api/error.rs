use thiserror::Error;

/// Errors surfaced by the runtime.
///
/// Soft failures (missing level fields, late asset completions, sprite draw
/// problems) never reach this type; they are resolved with defaults or
/// fallbacks and logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("entity geometry must be finite and non-negative, got {width}x{height}")]
    InvalidGeometry { width: f32, height: f32 },

    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("engine already initialized")]
    AlreadyInitialized,

    #[error("engine not initialized")]
    NotInitialized,

    #[error("level index {index} out of range ({count} levels)")]
    InvalidLevel { index: usize, count: usize },

    #[error("unknown scene '{0}'")]
    UnknownScene(String),

    #[error("asset '{id}' failed to load: {reason}")]
    AssetLoad { id: String, reason: String },

    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),

    #[error("malformed game data: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
