use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported emit target: {0}")]
    UnsupportedTarget(String),
    #[error("unsupported layout strategy: {0}")]
    UnsupportedPlacer(String),
    #[error("compilation failed with {errors} error(s)")]
    CompilationFailed { errors: usize },
}
