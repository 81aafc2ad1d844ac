use crate::report::ReportError;
use pdf_engine::RendererError;
use storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("renderer error: {0}")]
    Renderer(#[from] RendererError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

pub type AppResult<T> = Result<T, AppError>;
