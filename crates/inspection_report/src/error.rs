use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template not found: {0}")]
    TemplateMissing(String),

    #[error("bad document archive: {0}")]
    BadArchive(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("image rejected: {0}")]
    Image(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ReportError> for inspection_core::error::InspectionError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::TemplateMissing(m) => Self::TemplateMissing(m),
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}
