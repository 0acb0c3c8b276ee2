use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GeneSeqError {
    #[error("missing environment variable {0}")]
    #[diagnostic(help("you must set NCBI_EMAIL and NCBI_API_KEY environment variables"))]
    MissingCredential(&'static str),

    #[error("output filename must end with .zip: {0}")]
    InvalidOutputName(String),

    #[error("invalid gene symbol or id: {0:?}")]
    InvalidGeneToken(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("unexpected NCBI response: {0}")]
    NcbiPayload(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl GeneSeqError {
    /// Errors detected before any request is sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GeneSeqError::MissingCredential(_)
                | GeneSeqError::InvalidOutputName(_)
                | GeneSeqError::InvalidGeneToken(_)
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            GeneSeqError::NcbiHttp(_)
                | GeneSeqError::NcbiStatus { .. }
                | GeneSeqError::NcbiPayload(_)
        )
    }
}
