use thiserror::Error;

/// Error taxonomy for the pipeline. Each variant maps to a containment level:
/// collection and enrichment errors are contained per item, extraction errors
/// mean "no signal", validation rejections are counted and dropped, storage
/// errors are contained per record. Only a total loss of the store aborts a
/// run, and that surfaces through `Storage` at the orchestrator.
#[derive(Error, Debug)]
pub enum FundScoutError {
    #[error("collection error: {0}")]
    Collection(String),

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("validation rejection: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("enrichment error: {0}")]
    Enrichment(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FundScoutError>;
