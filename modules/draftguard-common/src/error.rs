use thiserror::Error;

#[derive(Error, Debug)]
pub enum DraftGuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
