use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),
}
