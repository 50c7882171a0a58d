use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaylogError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
