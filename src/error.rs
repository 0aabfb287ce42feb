use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("no editing surface is attached")]
    MissingSurface,
    #[error("diff segments do not reproduce the text they were computed against")]
    DiffMismatch,
    #[error("no suggestion is currently displayed")]
    NoSuggestion,
    #[error("sentence {0} does not match any suggested edit")]
    UnknownSentence(usize),
}

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;
