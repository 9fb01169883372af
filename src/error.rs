use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The construction source is not a sequence of key/value pairs.
    #[error("invalid map source: expected a sequence of key/value pairs, found {found}")]
    InvalidSourceKind { found: String },
}
