//! Crate-wide error type.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unrecognised attribute schema.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("record has {actual} bytes, schema stride is {expected}")]
    Decode { expected: usize, actual: usize },

    #[error("schema has no `{0}` attribute, cannot place points")]
    MissingCoordinate(String),

    /// The subdivision could not place a point: broken partitioning or a point outside the
    /// domain of the cell it was routed to.
    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
