use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building surface meshes
#[derive(Error, Debug)]
pub enum Error {
    #[error("Empty mesh: {0}")]
    EmptyMesh(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Core parser error: {0}")]
    CoreError(#[from] wayfinder_core::Error),
}
