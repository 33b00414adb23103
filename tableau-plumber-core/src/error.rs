use crate::items::ItemType;

/// Error type shared by every operation in the crate.
///
/// Transport implementations (REST client, extract engine) convert their own
/// failures into one of these variants so orchestration code can match on the
/// failure class without knowing the backend.
#[derive(Debug, thiserror::Error)]
pub enum PlumberError {
    #[error("Credentials could not be used: {0}")]
    Credentials(String),
    #[error("Login failed: {0}")]
    Login(String),
    #[error("Not signed in to the server")]
    NotSignedIn,
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Could not decode server response: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Extract engine error: {0}")]
    Extract(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("No {item_type} named '{name}' found")]
    NotFound { item_type: ItemType, name: String },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PlumberError {
    pub fn not_found(item_type: ItemType, name: impl Into<String>) -> Self {
        PlumberError::NotFound {
            item_type,
            name: name.into(),
        }
    }
}

pub type Result<T, E = PlumberError> = std::result::Result<T, E>;
