use thiserror::Error;

/// Failure of a single invocation. Every variant maps to its own exit status.
#[derive(Error, Debug)]
pub enum UserError {
    #[error("no operation given")]
    Usage,

    #[error("{0}")]
    NotFound(String),

    #[error("following users missing in {database}: {}", .users.join(", "))]
    Inconsistent { database: String, users: Vec<String> },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UserError {
    pub fn exit_code(&self) -> i32 {
        match self {
            UserError::Other(_) => 1,
            UserError::Usage => 2,
            UserError::NotFound(_) => 3,
            UserError::Inconsistent { .. } => 4,
            UserError::Conflict(_) => 5,
        }
    }
}

pub type Result<T, E = UserError> = std::result::Result<T, E>;
