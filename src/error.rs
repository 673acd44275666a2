use firestore_grpc::tonic;

use crate::config::ConfigError;

#[derive(thiserror::Error)]
pub enum FirebaseError {
    /// The environment did not yield a usable configuration. Surfaced during
    /// startup, before any network-capable client is constructed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    DocumentAlreadyExists(String),

    #[error("{0}")]
    DocumentNotfound(String),

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to validate token: {0}")]
    ValidateTokenError(anyhow::Error),

    #[error(
        "firestore value: {source}{}",
        document.as_ref().map(|d| format!(" in document '{d}'")).unwrap_or_default())
    ]
    ValueError {
        source: crate::firestore::value::Error,
        document: Option<String>,
    },

    #[error("grpc: {0}")]
    GrpcError(#[from] tonic::transport::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<crate::firestore::value::Error> for FirebaseError {
    fn from(e: crate::firestore::value::Error) -> Self {
        FirebaseError::ValueError {
            source: e,
            document: None,
        }
    }
}

impl std::fmt::Debug for FirebaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

// Taken from https://www.lpalmieri.com/posts/error-handling-rust/#internal-errors
fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
