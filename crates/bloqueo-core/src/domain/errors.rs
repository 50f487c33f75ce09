//! Errors - error types and their operational classification.

use thiserror::Error;

/// ErrorKind classifies failures by how callers are expected to react.
///
/// - Validation: the request is malformed; never retried
/// - NotFound: unknown task identifier; never retried
/// - Storage: blob read/write or decode failure
///
/// Lock contention is not an error: it surfaces as a `false` from
/// [`crate::store::BlobLock::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
}

/// Failures reported by a [`crate::ports::BlobStore`].
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid blob name: {0:?}")]
    InvalidName(String),

    #[error("blob io error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Map an io error on `name` onto the blob error taxonomy.
    pub fn from_io(name: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(name.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(name.to_string()),
            _ => Self::Io {
                name: name.to_string(),
                source,
            },
        }
    }
}

/// Domain error for every fallible core operation.
#[derive(Debug, Error)]
pub enum BloqueoError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{0}")]
    Validation(String),

    #[error("invalid tid {0:?}: expected <id>-<vdom>")]
    InvalidTid(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BloqueoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFields(_) | Self::Validation(_) | Self::InvalidTid(_) => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Blob(_) | Self::Json(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BloqueoError::MissingFields(vec!["vdom"]), ErrorKind::Validation)]
    #[case(BloqueoError::InvalidTid("abc".into()), ErrorKind::Validation)]
    #[case(BloqueoError::NotFound("x-A".into()), ErrorKind::NotFound)]
    #[case(BloqueoError::Validation("bad vdom".into()), ErrorKind::Validation)]
    #[case(BloqueoError::Blob(BlobError::NotFound("b".into())), ErrorKind::Storage)]
    fn errors_are_classified(#[case] err: BloqueoError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn missing_fields_lists_every_field() {
        let err = BloqueoError::MissingFields(vec!["service", "ticket"]);
        assert_eq!(err.to_string(), "missing required fields: service, ticket");
    }

    #[test]
    fn io_not_found_maps_to_blob_not_found() {
        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(BlobError::from_io("a.json", io), BlobError::NotFound(n) if n == "a.json"));
    }
}
