//! Domain-level error taxonomy for chart-val.

/// chart-val errors.
///
/// Collaborators translate their native failures into these variants once, at
/// the adapter boundary. The core only ever inspects the variant.
#[derive(Debug, thiserror::Error)]
pub enum ChartValError {
    /// A chart or path is absent at a revision. Drives the new/removed chart path.
    #[error("{resource} not found at ref {reference}")]
    NotFound { resource: String, reference: String },

    /// The renderer rejected the chart (bad templates, invalid values, crash).
    #[error("rendering {chart} failed: {reason}")]
    Render { chart: String, reason: String },

    #[error("{what} timed out after {limit_secs} seconds")]
    Timeout { what: String, limit_secs: u64 },

    /// Chart files could not be obtained at all (network, auth, bad revision).
    #[error("transport error: {0}")]
    Transport(String),

    #[error("environment discovery failed for {chart}: {reason}")]
    Discovery { chart: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("task failed: {0}")]
    Task(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChartValError {
    /// Build a [`ChartValError::NotFound`].
    pub fn not_found(resource: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            reference: reference.into(),
        }
    }

    /// Whether this error means "absent at that revision".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for chart-val operations.
pub type Result<T> = std::result::Result<T, ChartValError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ChartValError::not_found("charts/my-app", "main");
        assert_eq!(err.to_string(), "charts/my-app not found at ref main");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classification_is_by_variant_not_message() {
        let err = ChartValError::Transport("HTTP 404 Not Found".to_string());
        assert!(!err.is_not_found());

        let err = ChartValError::Render {
            chart: "my-app".to_string(),
            reason: "template: no such file or directory".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_timeout_display() {
        let err = ChartValError::Timeout {
            what: "helm template my-app".to_string(),
            limit_secs: 120,
        };
        assert!(err.to_string().contains("120 seconds"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ChartValError = io.into();
        assert!(err.to_string().contains("io error"));
        assert!(!err.is_not_found());
    }
}
