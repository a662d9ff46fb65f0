//! Metadata service error types.

use super::landmarks::PayloadError;

/// Errors from fetching or decoding upstream metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Tile metadata could not be repaired into JSON
    #[error(transparent)]
    Malformed(#[from] PayloadError),

    /// Stop detail could not be decoded
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Nothing is known about the requested landmark
    #[error("no data for landmark {0}")]
    NotFound(String),

    /// A search area needs more tiles than one request may carry
    #[error("search area spans {tiles} tiles (limit {limit})")]
    BlockTooLarge { tiles: u64, limit: u64 },

    /// The source is misconfigured (no servers, unreadable fixtures)
    #[error("configuration error: {0}")]
    Config(String),

    /// The client stopped accepting requests
    #[error("metadata client is shut down")]
    Shutdown,
}

impl MetadataError {
    /// Whether the failure happened in transport rather than decoding.
    pub fn is_transport(&self) -> bool {
        matches!(self, MetadataError::Http(_) | MetadataError::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MetadataError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");
        assert!(err.is_transport());

        let err = MetadataError::Malformed(PayloadError {
            message: "expected value at line 1 column 5".into(),
            excerpt: "[{".into(),
        });
        assert_eq!(
            err.to_string(),
            "malformed tile metadata: expected value at line 1 column 5"
        );
        assert!(!err.is_transport());

        let err = MetadataError::Decode {
            message: "missing field `latlng`".into(),
        };
        assert!(err.to_string().contains("decode error"));

        let err = MetadataError::NotFound("0x1".into());
        assert_eq!(err.to_string(), "no data for landmark 0x1");

        let err = MetadataError::BlockTooLarge {
            tiles: 1_000_000,
            limit: 1024,
        };
        assert_eq!(err.to_string(), "search area spans 1000000 tiles (limit 1024)");
        assert!(!err.is_transport());

        let err = MetadataError::Config("no tile servers configured".into());
        assert_eq!(err.to_string(), "configuration error: no tile servers configured");
        assert!(!err.is_transport());
        assert!(!MetadataError::Shutdown.is_transport());
    }
}
