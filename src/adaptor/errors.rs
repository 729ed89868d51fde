use crate::parser::ParseError;
use crate::request::RequestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdaptError {
    #[error("no request definition for '{0}'")]
    UnknownRequest(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("{url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse response: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to decode fields: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("expected a {expected} result, parser produced {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: &'static str,
    },
}

impl AdaptError {
    /// Configuration and request-build problems; retrying the same call cannot
    /// succeed until the site definition or the overrides change.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::UnknownRequest(_) => true,
            Self::Request(e) => e.is_build_error(),
            Self::Status { .. }
            | Self::Io { .. }
            | Self::Parse(_)
            | Self::Decode(_)
            | Self::UnexpectedShape { .. } => false,
        }
    }
}

/// Error returned by every adaptor call, qualified with the site name.
#[derive(Error, Debug)]
#[error("site {site}: {source}")]
pub struct SiteError {
    pub site: String,
    #[source]
    pub source: AdaptError,
}

impl SiteError {
    pub fn new(site: impl Into<String>, source: AdaptError) -> Self {
        Self {
            site: site.into(),
            source,
        }
    }

    pub fn kind(&self) -> &AdaptError {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_qualified_message() {
        let err = SiteError::new("demo", AdaptError::UnknownRequest("search".to_string()));
        assert_eq!(
            err.to_string(),
            "site demo: no request definition for 'search'"
        );

        let err = SiteError::new(
            "demo",
            AdaptError::Status {
                url: "https://demo.example/x".to_string(),
                status: 503,
            },
        );
        assert_eq!(
            err.to_string(),
            "site demo: https://demo.example/x failed with status 503"
        );
    }

    #[test]
    fn test_configuration_classification() {
        assert!(AdaptError::UnknownRequest("x".to_string()).is_configuration());
        assert!(
            AdaptError::Request(RequestError::MissingHeader("X-Token".to_string()))
                .is_configuration()
        );
        assert!(!AdaptError::Request(RequestError::RequestTimeout).is_configuration());
        assert!(
            !AdaptError::Status {
                url: String::new(),
                status: 500
            }
            .is_configuration()
        );
    }
}
