use thiserror::Error;

/// Failures while building or sending a templated request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid http method: {0}")]
    InvalidMethod(String),

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("required header {0} is not set")]
    MissingHeader(String),

    #[error("{url}: could not serialize request body {payload} to json: {source}")]
    BodySerialization {
        url: String,
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl RequestError {
    /// True for errors caused by the definition or call overrides rather than
    /// by the network.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMethod(_)
                | Self::InvalidUrl { .. }
                | Self::InvalidHeader { .. }
                | Self::MissingHeader(_)
                | Self::BodySerialization { .. }
        )
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            }
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
