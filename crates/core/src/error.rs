use thiserror::Error;

/// Core errors for the exporter
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Redfish GET {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Redfish GET {endpoint} aborted: scrape deadline exceeded")]
    DeadlineExceeded { endpoint: String },

    #[error("Redfish GET {endpoint} failed: HTTP {status}")]
    HttpStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Redfish GET {endpoint} returned an undecodable body: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Redfish GET {endpoint} returned a body larger than {limit} bytes")]
    BodyTooLarge { endpoint: String, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Metric exposition error: {0}")]
    Exposition(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport<S: Into<String>>(endpoint: S, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn deadline_exceeded<S: Into<String>>(endpoint: S) -> Self {
        Self::DeadlineExceeded {
            endpoint: endpoint.into(),
        }
    }

    pub fn http_status<S: Into<String>>(endpoint: S, status: reqwest::StatusCode) -> Self {
        Self::HttpStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    pub fn decode<S: Into<String>>(endpoint: S, source: serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn body_too_large<S: Into<String>>(endpoint: S, limit: usize) -> Self {
        Self::BodyTooLarge {
            endpoint: endpoint.into(),
            limit,
        }
    }

    /// Connection failures and timeouts, as opposed to answers the server gave
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::DeadlineExceeded { .. })
    }

    /// Status code carried by a non-2xx response
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
