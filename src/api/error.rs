use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Everything that can go wrong between a user gesture and the robot.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("robot answered {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    Validation { message: String },

    #[error("another action is still in flight")]
    Busy,

    #[error("robot does not expose {capability}")]
    Unsupported { capability: &'static str },

    #[error("map geometry is undefined for the current view")]
    GeometryUndefined,
}

impl ClientError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Network or protocol failure; the request reached (or tried to reach) the robot.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::Decode { .. }
        )
    }

    /// Rejected locally before any request was sent.
    #[must_use]
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Busy | Self::Unsupported { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ClientError;

    #[test]
    fn status_errors_count_as_transport() {
        let error = ClientError::status("capabilities", 503);
        assert!(error.is_transport());
        assert!(!error.is_local_rejection());
        assert_eq!(error.to_string(), "robot answered 503 for capabilities");
    }

    #[test]
    fn validation_is_a_local_rejection() {
        let error = ClientError::validation("name must not be empty");
        assert!(error.is_local_rejection());
        assert!(!error.is_transport());
        assert_eq!(error.to_string(), "name must not be empty");
    }

    #[test]
    fn geometry_is_neither_transport_nor_validation() {
        let error = ClientError::GeometryUndefined;
        assert!(!error.is_transport());
        assert!(!error.is_local_rejection());
    }
}
