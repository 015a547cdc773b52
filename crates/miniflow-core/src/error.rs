use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single node. Always caught by the runner; whether it halts
/// the run depends on the node's error policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} en {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Process error: {message}")]
    Process { exit_code: i32, message: String },

    #[error("Filesystem error: {0}")]
    Filesystem(String),
}

impl NodeError {
    /// Name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Configuration(_) => "ConfigurationError",
            NodeError::Transport(_) => "TransportError",
            NodeError::HttpStatus { .. } => "HttpStatusError",
            NodeError::Process { .. } => "ProcessError",
            NodeError::Filesystem(_) => "FilesystemError",
        }
    }

    /// Human-readable message without the kind prefix.
    ///
    /// Falls back to the kind name when the handler supplied a blank message.
    pub fn message(&self) -> String {
        let message = match self {
            NodeError::Configuration(m) | NodeError::Transport(m) | NodeError::Filesystem(m) => {
                m.clone()
            }
            NodeError::HttpStatus { .. } => self.to_string(),
            NodeError::Process { message, .. } => message.clone(),
        };

        if message.trim().is_empty() {
            self.kind().to_string()
        } else {
            message
        }
    }
}

/// Setup-level failures that abort a run before any node executes
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("No START node found")]
    MissingStart,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_kind_prefix() {
        let err = NodeError::Configuration("Missing url in node config".into());
        assert_eq!(err.to_string(), "Configuration error: Missing url in node config");
        assert_eq!(err.message(), "Missing url in node config");
    }

    #[test]
    fn test_blank_message_falls_back_to_kind() {
        let err = NodeError::Transport("  ".into());
        assert_eq!(err.message(), "TransportError");
    }

    #[test]
    fn test_http_status_message() {
        let err = NodeError::HttpStatus { status: 503, url: "http://x".into() };
        assert_eq!(err.message(), "HTTP 503 en http://x");
    }
}
