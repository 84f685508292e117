//! Error types for segue-core

use thiserror::Error;

use crate::segment::NodeId;

/// Top-level error type for segue-core
#[derive(Error, Debug)]
pub enum SegueError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Contract violations against the session tree or request tracker
///
/// These are surfaced synchronously to the caller and never recorded on a
/// generation request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Node {0} has already been answered")]
    AlreadyAnswered(NodeId),
}

impl SessionError {
    pub(crate) fn invalid(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Failures reported by a segment or closing-question generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generator unreachable: {0}")]
    Transport(String),

    #[error("Malformed generator output: {0}")]
    Malformed(String),

    #[error("Generator rejected the request: {0}")]
    Rejected(String),
}

/// Failures reported by the answer evaluator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Evaluator unreachable: {0}")]
    Transport(String),

    #[error("Malformed evaluator output: {0}")]
    Malformed(String),
}

/// Structurally invalid content returned by a collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Segment {0} has a question with empty text")]
    EmptyQuestion(NodeId),

    #[error("Segment {0} has an empty topic")]
    EmptyTopic(NodeId),

    #[error("Segment id {0} is already present in the session tree")]
    DuplicateId(NodeId),

    #[error("Closing question is empty")]
    EmptyClosingQuestion,
}

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== SessionError Tests ====================

    #[test]
    fn session_error_not_found_displays_correctly() {
        let error = SessionError::NotFound("abc123".to_string());
        assert!(error.to_string().contains("Not found"));
        assert!(error.to_string().contains("abc123"));
    }

    #[test]
    fn session_error_invalid_state_displays_correctly() {
        let error = SessionError::invalid("empty tree", "1 node");
        let message = error.to_string();
        assert!(message.contains("expected empty tree"));
        assert!(message.contains("got 1 node"));
    }

    #[test]
    fn session_error_already_answered_names_node() {
        let id = NodeId::new();
        let error = SessionError::AlreadyAnswered(id);
        assert!(error.to_string().contains(&id.to_string()));
    }

    // ==================== Collaborator Error Tests ====================

    #[test]
    fn generation_error_transport_displays_correctly() {
        let error = GenerationError::Transport("connection reset".to_string());
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn evaluation_error_malformed_displays_correctly() {
        let error = EvaluationError::Malformed("missing field `correct`".to_string());
        assert!(error.to_string().contains("Malformed evaluator output"));
    }

    #[test]
    fn validation_error_empty_question_names_segment() {
        let id = NodeId::new();
        let error = ValidationError::EmptyQuestion(id);
        assert!(error.to_string().contains(&id.to_string()));
    }

    // ==================== SegueError Tests ====================

    #[test]
    fn segue_error_converts_from_session_error() {
        let error: SegueError = SessionError::NotFound("x".to_string()).into();
        assert!(matches!(error, SegueError::Session(_)));
        assert!(error.to_string().contains("Session error"));
    }

    #[test]
    fn segue_error_converts_from_generation_error() {
        let error: SegueError = GenerationError::Rejected("policy".to_string()).into();
        assert!(matches!(error, SegueError::Generation(_)));
    }

    #[test]
    fn segue_error_converts_from_validation_error() {
        let error: SegueError = ValidationError::EmptyClosingQuestion.into();
        assert!(matches!(error, SegueError::Validation(_)));
    }

    #[test]
    fn config_error_converts_from_toml_error() {
        let parse_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let error: ConfigError = parse_error.into();
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
