//! Generation request tracking
//!
//! Every asynchronous call into a collaborator is represented by a
//! [`GenerationRequest`] walking `Pending → Generating → Complete | Error`.
//! The [`RequestTracker`] is the collection the presentation layer observes;
//! dismissing a request removes it without cancelling the underlying call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::segment::NodeId;

/// Unique identifier for a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new request ID using UUID v7 (time-ordered)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a request asks a collaborator to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    /// Next segment along a path (or the root when `attach_to` is `None`)
    NewSegment { attach_to: Option<NodeId> },
    /// Additional child of a node, leaving the playhead alone
    Branch { parent_id: NodeId },
    /// Judge the answer recorded on a node
    EvaluateAnswer { node_id: NodeId },
    /// Closing reflection question for the whole session
    ClosingQuestion,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewSegment { .. } => "new_segment",
            Self::Branch { .. } => "branch",
            Self::EvaluateAnswer { .. } => "evaluate_answer",
            Self::ClosingQuestion => "closing_question",
        }
    }
}

/// Lifecycle state of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Generating,
    Complete { result_node_id: Option<NodeId> },
    Error { message: String },
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

/// One in-flight or finished collaborator call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub status: RequestStatus,
    /// Short description for display only
    pub prompt_summary: String,
    pub issued_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(kind: RequestKind, prompt_summary: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            kind,
            status: RequestStatus::Pending,
            prompt_summary: prompt_summary.into(),
            issued_at: Utc::now(),
        }
    }

    pub fn result_node_id(&self) -> Option<NodeId> {
        match &self.status {
            RequestStatus::Complete { result_node_id } => *result_node_id,
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            RequestStatus::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, expected: &str, next: RequestStatus) -> Result<(), SessionError> {
        if self.status.name() != expected {
            return Err(SessionError::invalid(
                format!("{} request {} to be {expected}", self.kind.as_str(), self.id),
                self.status.name(),
            ));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_generating(&mut self) -> Result<(), SessionError> {
        self.transition("pending", RequestStatus::Generating)
    }

    pub fn complete(&mut self, result_node_id: Option<NodeId>) -> Result<(), SessionError> {
        self.transition("generating", RequestStatus::Complete { result_node_id })
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        self.transition(
            "generating",
            RequestStatus::Error {
                message: message.into(),
            },
        )
    }
}

/// The tracked request collection, in issuance order
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    requests: Vec<GenerationRequest>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new request in `Pending`
    pub fn issue(&mut self, kind: RequestKind, prompt_summary: impl Into<String>) -> RequestId {
        let request = GenerationRequest::new(kind, prompt_summary);
        let id = request.id;
        self.requests.push(request);
        id
    }

    pub fn get(&self, id: &RequestId) -> Option<&GenerationRequest> {
        self.requests.iter().find(|r| r.id == *id)
    }

    pub fn get_mut(&mut self, id: &RequestId) -> Option<&mut GenerationRequest> {
        self.requests.iter_mut().find(|r| r.id == *id)
    }

    /// Completion handlers check this before touching the tree
    pub fn is_tracked(&self, id: &RequestId) -> bool {
        self.get(id).is_some()
    }

    /// Stop tracking a request; returns what was removed
    pub fn dismiss(&mut self, id: &RequestId) -> Option<GenerationRequest> {
        let index = self.requests.iter().position(|r| r.id == *id)?;
        Some(self.requests.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationRequest> {
        self.requests.iter()
    }

    pub fn in_flight(&self) -> impl Iterator<Item = &GenerationRequest> {
        self.requests.iter().filter(|r| !r.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch_kind() -> RequestKind {
        RequestKind::Branch {
            parent_id: NodeId::new(),
        }
    }

    // ==================== State Machine Tests ====================

    #[test]
    fn new_request_starts_pending() {
        let request = GenerationRequest::new(RequestKind::ClosingQuestion, "closing");
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!request.is_terminal());
    }

    #[test]
    fn request_completes_with_node() {
        let node = NodeId::new();
        let mut request = GenerationRequest::new(branch_kind(), "branch");

        request.mark_generating().unwrap();
        request.complete(Some(node)).unwrap();

        assert!(request.is_terminal());
        assert_eq!(request.result_node_id(), Some(node));
        assert!(request.error_message().is_none());
    }

    #[test]
    fn request_fails_with_message() {
        let mut request = GenerationRequest::new(branch_kind(), "branch");

        request.mark_generating().unwrap();
        request.fail("generator timed out").unwrap();

        assert_eq!(request.error_message(), Some("generator timed out"));
        assert!(request.result_node_id().is_none());
    }

    #[test]
    fn complete_from_pending_is_rejected() {
        let mut request = GenerationRequest::new(branch_kind(), "branch");

        let result = request.complete(None);

        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn terminal_request_cannot_restart() {
        let mut request = GenerationRequest::new(branch_kind(), "branch");
        request.mark_generating().unwrap();
        request.fail("boom").unwrap();

        assert!(request.mark_generating().is_err());
        assert!(request.complete(None).is_err());
    }

    // ==================== Kind Tests ====================

    #[test]
    fn kind_json_is_tagged() {
        let json = serde_json::to_value(RequestKind::ClosingQuestion).unwrap();
        assert_eq!(json["kind"], "closing_question");
    }

    // ==================== Tracker Tests ====================

    #[test]
    fn tracker_keeps_issuance_order() {
        let mut tracker = RequestTracker::new();
        let a = tracker.issue(branch_kind(), "a");
        let b = tracker.issue(branch_kind(), "b");

        let ids: Vec<_> = tracker.iter().map(|r| r.id).collect();
        assert_eq!(ids, [a, b]);
    }

    #[test]
    fn dismiss_removes_from_tracking() {
        let mut tracker = RequestTracker::new();
        let id = tracker.issue(branch_kind(), "a");

        let removed = tracker.dismiss(&id).unwrap();

        assert_eq!(removed.id, id);
        assert!(!tracker.is_tracked(&id));
        assert!(tracker.dismiss(&id).is_none());
    }

    #[test]
    fn in_flight_excludes_terminal_requests() {
        let mut tracker = RequestTracker::new();
        let done = tracker.issue(branch_kind(), "done");
        let _pending = tracker.issue(branch_kind(), "pending");
        let request = tracker.get_mut(&done).unwrap();
        request.mark_generating().unwrap();
        request.complete(None).unwrap();

        assert_eq!(tracker.in_flight().count(), 1);
        assert_eq!(tracker.len(), 2);
    }
}
