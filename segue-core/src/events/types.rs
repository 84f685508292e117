//! Event type definitions

use serde::{Deserialize, Serialize};

use crate::context::{Difficulty, DifficultyBias};
use crate::request::RequestId;
use crate::segment::NodeId;

/// Events published while a session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegueEvent {
    /// A session was created for a topic
    SessionStarted { topic: String },

    /// A request entered `pending`
    RequestIssued {
        request_id: RequestId,
        kind: String,
        summary: String,
    },

    /// A request was handed to its collaborator
    RequestGenerating { request_id: RequestId },

    /// A request finished successfully
    RequestCompleted {
        request_id: RequestId,
        node_id: Option<NodeId>,
    },

    /// A request finished with an error
    RequestFailed { request_id: RequestId, message: String },

    /// A request was removed from tracking
    RequestDismissed {
        request_id: RequestId,
        was_terminal: bool,
    },

    /// A result arrived for a request that is no longer tracked
    OrphanDropped { request_id: RequestId },

    /// A node joined the tree
    NodeAttached {
        node_id: NodeId,
        parent_id: Option<NodeId>,
        sibling_index: usize,
    },

    /// The playhead moved
    PlayheadMoved { node_id: NodeId },

    /// The learner answered a node's question
    AnswerRecorded { node_id: NodeId },

    /// The context seeding the next request changed
    ContextUpdated {
        depth: u32,
        next_topic: String,
        target_difficulty: Difficulty,
        bias: DifficultyBias,
    },

    /// The closing payload was captured and can be sent
    ClosingReady { terminal_node_id: NodeId },
}

impl SegueEvent {
    /// Request this event concerns, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::RequestIssued { request_id, .. }
            | Self::RequestGenerating { request_id }
            | Self::RequestCompleted { request_id, .. }
            | Self::RequestFailed { request_id, .. }
            | Self::RequestDismissed { request_id, .. }
            | Self::OrphanDropped { request_id } => Some(request_id),
            Self::SessionStarted { .. }
            | Self::NodeAttached { .. }
            | Self::PlayheadMoved { .. }
            | Self::AnswerRecorded { .. }
            | Self::ContextUpdated { .. }
            | Self::ClosingReady { .. } => None,
        }
    }
}
