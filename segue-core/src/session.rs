//! VideoSession aggregate root
//!
//! Owns the tree, the playhead and the context that seeds the next request.
//! Mutation is crate-private: outside callers go through the
//! [`Orchestrator`](crate::Orchestrator) and only ever see snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::{Difficulty, LearningContext};
use crate::error::SessionError;
use crate::segment::{NodeId, Segment};
use crate::tree::{SessionTree, TreeNode};

/// Full branching history of one learning journey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSession {
    tree: SessionTree,
    /// `None` only while the root is still pending
    current_node_id: Option<NodeId>,
    context: LearningContext,
    last_updated_at: DateTime<Utc>,
    at_designated_end: bool,
}

impl VideoSession {
    /// Root-pending session for a user-supplied topic
    pub fn new(topic: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            tree: SessionTree::new(),
            current_node_id: None,
            context: LearningContext::new(topic, difficulty),
            last_updated_at: Utc::now(),
            at_designated_end: false,
        }
    }

    pub fn tree(&self) -> &SessionTree {
        &self.tree
    }

    /// The playhead
    pub fn current_node_id(&self) -> Option<NodeId> {
        self.current_node_id
    }

    pub fn current_node(&self) -> Option<&TreeNode> {
        self.current_node_id.and_then(|id| self.tree.get(&id))
    }

    /// Context for the next generation request
    pub fn context(&self) -> &LearningContext {
        &self.context
    }

    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    pub fn is_at_designated_end(&self) -> bool {
        self.at_designated_end
    }

    /// Nodes from the root to the playhead
    pub fn active_path(&self) -> Vec<&TreeNode> {
        self.current_node_id
            .and_then(|id| self.tree.path_from_root(&id).ok())
            .unwrap_or_default()
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    pub(crate) fn insert_root(&mut self, segment: Segment) -> Result<NodeId, SessionError> {
        let id = self.tree.create_root(segment)?;
        self.current_node_id = Some(id);
        self.touch();
        Ok(id)
    }

    pub(crate) fn attach(
        &mut self,
        parent_id: &NodeId,
        segment: Segment,
        ticket: u64,
        advance: bool,
    ) -> Result<NodeId, SessionError> {
        let id = self.tree.attach_child_at(parent_id, segment, ticket)?;
        if advance {
            self.current_node_id = Some(id);
        }
        self.touch();
        Ok(id)
    }

    pub(crate) fn reserve_ticket(&mut self) -> u64 {
        self.tree.reserve_ticket()
    }

    /// Move the playhead; never touches node content or the context
    pub(crate) fn navigate_to(&mut self, id: &NodeId) -> Result<(), SessionError> {
        self.tree.node(id)?;
        self.current_node_id = Some(*id);
        self.touch();
        Ok(())
    }

    pub(crate) fn record_answer(&mut self, id: &NodeId, answer: String) -> Result<(), SessionError> {
        self.tree.record_answer(id, answer)?;
        self.touch();
        Ok(())
    }

    pub(crate) fn set_context(&mut self, context: LearningContext) {
        self.context = context;
        self.touch();
    }

    pub(crate) fn mark_designated_end(&mut self) {
        self.at_designated_end = true;
        self.touch();
    }
}
