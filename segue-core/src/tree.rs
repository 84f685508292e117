//! Session tree: node storage, linkage invariants and traversal
//!
//! The tree exclusively owns every [`TreeNode`] and the [`Segment`] inside
//! it. Children are ordered by the ticket drawn when their creation was
//! requested, so siblings keep issuance order even when generation requests
//! resolve out of order.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::SessionError;
use crate::segment::{NodeId, Segment};

/// A segment plus its place in the session tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    segment: Segment,
    parent_id: Option<NodeId>,
    child_ids: Vec<NodeId>,
    #[serde(skip)]
    ticket: u64,
}

impl TreeNode {
    pub fn id(&self) -> NodeId {
        self.segment.id()
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// `None` only for the root
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    /// Children in branch creation order
    pub fn child_ids(&self) -> &[NodeId] {
        &self.child_ids
    }

    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }
}

/// In-memory tree of learning nodes
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionTree {
    nodes: HashMap<NodeId, TreeNode>,
    root_id: Option<NodeId>,
    #[serde(skip)]
    next_ticket: u64,
}

/// Trees are equal when their nodes and linkage are; unused tickets don't count
impl PartialEq for SessionTree {
    fn eq(&self, other: &Self) -> bool {
        self.root_id == other.root_id && self.nodes == other.nodes
    }
}

impl SessionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Like [`get`](Self::get), but unknown ids are a `NotFound` error
    pub fn node(&self, id: &NodeId) -> Result<&TreeNode, SessionError> {
        self.nodes
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    /// Draw the ordering ticket for a child whose creation starts now
    pub(crate) fn reserve_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Insert the first node
    pub fn create_root(&mut self, segment: Segment) -> Result<NodeId, SessionError> {
        if !self.nodes.is_empty() {
            return Err(SessionError::invalid(
                "empty tree",
                format!("tree with {} node(s)", self.nodes.len()),
            ));
        }

        let id = segment.id();
        let ticket = self.reserve_ticket();
        self.nodes.insert(
            id,
            TreeNode {
                segment,
                parent_id: None,
                child_ids: Vec::new(),
                ticket,
            },
        );
        self.root_id = Some(id);
        Ok(id)
    }

    /// Append a new node as the last child of `parent_id`
    pub fn attach_child(
        &mut self,
        parent_id: &NodeId,
        segment: Segment,
    ) -> Result<NodeId, SessionError> {
        // Fail before drawing a ticket so a bad call leaves no trace
        self.node(parent_id)?;
        let ticket = self.reserve_ticket();
        self.attach_child_at(parent_id, segment, ticket)
    }

    /// Insert a child among its siblings according to `ticket`
    pub(crate) fn attach_child_at(
        &mut self,
        parent_id: &NodeId,
        segment: Segment,
        ticket: u64,
    ) -> Result<NodeId, SessionError> {
        let id = segment.id();
        if self.nodes.contains_key(&id) {
            return Err(SessionError::invalid(
                "unique node id",
                format!("node {id} already exists"),
            ));
        }

        let position = {
            let parent = self.node(parent_id)?;
            parent
                .child_ids
                .iter()
                .position(|child| {
                    self.nodes
                        .get(child)
                        .is_some_and(|sibling| sibling.ticket > ticket)
                })
                .unwrap_or(parent.child_ids.len())
        };

        self.nodes.insert(
            id,
            TreeNode {
                segment,
                parent_id: Some(*parent_id),
                child_ids: Vec::new(),
                ticket,
            },
        );
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.child_ids.insert(position, id);
        }
        Ok(id)
    }

    /// Record the user's answer on a question-bearing node
    pub fn record_answer(&mut self, id: &NodeId, answer: String) -> Result<(), SessionError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        node.segment.record_answer(answer)
    }

    /// Lazily walk from `id` up to the root
    pub fn path_to_root(&self, id: &NodeId) -> Result<PathToRoot<'_>, SessionError> {
        self.node(id)?;
        Ok(PathToRoot {
            tree: self,
            next: Some(*id),
        })
    }

    /// Nodes from the root down to `id`, inclusive
    pub fn path_from_root(&self, id: &NodeId) -> Result<Vec<&TreeNode>, SessionError> {
        let mut path: Vec<_> = self.path_to_root(id)?.collect();
        path.reverse();
        Ok(path)
    }

    /// First child of `id`: the default linear continuation
    pub fn next_child(&self, id: &NodeId) -> Result<Option<NodeId>, SessionError> {
        Ok(self.node(id)?.child_ids.first().copied())
    }

    /// Position of `id` among its siblings (root is index 0)
    ///
    /// Stable for the node's lifetime unless an earlier-issued sibling
    /// resolves later; branch palettes key off this.
    pub fn sibling_index(&self, id: &NodeId) -> Result<usize, SessionError> {
        let node = self.node(id)?;
        match node.parent_id {
            None => Ok(0),
            Some(parent_id) => {
                let parent = self.node(&parent_id)?;
                parent
                    .child_ids
                    .iter()
                    .position(|child| child == id)
                    .ok_or_else(|| {
                        SessionError::invalid(
                            format!("{id} listed under its parent"),
                            format!("{id} missing from {parent_id}"),
                        )
                    })
            }
        }
    }
}

/// Iterator from a node up to the root
///
/// Finite because the tree has no cycles; clone it (or call
/// [`SessionTree::path_to_root`] again) to restart.
#[derive(Debug, Clone)]
pub struct PathToRoot<'a> {
    tree: &'a SessionTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for PathToRoot<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.nodes.get(&self.next?)?;
        self.next = node.parent_id;
        Some(node)
    }
}
