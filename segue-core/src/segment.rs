//! Segment type definitions
//!
//! A [`Segment`] is one generated unit of learning content: a short video
//! section, optionally followed by a comprehension question.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::Difficulty;
use crate::error::{SessionError, ValidationError};

/// Unique identifier for a segment and the tree node that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new node ID using UUID v7 (time-ordered)
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation metadata, passed through the core unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub title: Option<String>,
    /// Reference to a stored thumbnail image
    pub thumbnail: Option<String>,
    /// Voiceover script read over the video
    pub voiceover: Option<String>,
    /// Anything else the renderer attached
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One generated unit of learning content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    id: NodeId,
    pub topic: String,
    pub difficulty: Difficulty,
    question: Option<String>,
    user_answer: Option<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: SegmentMeta,
}

impl Segment {
    /// Create a question-less segment with a fresh id
    pub fn new(topic: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            id: NodeId::new(),
            topic: topic.into(),
            difficulty,
            question: None,
            user_answer: None,
            generated_at: Utc::now(),
            meta: SegmentMeta::default(),
        }
    }

    /// Attach a comprehension question
    #[must_use]
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: SegmentMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Shorthand for setting only the voiceover script
    #[must_use]
    pub fn with_voiceover(mut self, script: impl Into<String>) -> Self {
        self.meta.voiceover = Some(script.into());
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn has_question(&self) -> bool {
        self.question.is_some()
    }

    pub fn question_text(&self) -> Option<&str> {
        self.question.as_deref()
    }

    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    /// A question is waiting for the user's answer
    pub fn is_open(&self) -> bool {
        self.question.is_some() && self.user_answer.is_none()
    }

    /// Check the structural rules a generated segment must satisfy
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic(self.id));
        }
        if let Some(question) = &self.question
            && question.trim().is_empty()
        {
            return Err(ValidationError::EmptyQuestion(self.id));
        }
        Ok(())
    }

    /// Set the user's answer; answers are write-once
    pub(crate) fn record_answer(&mut self, answer: String) -> Result<(), SessionError> {
        if self.question.is_none() {
            return Err(SessionError::invalid(
                "segment with a question",
                format!("segment {} has no question", self.id),
            ));
        }
        if self.user_answer.is_some() {
            return Err(SessionError::AlreadyAnswered(self.id));
        }
        self.user_answer = Some(answer);
        Ok(())
    }
}
