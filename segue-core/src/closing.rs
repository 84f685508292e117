//! Closing reflection flow
//!
//! When the learner reaches the designated end of the session, the path
//! from the root to that leaf is condensed into a [`ClosingPayload`] once.
//! The payload is cached on the [`ClosingFlow`], so retries resend exactly
//! what the first attempt sent regardless of later tree changes.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::request::RequestId;
use crate::segment::NodeId;
use crate::session::VideoSession;

/// One narrated section of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingSection {
    /// 1-based position among the narrated sections
    pub index: usize,
    pub script: String,
}

/// A question the learner answered along the way
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingResponse {
    pub prompt: String,
    pub answer: String,
}

/// Transcript sent to the closing-question generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingPayload {
    pub topic: String,
    pub sections: Vec<ClosingSection>,
    pub responses: Vec<ClosingResponse>,
    pub summary: Option<String>,
}

impl ClosingPayload {
    /// Condense the root → `terminal` path of `session`
    pub fn assemble(
        session: &VideoSession,
        terminal: &NodeId,
        separator: &str,
    ) -> Result<Self, SessionError> {
        let path = session.tree().path_from_root(terminal)?;

        let sections = path
            .iter()
            .filter_map(|node| node.segment().meta.voiceover.as_deref())
            .filter(|script| !script.trim().is_empty())
            .enumerate()
            .map(|(i, script)| ClosingSection {
                index: i + 1,
                script: script.to_string(),
            })
            .collect();

        let responses = path
            .iter()
            .filter_map(|node| {
                let segment = node.segment();
                Some(ClosingResponse {
                    prompt: segment.question_text()?.to_string(),
                    answer: segment.user_answer()?.to_string(),
                })
            })
            .collect();

        let context = session.context();
        let summary = if context.history_topics().is_empty() {
            context.initial_topic().to_string()
        } else {
            context.history_topics().join(separator)
        };

        Ok(Self {
            topic: context.initial_topic().to_string(),
            sections,
            responses,
            summary: Some(summary),
        })
    }
}

/// Generator's answer to a closing payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingResult {
    pub question: String,
}

/// State of the one-shot closing step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingFlow {
    terminal_node_id: NodeId,
    payload: ClosingPayload,
    question: Option<String>,
    attempts: u32,
    #[serde(skip)]
    in_flight: Option<RequestId>,
}

impl ClosingFlow {
    pub(crate) fn capture(
        session: &VideoSession,
        terminal: &NodeId,
        separator: &str,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            terminal_node_id: *terminal,
            payload: ClosingPayload::assemble(session, terminal, separator)?,
            question: None,
            attempts: 0,
            in_flight: None,
        })
    }

    pub fn terminal_node_id(&self) -> NodeId {
        self.terminal_node_id
    }

    pub fn payload(&self) -> &ClosingPayload {
        &self.payload
    }

    /// The reflective question, once generated
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// How many closing requests have been issued
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub(crate) fn begin_attempt(&mut self, request_id: RequestId) -> ClosingPayload {
        self.attempts += 1;
        self.in_flight = Some(request_id);
        self.payload.clone()
    }

    pub(crate) fn finish(&mut self, request_id: &RequestId, question: Option<String>) {
        if self.in_flight == Some(*request_id) {
            self.in_flight = None;
        }
        if question.is_some() {
            self.question = question;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Difficulty;
    use crate::segment::Segment;

    fn narrated_session() -> (VideoSession, NodeId, NodeId) {
        let mut session = VideoSession::new("Photosynthesis", Difficulty::Easy);
        let root = session
            .insert_root(
                Segment::new("Photosynthesis", Difficulty::Easy)
                    .with_voiceover("Plants turn light into sugar.")
                    .with_question("What do plants make?"),
            )
            .unwrap();
        session.record_answer(&root, "Sugar".to_string()).unwrap();
        session.set_context(
            session
                .context()
                .complete_node("Photosynthesis")
                .complete_node("Chlorophyll"),
        );

        let ticket = session.reserve_ticket();
        let silent = session
            .attach(&root, Segment::new("Chlorophyll", Difficulty::Easy), ticket, true)
            .unwrap();
        let ticket = session.reserve_ticket();
        let leaf = session
            .attach(
                &silent,
                Segment::new("Chlorophyll", Difficulty::Medium)
                    .with_voiceover("Chlorophyll absorbs red and blue light.")
                    .with_question("Which colour is reflected?"),
                ticket,
                true,
            )
            .unwrap();
        (session, root, leaf)
    }

    // ==================== Payload Tests ====================

    #[test]
    fn assemble_numbers_narrated_sections_in_path_order() {
        let (session, _, leaf) = narrated_session();

        let payload = ClosingPayload::assemble(&session, &leaf, " → ").unwrap();

        assert_eq!(payload.topic, "Photosynthesis");
        assert_eq!(payload.sections.len(), 2);
        assert_eq!(payload.sections[0].index, 1);
        assert_eq!(payload.sections[0].script, "Plants turn light into sugar.");
        assert_eq!(payload.sections[1].index, 2);
    }

    #[test]
    fn assemble_only_includes_answered_questions() {
        let (session, _, leaf) = narrated_session();

        let payload = ClosingPayload::assemble(&session, &leaf, " → ").unwrap();

        assert_eq!(
            payload.responses,
            [ClosingResponse {
                prompt: "What do plants make?".to_string(),
                answer: "Sugar".to_string(),
            }]
        );
    }

    #[test]
    fn assemble_joins_history_for_summary() {
        let (session, _, leaf) = narrated_session();

        let payload = ClosingPayload::assemble(&session, &leaf, " → ").unwrap();

        assert_eq!(
            payload.summary.as_deref(),
            Some("Photosynthesis → Chlorophyll")
        );
    }

    #[test]
    fn assemble_ignores_nodes_off_the_path() {
        let (mut session, root, leaf) = narrated_session();
        let ticket = session.reserve_ticket();
        session
            .attach(
                &root,
                Segment::new("Side", Difficulty::Easy).with_voiceover("Off path"),
                ticket,
                false,
            )
            .unwrap();

        let payload = ClosingPayload::assemble(&session, &leaf, " → ").unwrap();

        assert!(payload.sections.iter().all(|s| s.script != "Off path"));
    }

    #[test]
    fn assemble_unknown_terminal_fails() {
        let (session, _, _) = narrated_session();
        let result = ClosingPayload::assemble(&session, &NodeId::new(), " → ");
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    // ==================== Flow Tests ====================

    #[test]
    fn flow_payload_survives_tree_changes() {
        let (mut session, _, leaf) = narrated_session();
        let mut flow = ClosingFlow::capture(&session, &leaf, " → ").unwrap();
        let first = flow.begin_attempt(RequestId::new());

        session.record_answer(&leaf, "Green".to_string()).unwrap();
        let second = flow.begin_attempt(RequestId::new());

        assert_eq!(first, second);
        assert_eq!(flow.attempts(), 2);
    }

    #[test]
    fn finish_records_question_and_clears_in_flight() {
        let (session, _, leaf) = narrated_session();
        let mut flow = ClosingFlow::capture(&session, &leaf, " → ").unwrap();
        let id = RequestId::new();
        flow.begin_attempt(id);

        flow.finish(&id, Some("What surprised you?".to_string()));

        assert_eq!(flow.question(), Some("What surprised you?"));
        assert!(flow.in_flight().is_none());
    }
}
