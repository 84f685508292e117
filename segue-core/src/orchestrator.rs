//! Generation orchestrator
//!
//! The orchestrator is the only writer of a session. Every operation runs as
//! synchronous critical sections around a single suspension point, the call
//! into a collaborator:
//!
//! ```text
//! issue (lock) ──► collaborator.await ──► complete (lock)
//!   pending → generating                    is request still tracked?
//!   placement + sibling ticket              validate → attach → events
//! ```
//!
//! The lock is never held across an await, so observers only ever see the
//! state before or after a transition. Requests may be in flight
//! concurrently and resolve in any order; sibling order follows issuance.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::closing::ClosingFlow;
use crate::collaborators::Collaborators;
use crate::config::{ConfigLoader, SegueConfig, SessionConfig};
use crate::context::LearningContext;
use crate::error::{GenerationError, SegueError, SessionError, ValidationError};
use crate::events::{EventBus, MemoryEventBus, SegueEvent};
use crate::policy;
use crate::request::{GenerationRequest, RequestId, RequestKind, RequestTracker};
use crate::segment::{NodeId, Segment};
use crate::session::VideoSession;

/// How a requested segment relates to the playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachMode {
    /// Continue linearly from the playhead when it is a finished leaf
    #[default]
    Advance,
    /// Like `Advance`, but allowed past an unanswered question
    Skip,
    /// Add a sibling path; the playhead stays put
    Branch,
}

/// Parameters of a segment request
#[derive(Debug, Clone, Default)]
pub struct SegmentRequest {
    /// Parent node; `None` means the playhead (or the root when empty)
    pub attach_to: Option<NodeId>,
    pub mode: AttachMode,
    /// Context to generate from; `None` uses the session's context
    pub context: Option<LearningContext>,
}

impl SegmentRequest {
    /// Next segment after the playhead
    pub fn next() -> Self {
        Self::default()
    }

    /// Next segment after the playhead, skipping its open question
    pub fn skip() -> Self {
        Self {
            mode: AttachMode::Skip,
            ..Self::default()
        }
    }

    /// Additional child of `parent_id`
    pub fn branch_from(parent_id: NodeId) -> Self {
        Self {
            attach_to: Some(parent_id),
            mode: AttachMode::Branch,
            context: None,
        }
    }

    /// Child of `parent_id`, advancing only if it is the playhead
    pub fn attach_to(parent_id: NodeId) -> Self {
        Self {
            attach_to: Some(parent_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: LearningContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// How a request ended, from the caller's point of view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    /// A node joined the tree
    Attached {
        request_id: RequestId,
        node_id: NodeId,
        advanced: bool,
    },
    /// The closing reflection question is ready
    ClosingQuestion {
        request_id: RequestId,
        question: String,
    },
    /// The collaborator failed; the tree is unchanged
    Failed {
        request_id: RequestId,
        message: String,
    },
    /// The request was dismissed while in flight; its result was discarded
    Dropped { request_id: RequestId },
}

impl RequestOutcome {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Attached { request_id, .. }
            | Self::ClosingQuestion { request_id, .. }
            | Self::Failed { request_id, .. }
            | Self::Dropped { request_id } => *request_id,
        }
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Attached { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of moving the playhead
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub node_id: NodeId,
    /// This move captured the closing payload
    pub closing_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdvancePolicy {
    Never,
    /// Linear advance: only while the parent is still a leaf and the playhead
    IfLeaf,
    /// Chained after an evaluation
    Always,
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Root,
    Child {
        parent_id: NodeId,
        ticket: u64,
        advance: AdvancePolicy,
    },
}

struct IssuedSegment {
    request_id: RequestId,
    placement: Placement,
    context: LearningContext,
}

struct PendingEvaluation {
    request_id: RequestId,
    node_id: NodeId,
    answer: String,
    question: String,
    topic: String,
}

struct Shared {
    session: VideoSession,
    requests: RequestTracker,
    closing: Option<ClosingFlow>,
    /// Nodes whose completion the context already counts
    counted: HashSet<NodeId>,
    /// Nodes whose answer has been folded into the context
    evaluated: HashSet<NodeId>,
}

/// Drives one session: issues collaborator calls and splices results in
pub struct Orchestrator {
    shared: Mutex<Shared>,
    collaborators: Collaborators,
    event_bus: Arc<dyn EventBus>,
    config: SessionConfig,
}

impl Orchestrator {
    /// Start a root-pending session on `topic`
    pub fn new(
        topic: impl Into<String>,
        collaborators: Collaborators,
        event_bus: Arc<dyn EventBus>,
        config: &SegueConfig,
    ) -> Self {
        let topic = topic.into();
        let session = VideoSession::new(topic.clone(), config.session.initial_difficulty);
        info!(topic = %topic, "Session started");
        event_bus.publish(SegueEvent::SessionStarted { topic });

        Self {
            shared: Mutex::new(Shared {
                session,
                requests: RequestTracker::new(),
                closing: None,
                counted: HashSet::new(),
                evaluated: HashSet::new(),
            }),
            collaborators,
            event_bus,
            config: config.session.clone(),
        }
    }

    /// Start a session with default config and an in-memory event bus
    pub fn with_defaults(topic: impl Into<String>, collaborators: Collaborators) -> Self {
        Self::with_memory_bus(topic, collaborators, &SegueConfig::default())
    }

    /// Start a session configured from the user and project config files
    pub fn from_config(
        topic: impl Into<String>,
        collaborators: Collaborators,
    ) -> Result<Self, SegueError> {
        let config = ConfigLoader::load()?;
        Ok(Self::with_memory_bus(topic, collaborators, &config))
    }

    /// Start a session configured from a single config file
    pub fn from_config_file(
        topic: impl Into<String>,
        collaborators: Collaborators,
        path: &Path,
    ) -> Result<Self, SegueError> {
        let config = ConfigLoader::load_from(path)?;
        Ok(Self::with_memory_bus(topic, collaborators, &config))
    }

    fn with_memory_bus(
        topic: impl Into<String>,
        collaborators: Collaborators,
        config: &SegueConfig,
    ) -> Self {
        let event_bus: Arc<dyn EventBus> = Arc::new(MemoryEventBus::new(config.events.capacity));
        Self::new(topic, collaborators, event_bus, config)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Queries ===

    /// Read-only copy of the session for presentation
    pub fn snapshot(&self) -> VideoSession {
        self.lock().session.clone()
    }

    /// Run `f` against the live session without copying it
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&VideoSession) -> R,
    {
        f(&self.lock().session)
    }

    /// Tracked requests in issuance order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.iter().cloned().collect()
    }

    pub fn request(&self, id: &RequestId) -> Option<GenerationRequest> {
        self.lock().requests.get(id).cloned()
    }

    /// Closing flow, once the designated end has been reached
    pub fn closing(&self) -> Option<ClosingFlow> {
        self.lock().closing.clone()
    }

    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        self.event_bus.clone()
    }

    // === Segment requests ===

    /// Generate a segment and attach it (see [`SegmentRequest`])
    ///
    /// Contract violations are returned as errors before anything is issued.
    /// Collaborator failures come back as [`RequestOutcome::Failed`].
    pub async fn request_segment(
        &self,
        request: SegmentRequest,
    ) -> Result<RequestOutcome, SessionError> {
        let issued = {
            let mut shared = self.lock();
            self.issue_segment(&mut shared, request)?
        };

        let result = self.collaborators.generator.generate(&issued.context).await;

        let mut shared = self.lock();
        Ok(self.finish_segment(&mut shared, issued, result))
    }

    /// Record an answer, evaluate it, adapt the context and generate the
    /// follow-up segment under the answered node
    ///
    /// The answer stays recorded even if evaluation or generation fails.
    pub async fn evaluate_and_advance(
        &self,
        node_id: NodeId,
        answer: impl Into<String>,
    ) -> Result<RequestOutcome, SessionError> {
        let answer = answer.into();
        let pending = {
            let mut shared = self.lock();
            shared.session.record_answer(&node_id, answer.clone())?;
            self.event_bus.publish(SegueEvent::AnswerRecorded { node_id });
            self.issue_evaluation(&mut shared, node_id, answer)?
        };
        self.evaluate_and_chain(pending).await
    }

    /// Evaluate the answer already recorded on `node_id` and continue as
    /// [`evaluate_and_advance`](Self::evaluate_and_advance) does
    ///
    /// Only answers that have not yet been evaluated successfully qualify,
    /// and only while no other evaluation of the node is in flight.
    pub async fn retry_evaluation(&self, node_id: NodeId) -> Result<RequestOutcome, SessionError> {
        let pending = {
            let mut shared = self.lock();
            let answer = shared
                .session
                .tree()
                .node(&node_id)?
                .segment()
                .user_answer()
                .map(str::to_string)
                .ok_or_else(|| {
                    SessionError::invalid("a recorded answer", format!("no answer on node {node_id}"))
                })?;
            if shared.evaluated.contains(&node_id) {
                return Err(SessionError::invalid(
                    "an unevaluated answer",
                    format!("answer on node {node_id} already evaluated"),
                ));
            }
            let evaluating = RequestKind::EvaluateAnswer { node_id };
            if let Some(request) = shared.requests.in_flight().find(|r| r.kind == evaluating) {
                return Err(SessionError::invalid(
                    "no evaluation in flight",
                    format!("request {} in flight", request.id),
                ));
            }
            self.issue_evaluation(&mut shared, node_id, answer)?
        };
        self.evaluate_and_chain(pending).await
    }

    async fn evaluate_and_chain(
        &self,
        pending: PendingEvaluation,
    ) -> Result<RequestOutcome, SessionError> {
        let result = self
            .collaborators
            .evaluator
            .evaluate(&pending.answer, &pending.question, &pending.topic)
            .await;
        let evaluation_id = pending.request_id;
        let node_id = pending.node_id;

        let issued = {
            let mut shared = self.lock();
            if !shared.requests.is_tracked(&evaluation_id) {
                return Ok(self.drop_orphan(evaluation_id));
            }
            let evaluation = match result {
                Ok(evaluation) => evaluation,
                Err(e) => return Ok(self.fail(&mut shared, evaluation_id, e.to_string())),
            };
            self.transition(&mut shared, evaluation_id, |r| r.complete(None));
            self.event_bus.publish(SegueEvent::RequestCompleted {
                request_id: evaluation_id,
                node_id: None,
            });

            let completed = shared.session.tree().node(&node_id)?.segment().clone();
            let next = if shared.counted.insert(node_id) {
                policy::apply(shared.session.context(), &completed, &evaluation)
            } else {
                policy::adapt(shared.session.context(), &completed, &evaluation)
            };
            shared.evaluated.insert(node_id);
            info!(
                request_id = %evaluation_id,
                correct = evaluation.correct,
                bias = ?next.bias(),
                depth = next.depth(),
                "Answer evaluated"
            );
            self.update_context(&mut shared, next.clone());

            let ticket = shared.session.reserve_ticket();
            let summary = segment_summary("new_segment", &next);
            let request_id = self.start_request(
                &mut shared,
                RequestKind::NewSegment {
                    attach_to: Some(node_id),
                },
                summary,
            );
            IssuedSegment {
                request_id,
                placement: Placement::Child {
                    parent_id: node_id,
                    ticket,
                    advance: AdvancePolicy::Always,
                },
                context: next,
            }
        };

        let result = self.collaborators.generator.generate(&issued.context).await;

        let mut shared = self.lock();
        Ok(self.finish_segment(&mut shared, issued, result))
    }

    // === Closing reflection ===

    /// Flag the session as being at its designated end
    ///
    /// Returns true if the playhead already sits on a leaf and the closing
    /// payload was captured by this call.
    pub fn mark_designated_end(&self) -> bool {
        let mut shared = self.lock();
        shared.session.mark_designated_end();
        self.check_closing(&mut shared)
    }

    /// Send the cached closing payload to the closing-question generator
    ///
    /// Each call after a failure is a fresh request carrying the identical
    /// payload.
    pub async fn request_closing_question(&self) -> Result<RequestOutcome, SessionError> {
        let (request_id, payload) = {
            let mut guard = self.lock();
            let shared = &mut *guard;
            let flow = shared.closing.as_ref().ok_or_else(|| {
                SessionError::invalid("closing flow at the designated end", "no closing flow")
            })?;
            if flow.question().is_some() {
                return Err(SessionError::invalid(
                    "closing question not yet generated",
                    "closing question already generated",
                ));
            }
            if let Some(previous) = flow.in_flight()
                && shared
                    .requests
                    .get(&previous)
                    .is_some_and(|r| !r.is_terminal())
            {
                return Err(SessionError::invalid(
                    "no closing request in flight",
                    format!("request {previous} in flight"),
                ));
            }

            let summary = format!("closing question for \"{}\"", flow.payload().topic);
            let request_id = self.start_request(shared, RequestKind::ClosingQuestion, summary);
            let payload = shared
                .closing
                .as_mut()
                .map(|flow| flow.begin_attempt(request_id))
                .ok_or_else(|| SessionError::invalid("closing flow", "no closing flow"))?;
            (request_id, payload)
        };

        let result = self.collaborators.closing.generate_closing(&payload).await;

        let mut shared = self.lock();
        if !shared.requests.is_tracked(&request_id) {
            if let Some(flow) = shared.closing.as_mut() {
                flow.finish(&request_id, None);
            }
            return Ok(self.drop_orphan(request_id));
        }

        let question = match result {
            Ok(closing) if closing.question.trim().is_empty() => {
                Err(ValidationError::EmptyClosingQuestion.to_string())
            }
            Ok(closing) => Ok(closing.question),
            Err(e) => Err(e.to_string()),
        };

        match question {
            Ok(question) => {
                if let Some(flow) = shared.closing.as_mut() {
                    flow.finish(&request_id, Some(question.clone()));
                }
                self.transition(&mut shared, request_id, |r| r.complete(None));
                self.event_bus.publish(SegueEvent::RequestCompleted {
                    request_id,
                    node_id: None,
                });
                info!(request_id = %request_id, "Closing question generated");
                Ok(RequestOutcome::ClosingQuestion {
                    request_id,
                    question,
                })
            }
            Err(message) => {
                if let Some(flow) = shared.closing.as_mut() {
                    flow.finish(&request_id, None);
                }
                Ok(self.fail(&mut shared, request_id, message))
            }
        }
    }

    // === Navigation and context ===

    /// Move the playhead; content and context are untouched
    pub fn navigate_to(&self, node_id: NodeId) -> Result<Navigation, SessionError> {
        let mut shared = self.lock();
        self.move_playhead(&mut shared, node_id)
    }

    /// Follow the first child of the playhead, if any
    pub fn navigate_next(&self) -> Result<Option<Navigation>, SessionError> {
        let mut shared = self.lock();
        let current = shared
            .session
            .current_node_id()
            .ok_or_else(|| SessionError::invalid("a current node", "root still pending"))?;
        match shared.session.tree().next_child(&current)? {
            Some(next) => self.move_playhead(&mut shared, next).map(Some),
            None => Ok(None),
        }
    }

    /// Explicitly change topic: depth resets and the topic is logged
    pub fn pivot_topic(&self, topic: impl Into<String>) -> Result<(), SessionError> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(SessionError::invalid("non-empty topic", "empty topic"));
        }
        let mut shared = self.lock();
        let next = shared.session.context().pivot(&topic);
        info!(topic = %topic, "Topic pivot");
        self.update_context(&mut shared, next);
        Ok(())
    }

    /// Stop tracking a request
    ///
    /// An in-flight call is not cancelled; whatever it returns is dropped.
    pub fn dismiss(&self, request_id: RequestId) -> Result<GenerationRequest, SessionError> {
        let mut shared = self.lock();
        let request = shared
            .requests
            .dismiss(&request_id)
            .ok_or_else(|| SessionError::NotFound(request_id.to_string()))?;
        let was_terminal = request.is_terminal();
        if !was_terminal {
            debug!(request_id = %request_id, "Dismissed in-flight request");
        }
        self.event_bus.publish(SegueEvent::RequestDismissed {
            request_id,
            was_terminal,
        });
        Ok(request)
    }

    // === Internals (all synchronous) ===

    fn issue_segment(
        &self,
        shared: &mut Shared,
        request: SegmentRequest,
    ) -> Result<IssuedSegment, SessionError> {
        let (kind, placement) = plan(&mut shared.session, request.attach_to, request.mode)?;
        let context = request
            .context
            .unwrap_or_else(|| shared.session.context().clone());
        let summary = segment_summary(kind.as_str(), &context);
        let request_id = self.start_request(shared, kind, summary);
        Ok(IssuedSegment {
            request_id,
            placement,
            context,
        })
    }

    fn issue_evaluation(
        &self,
        shared: &mut Shared,
        node_id: NodeId,
        answer: String,
    ) -> Result<PendingEvaluation, SessionError> {
        let segment = shared.session.tree().node(&node_id)?.segment();
        let question = segment.question_text().unwrap_or_default().to_string();
        let topic = segment.topic.clone();
        let summary = format!("evaluate answer on \"{topic}\"");
        let request_id = self.start_request(shared, RequestKind::EvaluateAnswer { node_id }, summary);
        Ok(PendingEvaluation {
            request_id,
            node_id,
            answer,
            question,
            topic,
        })
    }

    /// Track a new request and move it straight to `generating`
    fn start_request(&self, shared: &mut Shared, kind: RequestKind, summary: String) -> RequestId {
        let kind_name = kind.as_str();
        let request_id = shared.requests.issue(kind, summary.clone());
        self.event_bus.publish(SegueEvent::RequestIssued {
            request_id,
            kind: kind_name.to_string(),
            summary,
        });

        self.transition(shared, request_id, GenerationRequest::mark_generating);
        self.event_bus
            .publish(SegueEvent::RequestGenerating { request_id });
        debug!(request_id = %request_id, kind = kind_name, "Request dispatched");
        request_id
    }

    fn transition<F>(&self, shared: &mut Shared, request_id: RequestId, f: F)
    where
        F: FnOnce(&mut GenerationRequest) -> Result<(), SessionError>,
    {
        if let Some(request) = shared.requests.get_mut(&request_id)
            && let Err(e) = f(request)
        {
            warn!(request_id = %request_id, error = %e, "Unexpected request transition");
        }
    }

    fn finish_segment(
        &self,
        shared: &mut Shared,
        issued: IssuedSegment,
        result: Result<Segment, GenerationError>,
    ) -> RequestOutcome {
        let request_id = issued.request_id;
        if !shared.requests.is_tracked(&request_id) {
            return self.drop_orphan(request_id);
        }

        let segment = match result {
            Ok(segment) => segment,
            Err(e) => return self.fail(shared, request_id, e.to_string()),
        };
        if let Err(e) = segment.validate() {
            return self.fail(shared, request_id, e.to_string());
        }
        if shared.session.tree().contains(&segment.id()) {
            let message = ValidationError::DuplicateId(segment.id()).to_string();
            return self.fail(shared, request_id, message);
        }

        let (node_id, advanced) = match issued.placement {
            Placement::Root => match shared.session.insert_root(segment) {
                Ok(id) => (id, true),
                Err(e) => return self.fail(shared, request_id, e.to_string()),
            },
            Placement::Child {
                parent_id,
                ticket,
                advance,
            } => {
                let advance_now = match advance {
                    AdvancePolicy::Never => false,
                    AdvancePolicy::Always => true,
                    AdvancePolicy::IfLeaf => {
                        shared.session.current_node_id() == Some(parent_id)
                            && shared
                                .session
                                .tree()
                                .get(&parent_id)
                                .is_some_and(|parent| parent.is_leaf())
                    }
                };
                match shared
                    .session
                    .attach(&parent_id, segment, ticket, advance_now)
                {
                    Ok(id) => {
                        if advance == AdvancePolicy::IfLeaf && advance_now {
                            self.complete_parent(shared, &parent_id);
                        }
                        (id, advance_now)
                    }
                    Err(e) => return self.fail(shared, request_id, e.to_string()),
                }
            }
        };

        self.transition(shared, request_id, |r| r.complete(Some(node_id)));

        let tree = shared.session.tree();
        let parent_id = tree.get(&node_id).and_then(|n| n.parent_id());
        let sibling_index = tree.sibling_index(&node_id).unwrap_or_default();
        self.event_bus.publish(SegueEvent::NodeAttached {
            node_id,
            parent_id,
            sibling_index,
        });
        self.event_bus.publish(SegueEvent::RequestCompleted {
            request_id,
            node_id: Some(node_id),
        });
        info!(
            request_id = %request_id,
            node_id = %node_id,
            sibling_index,
            advanced,
            "Segment attached"
        );

        if advanced {
            self.event_bus
                .publish(SegueEvent::PlayheadMoved { node_id });
            self.check_closing(shared);
        }

        RequestOutcome::Attached {
            request_id,
            node_id,
            advanced,
        }
    }

    fn fail(&self, shared: &mut Shared, request_id: RequestId, message: String) -> RequestOutcome {
        warn!(request_id = %request_id, error = %message, "Request failed");
        let failure = message.clone();
        self.transition(shared, request_id, move |r| r.fail(failure));
        self.event_bus.publish(SegueEvent::RequestFailed {
            request_id,
            message: message.clone(),
        });
        RequestOutcome::Failed {
            request_id,
            message,
        }
    }

    fn drop_orphan(&self, request_id: RequestId) -> RequestOutcome {
        debug!(request_id = %request_id, "Dropping result of dismissed request");
        self.event_bus
            .publish(SegueEvent::OrphanDropped { request_id });
        RequestOutcome::Dropped { request_id }
    }

    /// Linear advance past `parent_id` counts it as completed, once
    fn complete_parent(&self, shared: &mut Shared, parent_id: &NodeId) {
        if !shared.counted.insert(*parent_id) {
            return;
        }
        let Some(topic) = shared
            .session
            .tree()
            .get(parent_id)
            .map(|parent| parent.segment().topic.clone())
        else {
            return;
        };
        let next = shared.session.context().complete_node(&topic);
        self.update_context(shared, next);
    }

    fn update_context(&self, shared: &mut Shared, next: LearningContext) {
        self.event_bus.publish(SegueEvent::ContextUpdated {
            depth: next.depth(),
            next_topic: next.next_topic().to_string(),
            target_difficulty: next.target_difficulty(),
            bias: next.bias(),
        });
        shared.session.set_context(next);
    }

    fn move_playhead(
        &self,
        shared: &mut Shared,
        node_id: NodeId,
    ) -> Result<Navigation, SessionError> {
        shared.session.navigate_to(&node_id)?;
        self.event_bus
            .publish(SegueEvent::PlayheadMoved { node_id });
        let closing_ready = self.check_closing(shared);
        Ok(Navigation {
            node_id,
            closing_ready,
        })
    }

    /// Capture the closing payload the first time the playhead rests on a
    /// leaf of a session flagged as ended
    fn check_closing(&self, shared: &mut Shared) -> bool {
        if shared.closing.is_some() || !shared.session.is_at_designated_end() {
            return false;
        }
        let terminal = match shared.session.current_node() {
            Some(node) if node.is_leaf() => node.id(),
            _ => return false,
        };

        match ClosingFlow::capture(&shared.session, &terminal, &self.config.topic_separator) {
            Ok(flow) => {
                info!(
                    terminal_node_id = %terminal,
                    sections = flow.payload().sections.len(),
                    responses = flow.payload().responses.len(),
                    "Closing payload captured"
                );
                shared.closing = Some(flow);
                self.event_bus.publish(SegueEvent::ClosingReady {
                    terminal_node_id: terminal,
                });
                true
            }
            Err(e) => {
                warn!(terminal_node_id = %terminal, error = %e, "Failed to capture closing payload");
                false
            }
        }
    }
}

/// Decide request kind and placement from the current tree
fn plan(
    session: &mut VideoSession,
    attach_to: Option<NodeId>,
    mode: AttachMode,
) -> Result<(RequestKind, Placement), SessionError> {
    if session.tree().is_empty() {
        if let Some(id) = attach_to {
            return Err(SessionError::NotFound(id.to_string()));
        }
        if mode == AttachMode::Branch {
            return Err(SessionError::invalid(
                "an existing node to branch from",
                "empty tree",
            ));
        }
        return Ok((RequestKind::NewSegment { attach_to: None }, Placement::Root));
    }

    let parent_id = attach_to
        .or(session.current_node_id())
        .ok_or_else(|| SessionError::invalid("a current node", "no current node"))?;
    let (is_leaf, is_open) = {
        let parent = session.tree().node(&parent_id)?;
        (parent.is_leaf(), parent.segment().is_open())
    };
    let is_current = session.current_node_id() == Some(parent_id);

    if mode == AttachMode::Branch || !is_leaf {
        let ticket = session.reserve_ticket();
        return Ok((
            RequestKind::Branch { parent_id },
            Placement::Child {
                parent_id,
                ticket,
                advance: AdvancePolicy::Never,
            },
        ));
    }

    let advance = if is_current {
        if is_open && mode != AttachMode::Skip {
            return Err(SessionError::invalid(
                "answered question or explicit skip",
                format!("unanswered question on node {parent_id}"),
            ));
        }
        AdvancePolicy::IfLeaf
    } else {
        AdvancePolicy::Never
    };

    let ticket = session.reserve_ticket();
    Ok((
        RequestKind::NewSegment {
            attach_to: Some(parent_id),
        },
        Placement::Child {
            parent_id,
            ticket,
            advance,
        },
    ))
}

fn segment_summary(kind: &str, context: &LearningContext) -> String {
    format!(
        "{kind} on \"{}\" ({})",
        context.next_topic(),
        context.target_difficulty()
    )
}
