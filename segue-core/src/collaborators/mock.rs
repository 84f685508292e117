//! Mock collaborators for testing
//!
//! Each mock replays a queue of scripted responses, one per call, and
//! records what it was called with. A response can be queued as deferred:
//! the call then stays in flight until the test sends the result through
//! the returned channel, which lets tests choose completion order.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::traits::{AnswerEvaluator, ClosingQuestionGenerator, SegmentGenerator};
use crate::closing::{ClosingPayload, ClosingResult};
use crate::context::LearningContext;
use crate::error::{EvaluationError, GenerationError};
use crate::policy::Evaluation;
use crate::segment::Segment;

/// Sender half used to resolve a deferred mock call
pub type Resolver<T, E> = oneshot::Sender<Result<T, E>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Step<T, E> {
    Ready(Result<T, E>),
    Deferred(oneshot::Receiver<Result<T, E>>),
}

/// Queue of scripted responses shared by the mocks
struct Script<T, E> {
    steps: Mutex<VecDeque<Step<T, E>>>,
}

impl<T, E> Script<T, E> {
    fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, result: Result<T, E>) {
        lock(&self.steps).push_back(Step::Ready(result));
    }

    fn push_deferred(&self) -> Resolver<T, E> {
        let (tx, rx) = oneshot::channel();
        lock(&self.steps).push_back(Step::Deferred(rx));
        tx
    }

    fn len(&self) -> usize {
        lock(&self.steps).len()
    }

    fn pop(&self) -> Option<Step<T, E>> {
        lock(&self.steps).pop_front()
    }
}

async fn resolve<T, E>(step: Step<T, E>, dropped: E) -> Result<T, E> {
    match step {
        Step::Ready(result) => result,
        Step::Deferred(rx) => rx.await.unwrap_or(Err(dropped)),
    }
}

// ==================== MockGenerator ====================

/// Scripted [`SegmentGenerator`]
pub struct MockGenerator {
    script: Script<Segment, GenerationError>,
    calls: Mutex<Vec<LearningContext>>,
    echo: bool,
}

impl MockGenerator {
    /// Generator that fails once its queue is empty
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
            echo: false,
        }
    }

    /// Generator that, once its queue is empty, answers every call with a
    /// question-less segment on the context's next topic and difficulty
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    pub fn queue_segment(&self, segment: Segment) {
        self.script.push(Ok(segment));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.script.push(Err(error));
    }

    /// Queue a response the test resolves later
    pub fn queue_deferred(&self) -> Resolver<Segment, GenerationError> {
        self.script.push_deferred()
    }

    pub fn queued_response_count(&self) -> usize {
        self.script.len()
    }

    /// Contexts received so far, in call order
    pub fn calls(&self) -> Vec<LearningContext> {
        lock(&self.calls).clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentGenerator for MockGenerator {
    async fn generate(&self, context: &LearningContext) -> Result<Segment, GenerationError> {
        lock(&self.calls).push(context.clone());

        match self.script.pop() {
            Some(step) => {
                resolve(
                    step,
                    GenerationError::Transport("Deferred response dropped".to_string()),
                )
                .await
            }
            None if self.echo => Ok(Segment::new(
                context.next_topic(),
                context.target_difficulty(),
            )),
            None => Err(GenerationError::Transport(
                "No queued response in MockGenerator".to_string(),
            )),
        }
    }
}

// ==================== MockEvaluator ====================

/// An evaluator call: `(answer, question, topic)`
pub type EvaluatorCall = (String, String, String);

/// Scripted [`AnswerEvaluator`]
pub struct MockEvaluator {
    script: Script<Evaluation, EvaluationError>,
    calls: Mutex<Vec<EvaluatorCall>>,
}

impl MockEvaluator {
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_evaluation(&self, evaluation: Evaluation) {
        self.script.push(Ok(evaluation));
    }

    pub fn queue_error(&self, error: EvaluationError) {
        self.script.push(Err(error));
    }

    pub fn queue_deferred(&self) -> Resolver<Evaluation, EvaluationError> {
        self.script.push_deferred()
    }

    pub fn calls(&self) -> Vec<EvaluatorCall> {
        lock(&self.calls).clone()
    }
}

impl Default for MockEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerEvaluator for MockEvaluator {
    async fn evaluate(
        &self,
        answer: &str,
        question: &str,
        topic: &str,
    ) -> Result<Evaluation, EvaluationError> {
        lock(&self.calls).push((answer.to_string(), question.to_string(), topic.to_string()));

        match self.script.pop() {
            Some(step) => {
                resolve(
                    step,
                    EvaluationError::Transport("Deferred response dropped".to_string()),
                )
                .await
            }
            None => Err(EvaluationError::Transport(
                "No queued response in MockEvaluator".to_string(),
            )),
        }
    }
}

// ==================== MockClosingGenerator ====================

/// Scripted [`ClosingQuestionGenerator`]
pub struct MockClosingGenerator {
    script: Script<ClosingResult, GenerationError>,
    calls: Mutex<Vec<ClosingPayload>>,
}

impl MockClosingGenerator {
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_question(&self, question: impl Into<String>) {
        self.script.push(Ok(ClosingResult {
            question: question.into(),
        }));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.script.push(Err(error));
    }

    pub fn queue_deferred(&self) -> Resolver<ClosingResult, GenerationError> {
        self.script.push_deferred()
    }

    /// Payloads received so far, in call order
    pub fn calls(&self) -> Vec<ClosingPayload> {
        lock(&self.calls).clone()
    }
}

impl Default for MockClosingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClosingQuestionGenerator for MockClosingGenerator {
    async fn generate_closing(
        &self,
        payload: &ClosingPayload,
    ) -> Result<ClosingResult, GenerationError> {
        lock(&self.calls).push(payload.clone());

        match self.script.pop() {
            Some(step) => {
                resolve(
                    step,
                    GenerationError::Transport("Deferred response dropped".to_string()),
                )
                .await
            }
            None => Err(GenerationError::Transport(
                "No queued response in MockClosingGenerator".to_string(),
            )),
        }
    }
}
