//! Collaborator traits
//!
//! Each call is a single attempt: the core performs no retries and has no
//! timeouts of its own, so implementations must eventually resolve.

use std::sync::Arc;

use async_trait::async_trait;

use crate::closing::{ClosingPayload, ClosingResult};
use crate::context::LearningContext;
use crate::error::{EvaluationError, GenerationError};
use crate::policy::Evaluation;
use crate::segment::Segment;

/// Produces the next segment for a learning context
#[async_trait]
pub trait SegmentGenerator: Send + Sync {
    /// Generate one segment; the returned segment carries a fresh id
    async fn generate(&self, context: &LearningContext) -> Result<Segment, GenerationError>;
}

/// Judges a learner's answer
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        answer: &str,
        question: &str,
        topic: &str,
    ) -> Result<Evaluation, EvaluationError>;
}

/// Writes the closing reflection question
#[async_trait]
pub trait ClosingQuestionGenerator: Send + Sync {
    async fn generate_closing(
        &self,
        payload: &ClosingPayload,
    ) -> Result<ClosingResult, GenerationError>;
}

/// The three collaborators an orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn SegmentGenerator>,
    pub evaluator: Arc<dyn AnswerEvaluator>,
    pub closing: Arc<dyn ClosingQuestionGenerator>,
}

impl Collaborators {
    pub fn new(
        generator: Arc<dyn SegmentGenerator>,
        evaluator: Arc<dyn AnswerEvaluator>,
        closing: Arc<dyn ClosingQuestionGenerator>,
    ) -> Self {
        Self {
            generator,
            evaluator,
            closing,
        }
    }
}
