//! segue-core: Session engine for adaptive, branching video lessons
//!
//! A lesson is a tree of generated segments. The learner moves a playhead
//! through it, answers checkpoint questions, and each answer reshapes the
//! context for what gets generated next. This crate provides:
//!
//! - **Session model** - [`VideoSession`], [`SessionTree`] and [`Segment`] for the branching history
//! - **Adaptation** - [`LearningContext`] and the [`policy`] that folds evaluations into it
//! - **Orchestration** - [`Orchestrator`] issuing concurrent requests and splicing results in
//! - **Collaborators** - [`SegmentGenerator`], [`AnswerEvaluator`] and [`ClosingQuestionGenerator`] traits with scripted mocks
//! - **Closing reflection** - [`ClosingFlow`] capturing the journey once at the designated end
//! - **Event system** - [`EventBus`] trait and [`MemoryEventBus`] for observing every transition
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use segue_core::{
//!     Collaborators, MockClosingGenerator, MockEvaluator, MockGenerator, Orchestrator,
//!     SegmentRequest,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let collaborators = Collaborators::new(
//!         Arc::new(MockGenerator::echo()),
//!         Arc::new(MockEvaluator::new()),
//!         Arc::new(MockClosingGenerator::new()),
//!     );
//!     let orchestrator = Orchestrator::with_defaults("Photosynthesis", collaborators);
//!
//!     // Root segment for the chosen topic
//!     let outcome = orchestrator.request_segment(SegmentRequest::next()).await?;
//!     println!("Root attached: {:?}", outcome.node_id());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  Orchestrator                    │
//! │  ┌──────────────┐ ┌──────────────┐ ┌───────────┐ │
//! │  │ VideoSession │ │RequestTracker│ │ClosingFlow│ │
//! │  │ tree+context │ │ issuance log │ │ cached    │ │
//! │  └──────────────┘ └──────────────┘ └───────────┘ │
//! └───────┬──────────────────┬───────────────────────┘
//!         │ await            │ publish
//!   Collaborators        EventBus
//! ```

pub mod closing;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod policy;
pub mod request;
pub mod segment;
pub mod session;
pub mod tree;

// Re-export key types for convenience
pub use closing::{ClosingFlow, ClosingPayload, ClosingResponse, ClosingResult, ClosingSection};
pub use collaborators::{
    AnswerEvaluator, ClosingQuestionGenerator, Collaborators, MockClosingGenerator, MockEvaluator,
    MockGenerator, SegmentGenerator,
};
pub use config::{ConfigLoader, SegueConfig};
pub use context::{Difficulty, DifficultyBias, LearningContext};
pub use error::{
    ConfigError, EvaluationError, GenerationError, SegueError, SessionError, ValidationError,
};
pub use events::{EventBus, EventSeq, MemoryEventBus, SegueEvent};
pub use orchestrator::{AttachMode, Navigation, Orchestrator, RequestOutcome, SegmentRequest};
pub use policy::Evaluation;
pub use request::{GenerationRequest, RequestId, RequestKind, RequestStatus, RequestTracker};
pub use segment::{NodeId, Segment, SegmentMeta};
pub use session::VideoSession;
pub use tree::{SessionTree, TreeNode};
