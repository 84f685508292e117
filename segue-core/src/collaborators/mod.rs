//! External collaborator abstraction
//!
//! The core never talks to a model or renderer directly. It drives these
//! traits, and callers plug in real clients or the scripted mocks.

pub mod mock;
pub mod traits;

// Re-export key types for convenience
pub use mock::{MockClosingGenerator, MockEvaluator, MockGenerator};
pub use traits::{AnswerEvaluator, ClosingQuestionGenerator, Collaborators, SegmentGenerator};
