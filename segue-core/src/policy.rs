//! Adaptive policy: turns an evaluated answer into the next context
//!
//! [`apply`] is a pure function of its inputs. It never looks at the clock,
//! randomness or anything outside its arguments.

use serde::{Deserialize, Serialize};

use crate::context::{Difficulty, DifficultyBias, LearningContext};
use crate::segment::Segment;

/// Correct answers among the recent window needed to push difficulty up
pub const UP_THRESHOLD: usize = 2;

/// Verdict returned by the answer evaluator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub correct: bool,
    #[serde(default)]
    pub suggested_next_topic: Option<String>,
    #[serde(default)]
    pub suggested_difficulty: Option<Difficulty>,
    /// The suggested topic is a change of subject, not a continuation
    #[serde(default)]
    pub pivot: bool,
}

impl Evaluation {
    pub fn correct() -> Self {
        Self {
            correct: true,
            ..Default::default()
        }
    }

    pub fn incorrect() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_next_topic(mut self, topic: impl Into<String>) -> Self {
        self.suggested_next_topic = Some(topic.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.suggested_difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn as_pivot(mut self) -> Self {
        self.pivot = true;
        self
    }

    fn next_topic(&self) -> Option<&str> {
        self.suggested_next_topic
            .as_deref()
            .filter(|topic| !topic.trim().is_empty())
    }
}

/// Bias implied by the recent answers in `context`
pub fn bias_for(context: &LearningContext) -> DifficultyBias {
    match context.recent_correct() {
        n if n >= UP_THRESHOLD => DifficultyBias::Up,
        0 => DifficultyBias::Down,
        _ => DifficultyBias::Steady,
    }
}

/// Compute the context for the request following `completed`
pub fn apply(
    context: &LearningContext,
    completed: &Segment,
    evaluation: &Evaluation,
) -> LearningContext {
    fold(context, completed, evaluation, true)
}

/// Like [`apply`] for a node whose completion `context` already counts:
/// correctness and steering are folded in, depth and history are not
/// advanced again
pub fn adapt(
    context: &LearningContext,
    completed: &Segment,
    evaluation: &Evaluation,
) -> LearningContext {
    fold(context, completed, evaluation, false)
}

fn fold(
    context: &LearningContext,
    completed: &Segment,
    evaluation: &Evaluation,
    count_completion: bool,
) -> LearningContext {
    let answered = context.record_correctness(evaluation.correct);
    let bias = bias_for(&answered);

    let difficulty = match bias {
        DifficultyBias::Up => completed.difficulty.harder(),
        DifficultyBias::Down => completed.difficulty.easier(),
        DifficultyBias::Steady => evaluation
            .suggested_difficulty
            .unwrap_or(completed.difficulty),
    };

    let completed_ctx = if count_completion {
        answered.complete_node(&completed.topic)
    } else {
        answered
    };

    if evaluation.pivot
        && let Some(topic) = evaluation.next_topic()
    {
        return completed_ctx.pivot(topic).steer(topic, bias, difficulty);
    }

    let topic = match bias {
        DifficultyBias::Down => completed.topic.as_str(),
        DifficultyBias::Up | DifficultyBias::Steady => {
            evaluation.next_topic().unwrap_or(&completed.topic)
        }
    };
    completed_ctx.steer(topic, bias, difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(topic: &str, difficulty: Difficulty) -> Segment {
        Segment::new(topic, difficulty).with_question("Q?")
    }

    fn run(answers: &[bool]) -> LearningContext {
        let segment = completed("Photosynthesis", Difficulty::Medium);
        answers
            .iter()
            .fold(LearningContext::new("Photosynthesis", Difficulty::Easy), |ctx, c| {
                let evaluation = Evaluation {
                    correct: *c,
                    ..Default::default()
                };
                apply(&ctx, &segment, &evaluation)
            })
    }

    // ==================== Purity Tests ====================

    #[test]
    fn apply_is_deterministic() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy).record_correctness(true);
        let segment = completed("Photosynthesis", Difficulty::Easy);
        let evaluation = Evaluation::correct().with_next_topic("Calvin cycle");

        let first = apply(&ctx, &segment, &evaluation);
        let second = apply(&ctx, &segment, &evaluation);

        assert_eq!(first, second);
        // Input untouched
        assert_eq!(ctx.correctness_pattern(), [true]);
    }

    #[test]
    fn pattern_is_bounded_over_many_answers() {
        let ctx = run(&[true; 20]);
        assert_eq!(ctx.correctness_pattern().len(), 5);
    }

    #[test]
    fn adapt_folds_answer_without_recounting_node() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy)
            .complete_node("Photosynthesis");
        let segment = completed("Photosynthesis", Difficulty::Easy);

        let next = adapt(&ctx, &segment, &Evaluation::incorrect());

        assert_eq!(next.depth(), 1);
        assert_eq!(next.history_topics(), ["Photosynthesis"]);
        assert_eq!(next.correctness_pattern(), [false]);
        assert_eq!(next.bias(), DifficultyBias::Down);
    }

    // ==================== Bias Tests ====================

    #[test]
    fn two_recent_correct_biases_up() {
        let ctx = run(&[false, true, true]);

        assert_eq!(ctx.bias(), DifficultyBias::Up);
        assert_eq!(ctx.target_difficulty(), Difficulty::Hard);
    }

    #[test]
    fn no_recent_correct_biases_down() {
        let ctx = run(&[true, true, false, false, false]);

        assert_eq!(ctx.bias(), DifficultyBias::Down);
        assert_eq!(ctx.target_difficulty(), Difficulty::Easy);
    }

    #[test]
    fn one_recent_correct_holds_steady() {
        let ctx = run(&[false, false, true]);

        assert_eq!(ctx.bias(), DifficultyBias::Steady);
        assert_eq!(ctx.target_difficulty(), Difficulty::Medium);
    }

    #[test]
    fn steady_honours_suggested_difficulty() {
        let ctx = LearningContext::new("Optics", Difficulty::Easy).record_correctness(false);
        let segment = completed("Optics", Difficulty::Medium);

        let next = apply(
            &ctx,
            &segment,
            &Evaluation::correct().with_difficulty(Difficulty::Easy),
        );

        assert_eq!(next.bias(), DifficultyBias::Steady);
        assert_eq!(next.target_difficulty(), Difficulty::Easy);
    }

    // ==================== Topic Tests ====================

    #[test]
    fn up_bias_takes_suggested_topic() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy).record_correctness(true);
        let segment = completed("Photosynthesis", Difficulty::Easy);

        let next = apply(
            &ctx,
            &segment,
            &Evaluation::correct().with_next_topic("Calvin cycle"),
        );

        assert_eq!(next.next_topic(), "Calvin cycle");
        assert_eq!(next.depth(), 1);
    }

    #[test]
    fn up_bias_without_suggestion_keeps_topic() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy).record_correctness(true);
        let segment = completed("Photosynthesis", Difficulty::Easy);

        let next = apply(&ctx, &segment, &Evaluation::correct());

        assert_eq!(next.next_topic(), "Photosynthesis");
    }

    #[test]
    fn down_bias_ignores_suggested_topic() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy);
        let segment = completed("Photosynthesis", Difficulty::Medium);

        let next = apply(
            &ctx,
            &segment,
            &Evaluation::incorrect().with_next_topic("Quantum biology"),
        );

        assert_eq!(next.bias(), DifficultyBias::Down);
        assert_eq!(next.next_topic(), "Photosynthesis");
    }

    // ==================== Depth Tests ====================

    #[test]
    fn non_pivot_increments_depth_by_one() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy);
        let segment = completed("Photosynthesis", Difficulty::Easy);

        let next = apply(&ctx, &segment, &Evaluation::incorrect());

        assert_eq!(next.depth(), ctx.depth() + 1);
        assert_eq!(next.previous_topic(), Some("Photosynthesis"));
        assert_eq!(next.correctness_pattern().last(), Some(&false));
    }

    #[test]
    fn pivot_resets_depth_and_records_topic() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy)
            .complete_node("Photosynthesis")
            .complete_node("Chlorophyll");
        let segment = completed("Chlorophyll", Difficulty::Easy);

        let next = apply(
            &ctx,
            &segment,
            &Evaluation::correct().with_next_topic("Cell respiration").as_pivot(),
        );

        assert_eq!(next.depth(), 0);
        assert_eq!(next.next_topic(), "Cell respiration");
        assert_eq!(next.history_topics().last().unwrap(), "Cell respiration");
        assert!(next.history_topics().len() > ctx.history_topics().len());
    }

    #[test]
    fn pivot_without_topic_is_a_plain_continuation() {
        let ctx = LearningContext::new("Photosynthesis", Difficulty::Easy);
        let segment = completed("Photosynthesis", Difficulty::Easy);

        let next = apply(&ctx, &segment, &Evaluation::correct().as_pivot());

        assert_eq!(next.depth(), 1);
    }
}
