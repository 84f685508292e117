//! Learning context carried from one generation request to the next
//!
//! A [`LearningContext`] is an immutable record: every update returns a new
//! version, leaving the original untouched.

use serde::{Deserialize, Serialize};

/// Maximum number of answers kept in the correctness window
pub const PATTERN_WINDOW: usize = 5;

/// Number of most recent answers the adaptive policy looks at
pub const RECENT_WINDOW: usize = 3;

/// Difficulty of a generated segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// One step harder, saturating at `Hard`
    #[must_use]
    pub fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    /// One step easier, saturating at `Easy`
    #[must_use]
    pub fn easier(self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            Self::Medium | Self::Easy => Self::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction the next segment's difficulty should move in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBias {
    /// Learner is doing well: go harder, go deeper
    Up,
    #[default]
    Steady,
    /// Learner is struggling: simplify the same topic
    Down,
}

/// Accumulated learning state that seeds the next generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningContext {
    initial_topic: String,
    previous_topic: Option<String>,
    next_topic: String,
    history_topics: Vec<String>,
    depth: u32,
    was_correct: Option<bool>,
    correctness_pattern: Vec<bool>,
    target_difficulty: Difficulty,
    bias: DifficultyBias,
}

impl LearningContext {
    /// Fresh context for a session started on `initial_topic`
    pub fn new(initial_topic: impl Into<String>, difficulty: Difficulty) -> Self {
        let initial_topic = initial_topic.into();
        Self {
            next_topic: initial_topic.clone(),
            initial_topic,
            previous_topic: None,
            history_topics: Vec::new(),
            depth: 0,
            was_correct: None,
            correctness_pattern: Vec::new(),
            target_difficulty: difficulty,
            bias: DifficultyBias::Steady,
        }
    }

    pub fn initial_topic(&self) -> &str {
        &self.initial_topic
    }

    /// Topic of the most recently completed node
    pub fn previous_topic(&self) -> Option<&str> {
        self.previous_topic.as_deref()
    }

    /// Topic the next generated segment should cover
    pub fn next_topic(&self) -> &str {
        &self.next_topic
    }

    /// Topics visited so far, oldest first
    pub fn history_topics(&self) -> &[String] {
        &self.history_topics
    }

    /// Completed nodes since the last pivot
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn was_correct(&self) -> Option<bool> {
        self.was_correct
    }

    /// Sliding window of the last [`PATTERN_WINDOW`] answers, oldest first
    pub fn correctness_pattern(&self) -> &[bool] {
        &self.correctness_pattern
    }

    pub fn target_difficulty(&self) -> Difficulty {
        self.target_difficulty
    }

    pub fn bias(&self) -> DifficultyBias {
        self.bias
    }

    /// Number of correct answers among the last [`RECENT_WINDOW`] entries
    pub fn recent_correct(&self) -> usize {
        let start = self.correctness_pattern.len().saturating_sub(RECENT_WINDOW);
        self.correctness_pattern[start..]
            .iter()
            .filter(|correct| **correct)
            .count()
    }

    /// Record that a node on `topic` was completed without a pivot
    #[must_use]
    pub fn complete_node(&self, topic: &str) -> Self {
        let mut next = self.clone();
        next.previous_topic = Some(topic.to_string());
        next.next_topic = topic.to_string();
        next.history_topics.push(topic.to_string());
        next.depth += 1;
        next
    }

    /// Explicit change of topic: resets depth and logs the new topic
    #[must_use]
    pub fn pivot(&self, topic: &str) -> Self {
        let mut next = self.clone();
        next.next_topic = topic.to_string();
        next.history_topics.push(topic.to_string());
        next.depth = 0;
        next
    }

    /// Append an answer's correctness, dropping the oldest beyond the window
    #[must_use]
    pub fn record_correctness(&self, correct: bool) -> Self {
        let mut next = self.clone();
        next.was_correct = Some(correct);
        next.correctness_pattern.push(correct);
        if next.correctness_pattern.len() > PATTERN_WINDOW {
            let excess = next.correctness_pattern.len() - PATTERN_WINDOW;
            next.correctness_pattern.drain(..excess);
        }
        next
    }

    /// Steer the next request toward `topic` at `difficulty`
    #[must_use]
    pub fn steer(&self, topic: &str, bias: DifficultyBias, difficulty: Difficulty) -> Self {
        let mut next = self.clone();
        next.next_topic = topic.to_string();
        next.bias = bias;
        next.target_difficulty = difficulty;
        next
    }
}
