use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// Fixed-length vector produced by an [`crate::Encoder`].
pub type Embedding = Vec<f32>;

/// A stored question/answer pair. Its identity is its position in the
/// [`crate::KnowledgeStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Both fields must hold more than whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() || self.answer.trim().is_empty() {
            return Err(ChatError::InvalidInput(
                "faq question and answer must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub question: String,
    pub similarity: f32,
}

impl From<&SimilarityResult> for Suggestion {
    fn from(result: &SimilarityResult) -> Self {
        Self {
            question: result.text.clone(),
            similarity: result.score,
        }
    }
}

/// A FAQ returned by a search, together with how well it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaqMatch {
    pub question: String,
    pub answer: String,
    pub similarity: f32,
}

/// Outcome of composing a response to a single message.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    Greeting {
        response: String,
    },
    NoData {
        response: String,
    },
    ConfidentMatch {
        response: String,
        faq_index: usize,
        matched_question: String,
        confidence: f32,
        /// `None` when no secondary candidate cleared the threshold.
        suggestions: Option<Vec<Suggestion>>,
    },
    NoMatch {
        response: String,
        confidence: f32,
        suggestions: Vec<Suggestion>,
    },
}

impl MatchDecision {
    pub fn method(&self) -> &'static str {
        match self {
            MatchDecision::Greeting { .. } => "greeting",
            MatchDecision::NoData { .. } => "no_data",
            MatchDecision::ConfidentMatch { .. } => "semantic_similarity",
            MatchDecision::NoMatch { .. } => "no_match",
        }
    }

    pub fn response(&self) -> &str {
        match self {
            MatchDecision::Greeting { response }
            | MatchDecision::NoData { response }
            | MatchDecision::ConfidentMatch { response, .. }
            | MatchDecision::NoMatch { response, .. } => response,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            MatchDecision::Greeting { .. } => 1.0,
            MatchDecision::NoData { .. } => 0.0,
            MatchDecision::ConfidentMatch { confidence, .. }
            | MatchDecision::NoMatch { confidence, .. } => *confidence,
        }
    }

    pub fn matched_question(&self) -> Option<&str> {
        match self {
            MatchDecision::ConfidentMatch {
                matched_question, ..
            } => Some(matched_question),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> Option<&[Suggestion]> {
        match self {
            MatchDecision::ConfidentMatch { suggestions, .. } => suggestions.as_deref(),
            MatchDecision::NoMatch { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}
