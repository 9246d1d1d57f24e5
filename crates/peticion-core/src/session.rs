//! Wizard session state.
//!
//! A session walks one document through analysis, problem detection,
//! recommendations and chat. Results are recorded strictly in that order;
//! replacing the document clears everything downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::{AnalysisResult, ChatTurn, Problem, Recommendation};

/// Wizard progress. Ordered: a later stage implies every earlier one is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploaded,
    Analyzed,
    ProblemsDetected,
    RecommendationsGenerated,
    ChatReady,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Analyzed => "analyzed",
            Self::ProblemsDetected => "problems_detected",
            Self::RecommendationsGenerated => "recommendations_generated",
            Self::ChatReady => "chat_ready",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot move to {attempted} from {current}: expected stage {expected}")]
    OutOfOrder {
        current: &'static str,
        expected: &'static str,
        attempted: &'static str,
    },
}

/// Borrowed view of the prior stages, handed to chat prompts.
///
/// Any field may be absent; consumers render missing stages as "not available".
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext<'a> {
    pub analysis: Option<&'a AnalysisResult>,
    pub problems: Option<&'a [Problem]>,
    pub recommendations: Option<&'a [Recommendation]>,
}

/// One document's trip through the wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    document: String,
    stage: Stage,
    analysis: Option<AnalysisResult>,
    problems: Option<Vec<Problem>>,
    recommendations: Option<Vec<Recommendation>>,
    history: Vec<ChatTurn>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            stage: Stage::Uploaded,
            analysis: None,
            problems: None,
            recommendations: None,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn problems(&self) -> Option<&[Problem]> {
        self.problems.as_deref()
    }

    pub fn recommendations(&self) -> Option<&[Recommendation]> {
        self.recommendations.as_deref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    fn advance(&mut self, expected: Stage, next: Stage) -> Result<(), SessionError> {
        if self.stage != expected {
            return Err(SessionError::OutOfOrder {
                current: self.stage.as_str(),
                expected: expected.as_str(),
                attempted: next.as_str(),
            });
        }
        debug!(from = self.stage.as_str(), to = next.as_str(), "session stage advanced");
        self.stage = next;
        Ok(())
    }

    /// Record the analysis. Only valid directly after upload.
    pub fn record_analysis(&mut self, analysis: AnalysisResult) -> Result<(), SessionError> {
        self.advance(Stage::Uploaded, Stage::Analyzed)?;
        self.analysis = Some(analysis);
        Ok(())
    }

    pub fn record_problems(&mut self, problems: Vec<Problem>) -> Result<(), SessionError> {
        self.advance(Stage::Analyzed, Stage::ProblemsDetected)?;
        self.problems = Some(problems);
        Ok(())
    }

    pub fn record_recommendations(
        &mut self,
        recommendations: Vec<Recommendation>,
    ) -> Result<(), SessionError> {
        self.advance(Stage::ProblemsDetected, Stage::RecommendationsGenerated)?;
        self.recommendations = Some(recommendations);
        Ok(())
    }

    pub fn open_chat(&mut self) -> Result<(), SessionError> {
        self.advance(Stage::RecommendationsGenerated, Stage::ChatReady)
    }

    /// Append a chat exchange. Requires the chat stage.
    pub fn push_turn(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<&ChatTurn, SessionError> {
        if self.stage != Stage::ChatReady {
            return Err(SessionError::OutOfOrder {
                current: self.stage.as_str(),
                expected: Stage::ChatReady.as_str(),
                attempted: Stage::ChatReady.as_str(),
            });
        }
        self.history.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        });
        Ok(&self.history[self.history.len() - 1])
    }

    pub fn chat_context(&self) -> ChatContext<'_> {
        ChatContext {
            analysis: self.analysis.as_ref(),
            problems: self.problems.as_deref(),
            recommendations: self.recommendations.as_deref(),
        }
    }

    /// Drop all results and history, keeping the document.
    pub fn reset(&mut self) {
        self.stage = Stage::Uploaded;
        self.analysis = None;
        self.problems = None;
        self.recommendations = None;
        self.history.clear();
    }

    /// Swap in a new document and invalidate every downstream result.
    pub fn replace_document(&mut self, document: impl Into<String>) {
        self.document = document.into();
        self.reset();
    }
}
