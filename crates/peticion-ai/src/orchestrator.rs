//! The analysis orchestrator.
//!
//! Drives one session's calls through the active client, validates what
//! comes back, and substitutes fallbacks so no operation ever fails. Auth and
//! quota failures switch the session to the local heuristic client and are
//! reported once per kind as a [`Notice`].

use std::collections::HashSet;

use chrono::{Local, NaiveDate};
use peticion_core::{AnalysisResult, ChatContext, Problem, Recommendation, Task};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::client::ModelClient;
use crate::error::{ClientError, ErrorKind};
use crate::fallback::{self, AugmentationPolicy};
use crate::heuristic::HeuristicClient;
use crate::resilience::{self, Notice, Outcome, Rejection, Request};

pub struct Orchestrator {
    client: Box<dyn ModelClient>,
    degraded: bool,
    notified: HashSet<ErrorKind>,
    policy: AugmentationPolicy,
    analyses: ResultCache<AnalysisResult>,
    problems: ResultCache<Vec<Problem>>,
    recommendations: ResultCache<Vec<Recommendation>>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// What the client call produced, before decoding.
enum Reply {
    Text(String),
    /// The call failed; carries a notice when the failure degraded the session.
    Failed(Option<Notice>),
}

impl Orchestrator {
    pub fn new(client: Box<dyn ModelClient>) -> Self {
        Self {
            client,
            degraded: false,
            notified: HashSet::new(),
            policy: AugmentationPolicy::default(),
            analyses: ResultCache::new(),
            problems: ResultCache::new(),
            recommendations: ResultCache::new(),
            today: local_today,
        }
    }

    /// Replace the rules used to extend fallback recommendations.
    pub fn with_policy(mut self, policy: AugmentationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the date stamped on analyses.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Name of the client currently answering.
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Whether an auth or quota failure moved the session to the local client.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Drop every memoized result.
    pub fn clear_cache(&mut self) {
        self.analyses.clear();
        self.problems.clear();
        self.recommendations.clear();
    }

    /// Cache hits across all tasks since creation.
    pub fn cache_hits(&self) -> u64 {
        self.analyses.hits() + self.problems.hits() + self.recommendations.hits()
    }

    async fn call(&mut self, request: Request<'_>) -> Reply {
        match resilience::invoke(self.client.as_ref(), &request).await {
            Ok(text) => Reply::Text(text),
            Err(error) => {
                let notice = match error.kind() {
                    ErrorKind::Auth | ErrorKind::Quota => self.degrade(&error),
                    _ => None,
                };
                warn!(
                    client = self.client.name(),
                    task = %request.task(),
                    kind = error.kind().as_str(),
                    error = %error,
                    "client call failed, using fallback"
                );
                Reply::Failed(notice)
            }
        }
    }

    /// Switch to the local client. Returns a notice the first time each kind is seen.
    fn degrade(&mut self, error: &ClientError) -> Option<Notice> {
        if !self.degraded {
            info!(from = self.client.name(), kind = error.kind().as_str(), "switching to heuristic client");
            self.client = Box::new(HeuristicClient::new());
            self.degraded = true;
        }
        self.notified
            .insert(error.kind())
            .then(|| Notice::for_error(error))
    }

    /// Decode a reply or fall back. Decoding failures are logged, not surfaced.
    fn settle<T>(
        task: Task,
        reply: Reply,
        decode: impl FnOnce(&str) -> Result<T, Rejection>,
        fallback: impl FnOnce() -> T,
    ) -> Outcome<T> {
        match reply {
            Reply::Text(text) => match decode(&text) {
                Ok(value) => Outcome::model(value),
                Err(rejection) => {
                    warn!(task = %task, reason = %rejection, "unusable model output, using fallback");
                    Outcome::fallback(fallback())
                }
            },
            Reply::Failed(notice) => Outcome::fallback(fallback()).with_notice(notice),
        }
    }

    fn key<I: Serialize + ?Sized>(task: Task, inputs: &I) -> Option<CacheKey> {
        match CacheKey::new(task, inputs) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(task = %task, error = %e, "could not fingerprint inputs, skipping cache");
                None
            }
        }
    }

    /// Classify the document and summarize it.
    pub async fn analyze(&mut self, text: &str) -> Outcome<AnalysisResult> {
        let key = Self::key(Task::Analyze, text);
        if let Some((value, source)) = key.as_ref().and_then(|k| self.analyses.get(k)) {
            debug!(task = %Task::Analyze, "cache hit");
            return Outcome { value, source, notice: None };
        }

        let today = (self.today)();
        let reply = self.call(Request::Analyze(text)).await;
        let outcome = Self::settle(
            Task::Analyze,
            reply,
            |raw| resilience::decode_analysis(raw, text, today),
            || fallback::analysis(text, today),
        );
        remember(&mut self.analyses, key, &outcome);
        outcome
    }

    /// Find defects in the document, given its analysis.
    pub async fn detect_problems(
        &mut self,
        text: &str,
        analysis: &AnalysisResult,
    ) -> Outcome<Vec<Problem>> {
        let key = Self::key(Task::DetectProblems, &(text, analysis));
        if let Some((value, source)) = key.as_ref().and_then(|k| self.problems.get(k)) {
            debug!(task = %Task::DetectProblems, "cache hit");
            return Outcome { value, source, notice: None };
        }

        let reply = self.call(Request::DetectProblems(text, analysis)).await;
        let outcome = Self::settle(
            Task::DetectProblems,
            reply,
            resilience::decode_problems,
            fallback::problems,
        );
        remember(&mut self.problems, key, &outcome);
        outcome
    }

    /// Suggest fixes for `problems`. Fallback lists are extended by the augmentation policy.
    pub async fn generate_recommendations(
        &mut self,
        text: &str,
        problems: &[Problem],
    ) -> Outcome<Vec<Recommendation>> {
        let key = Self::key(Task::Recommend, &(text, problems));
        if let Some((value, source)) = key.as_ref().and_then(|k| self.recommendations.get(k)) {
            debug!(task = %Task::Recommend, "cache hit");
            return Outcome { value, source, notice: None };
        }

        let reply = self.call(Request::Recommend(text, problems)).await;
        let policy = &self.policy;
        let outcome = Self::settle(
            Task::Recommend,
            reply,
            resilience::decode_recommendations,
            || fallback::recommendations(problems, policy),
        );
        remember(&mut self.recommendations, key, &outcome);
        outcome
    }

    /// Answer a follow-up question. Never cached; the answer is never empty.
    pub async fn chat(&mut self, question: &str, context: &ChatContext<'_>) -> Outcome<String> {
        let reply = self.call(Request::Chat(question, context)).await;
        Self::settle(Task::Chat, reply, resilience::decode_chat, || {
            fallback::chat(question, context)
        })
    }
}

/// Memoize an outcome unless it carries a notice; a degraded session should
/// recompute with the local client next time.
fn remember<T: Clone>(cache: &mut ResultCache<T>, key: Option<CacheKey>, outcome: &Outcome<T>) {
    if outcome.notice.is_some() {
        return;
    }
    if let Some(key) = key {
        cache.insert(key, outcome.value.clone(), outcome.source);
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("client", &self.client.name())
            .field("degraded", &self.degraded)
            .field("cached", &(self.analyses.len() + self.problems.len() + self.recommendations.len()))
            .finish()
    }
}
