//! Turning client results into usable values.
//!
//! A client call can fail, return nothing, return prose, or return JSON of
//! the wrong shape. This module retries transient failures once and decodes
//! what came back. Whatever it rejects, the orchestrator replaces with a
//! fallback.

use std::fmt;

use chrono::NaiveDate;
use peticion_core::json::extract_json_block;
use peticion_core::{AnalysisResult, ChatContext, Problem, Recommendation, Task};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::client::ModelClient;
use crate::error::{ClientError, ErrorKind};
use crate::wire::{self, ShapeError};

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Produced by the active client and validated.
    Model,
    /// Static default substituted after a failure.
    Fallback,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
        })
    }
}

/// A condition the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl Notice {
    pub fn for_error(error: &ClientError) -> Self {
        let message = match error.kind() {
            ErrorKind::Auth => {
                "La clave de API fue rechazada. Se usará el análisis local durante esta sesión."
            }
            ErrorKind::Quota => {
                "Se agotó la cuota del proveedor de IA. Se usará el análisis local durante esta sesión."
            }
            ErrorKind::Transport | ErrorKind::Malformed => {
                "El proveedor de IA no respondió correctamente. Se usaron resultados predefinidos."
            }
        };
        Self {
            kind: error.kind(),
            message: message.into(),
        }
    }
}

/// Value returned by every orchestrator operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub source: Source,
    pub notice: Option<Notice>,
}

impl<T> Outcome<T> {
    pub fn model(value: T) -> Self {
        Self {
            value,
            source: Source::Model,
            notice: None,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            source: Source::Fallback,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice;
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }
}

/// One task invocation with its inputs.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    Analyze(&'a str),
    DetectProblems(&'a str, &'a AnalysisResult),
    Recommend(&'a str, &'a [Problem]),
    Chat(&'a str, &'a ChatContext<'a>),
}

impl Request<'_> {
    pub fn task(&self) -> Task {
        match self {
            Self::Analyze(_) => Task::Analyze,
            Self::DetectProblems(..) => Task::DetectProblems,
            Self::Recommend(..) => Task::Recommend,
            Self::Chat(..) => Task::Chat,
        }
    }
}

async fn dispatch(client: &dyn ModelClient, request: &Request<'_>) -> Result<String, ClientError> {
    match *request {
        Request::Analyze(text) => client.analyze(text).await,
        Request::DetectProblems(text, analysis) => client.detect_problems(text, analysis).await,
        Request::Recommend(text, problems) => client.generate_recommendations(text, problems).await,
        Request::Chat(question, context) => client.chat(question, context).await,
    }
}

/// Call `client`, retrying once if the first failure is transient.
pub async fn invoke(client: &dyn ModelClient, request: &Request<'_>) -> Result<String, ClientError> {
    match dispatch(client, request).await {
        Err(e) if e.is_retryable() => {
            warn!(client = client.name(), task = %request.task(), error = %e, "transient failure, retrying once");
            dispatch(client, request).await
        }
        other => other,
    }
}

/// Why model text was not usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("response was blank")]
    Blank,
    #[error("no JSON block in response")]
    NoJson,
    #[error("unusable JSON: {0}")]
    Shape(#[from] ShapeError),
}

fn json_value(raw: &str) -> Result<Value, Rejection> {
    if raw.trim().is_empty() {
        return Err(Rejection::Blank);
    }
    let block = extract_json_block(raw);
    if block.is_empty() {
        return Err(Rejection::NoJson);
    }
    // The extractor only returns spans that parse.
    serde_json::from_str(block).map_err(|_| Rejection::NoJson)
}

pub fn decode_analysis(
    raw: &str,
    document: &str,
    today: NaiveDate,
) -> Result<AnalysisResult, Rejection> {
    Ok(wire::analysis_from_value(json_value(raw)?, document, today)?)
}

pub fn decode_problems(raw: &str) -> Result<Vec<Problem>, Rejection> {
    Ok(wire::problems_from_value(json_value(raw)?)?)
}

pub fn decode_recommendations(raw: &str) -> Result<Vec<Recommendation>, Rejection> {
    Ok(wire::recommendations_from_value(json_value(raw)?)?)
}

/// Chat answers are free text; only blank ones are rejected.
pub fn decode_chat(raw: &str) -> Result<String, Rejection> {
    let answer = raw.trim();
    if answer.is_empty() {
        return Err(Rejection::Blank);
    }
    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    /// Fails with `error` for the first `failures` calls, then answers "{}".
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        error: fn() -> ClientError,
    }

    impl Flaky {
        fn new(failures: usize, error: fn() -> ClientError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                error,
            }
        }

        fn answer(&self) -> Result<String, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok("{}".into())
            }
        }
    }

    #[async_trait]
    impl ModelClient for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn analyze(&self, _: &str) -> Result<String, ClientError> {
            self.answer()
        }
        async fn detect_problems(&self, _: &str, _: &AnalysisResult) -> Result<String, ClientError> {
            self.answer()
        }
        async fn generate_recommendations(&self, _: &str, _: &[Problem]) -> Result<String, ClientError> {
            self.answer()
        }
        async fn chat(&self, _: &str, _: &ChatContext<'_>) -> Result<String, ClientError> {
            self.answer()
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let client = Flaky::new(1, || ClientError::Transport("reset".into()));
        assert_eq!(invoke(&client, &Request::Analyze("x")).await.unwrap(), "{}");
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_failure_gives_up_after_retry() {
        let client = Flaky::new(5, || ClientError::Transport("down".into()));
        assert!(invoke(&client, &Request::Analyze("x")).await.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let client = Flaky::new(5, || ClientError::Auth("bad key".into()));
        let err = invoke(&client, &Request::Analyze("x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blank_and_prose_are_rejected() {
        assert_eq!(decode_problems("   ").unwrap_err(), Rejection::Blank);
        assert_eq!(decode_problems("no sé").unwrap_err(), Rejection::NoJson);
        assert_eq!(decode_chat("\n").unwrap_err(), Rejection::Blank);
    }

    #[test]
    fn analysis_is_decoded_from_prose_wrapper() {
        let raw = "Aquí va: {\"tipo_documento\":\"X\",\"longitud\":10,\"palabras_clave\":[\"a\"],\
                   \"confianza\":0.9,\"analisis_markdown\":\"y\"} fin";
        let result = decode_analysis(raw, "0123456789", today()).unwrap();
        assert_eq!(result.document_type, "X");
        assert_eq!(result.length, 10);
        assert_eq!(result.analysis_date, today());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(matches!(
            decode_recommendations("[{\"descripcion\": \"sin título\"}]"),
            Err(Rejection::Shape(ShapeError::NoValidElements(1)))
        ));
    }

    #[test]
    fn notices_explain_degradation() {
        let notice = Notice::for_error(&ClientError::QuotaExceeded("429".into()));
        assert_eq!(notice.kind, ErrorKind::Quota);
        assert!(notice.message.contains("cuota"));
    }
}
