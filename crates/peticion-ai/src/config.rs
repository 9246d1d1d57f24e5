//! Backend configuration and client selection.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brainbox::{self, BrainboxClient, RagGenerator};
use crate::client::{LlmClient, ModelClient};
use crate::error::ClientError;
use crate::gemini::{self, GeminiGenerator};
use crate::heuristic::HeuristicClient;

/// Placeholder shipped in sample `.env` files.
const PLACEHOLDER_KEY: &str = "tu_clave_aqui";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which client [`AiConfig::select_client`] will build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Gemini generation grounded in Brainbox retrieval.
    Rag,
    Gemini,
    /// Local rules, no network.
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub brainbox_api_key: Option<String>,
    pub brainbox_box_id: String,
    pub brainbox_base_url: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: gemini::DEFAULT_MODEL.into(),
            gemini_base_url: gemini::DEFAULT_BASE_URL.into(),
            brainbox_api_key: None,
            brainbox_box_id: brainbox::DEFAULT_BOX_ID.into(),
            brainbox_base_url: brainbox::DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Treat blank and placeholder keys as absent.
pub fn usable_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != PLACEHOLDER_KEY)
}

impl AiConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Unset or blank values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            gemini_api_key: usable_key(get("GEMINI_API_KEY")),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            brainbox_api_key: usable_key(get("BRAINBOX_API_KEY")),
            brainbox_box_id: get("BRAINBOX_BOX_ID").unwrap_or(defaults.brainbox_box_id),
            brainbox_base_url: get("BRAINBOX_BASE_URL").unwrap_or(defaults.brainbox_base_url),
            timeout_secs: get("PETICION_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Pick a backend from the configured keys.
    ///
    /// Retrieval needs a generator, so a Brainbox key alone selects the heuristic.
    pub fn backend(&self) -> Backend {
        match (
            usable_key(self.gemini_api_key.clone()),
            usable_key(self.brainbox_api_key.clone()),
        ) {
            (Some(_), Some(_)) => Backend::Rag,
            (Some(_), None) => Backend::Gemini,
            (None, _) => Backend::Heuristic,
        }
    }

    pub fn gemini_generator(&self) -> Result<Option<GeminiGenerator>, ClientError> {
        usable_key(self.gemini_api_key.clone())
            .map(|key| {
                GeminiGenerator::new(
                    key,
                    self.gemini_model.clone(),
                    self.gemini_base_url.clone(),
                    self.timeout(),
                )
            })
            .transpose()
    }

    pub fn brainbox_client(&self) -> Result<Option<BrainboxClient>, ClientError> {
        usable_key(self.brainbox_api_key.clone())
            .map(|key| {
                BrainboxClient::new(
                    key,
                    self.brainbox_box_id.clone(),
                    self.brainbox_base_url.clone(),
                    self.timeout(),
                )
            })
            .transpose()
    }

    /// Build the client for [`Self::backend`].
    pub fn select_client(&self) -> Result<Box<dyn ModelClient>, ClientError> {
        let backend = self.backend();
        info!(backend = ?backend, model = %self.gemini_model, "selecting model client");
        let client: Box<dyn ModelClient> =
            match (self.gemini_generator()?, self.brainbox_client()?) {
                (Some(gemini), Some(brainbox)) => {
                    Box::new(LlmClient::new(RagGenerator::new(brainbox, gemini)))
                }
                (Some(gemini), None) => Box::new(LlmClient::new(gemini)),
                (None, _) => Box::new(HeuristicClient::new()),
            };
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AiConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AiConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg, AiConfig::default());
        assert_eq!(cfg.backend(), Backend::Heuristic);
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn placeholder_key_counts_as_missing() {
        let cfg = config(&[("GEMINI_API_KEY", "tu_clave_aqui")]);
        assert_eq!(cfg.gemini_api_key, None);
        assert_eq!(cfg.backend(), Backend::Heuristic);
        assert_eq!(config(&[("GEMINI_API_KEY", "   ")]).gemini_api_key, None);
    }

    #[test]
    fn keys_select_backend() {
        assert_eq!(config(&[("GEMINI_API_KEY", "g")]).backend(), Backend::Gemini);
        assert_eq!(
            config(&[("GEMINI_API_KEY", "g"), ("BRAINBOX_API_KEY", "b")]).backend(),
            Backend::Rag
        );
        assert_eq!(config(&[("BRAINBOX_API_KEY", "b")]).backend(), Backend::Heuristic);
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("BRAINBOX_BOX_ID", "box-9"),
            ("PETICION_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.gemini_model, "gemini-1.5-pro");
        assert_eq!(cfg.brainbox_box_id, "box-9");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn bad_timeout_keeps_default() {
        assert_eq!(config(&[("PETICION_TIMEOUT_SECS", "soon")]).timeout_secs, 30);
    }

    #[test]
    fn selected_client_matches_backend() {
        assert_eq!(config(&[]).select_client().unwrap().name(), "heuristic");
        assert_eq!(
            config(&[("GEMINI_API_KEY", "g")]).select_client().unwrap().name(),
            "gemini"
        );
        assert_eq!(
            config(&[("GEMINI_API_KEY", "g"), ("BRAINBOX_API_KEY", "b")])
                .select_client()
                .unwrap()
                .name(),
            "brainbox-rag"
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: AiConfig = serde_json::from_str(r#"{"gemini_model": "m"}"#).unwrap();
        assert_eq!(cfg.gemini_model, "m");
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
